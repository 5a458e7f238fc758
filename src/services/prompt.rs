// src/services/prompt.rs

/// Builds the text sent to the model for one user message.
///
/// A non-blank `summary` grounds the answer in the lecture it describes;
/// otherwise the message is answered without context. Neither input is escaped.
pub fn build_prompt(user_message: &str, summary: &str) -> String {
    if summary.trim().is_empty() {
        format!(
            "Someone is asking: \"{user_message}\"\n\n\
             Can you help me give them a good, natural response? \
             Just be conversational and helpful."
        )
    } else {
        format!(
            "Hey! I just attended a lecture and here's what we covered:\n\n\
             {summary}\n\n\
             Now someone is asking me: \"{user_message}\"\n\n\
             Can you help me answer this based on what was discussed in the lecture? \
             If they're asking about something that wasn't covered in the lecture, \
             just let them know that topic wasn't discussed. \
             Keep it natural and conversational - like I'm explaining it to a friend."
        )
    }
}
