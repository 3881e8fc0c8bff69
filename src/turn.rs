//! Query rules shared by the terminal and HTTP front ends

/// Input that ends a conversation
pub const SENTINEL: &str = "x";

pub const GREETING: &str = "How can Kickoff AI Assistant help you today?";

pub const FAREWELL: &str =
    "Thanks for using Kickoff AI Assistant! We hope we were able to answer your queries.";

/// Appended to every terminal question
pub const CLI_INSTRUCTION: &str = "Limit your response to 1 sentence and answer concisely.";

/// Appended to every HTTP question
pub const HTTP_INSTRUCTION: &str =
    "It's very important that you limit your response to 2 sentences and answer concisely.";

/// Case-insensitive match against [`SENTINEL`]; surrounding whitespace is significant
pub fn is_sentinel(input: &str) -> bool {
    input.eq_ignore_ascii_case(SENTINEL)
}

pub fn with_instruction(query: &str, instruction: &str) -> String {
    format!("{} {}", query, instruction)
}

/// What a line of user input asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    End,
    Ask(String),
}

impl Turn {
    pub fn classify(input: &str) -> Self {
        if is_sentinel(input) {
            Turn::End
        } else {
            Turn::Ask(input.to_string())
        }
    }
}
