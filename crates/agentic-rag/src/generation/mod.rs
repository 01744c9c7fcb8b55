//! Answer generation from retrieved chunks

mod agent;
mod prompt;

pub use agent::LlmResponseAgent;
pub use prompt::PromptBuilder;
