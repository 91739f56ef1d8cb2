use dialoguer::{Confirm, Input};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Failed to read input: {0}")]
    Io(String),

    #[error("No more input available")]
    Exhausted,
}

pub type PromptResult<T> = Result<T, PromptError>;

/// Source of operator answers. The terminal implementation uses dialoguer;
/// tests feed scripted answers.
pub trait Prompter {
    /// Ask for a line of text. An empty answer yields `default` when one is given.
    fn input(&mut self, prompt: &str, default: Option<&str>) -> PromptResult<String>;

    /// Ask a yes/no question.
    fn confirm(&mut self, prompt: &str, default: bool) -> PromptResult<bool>;

    /// Show informational text between prompts.
    fn say(&mut self, text: &str) {
        println!("{}", text);
    }
}

#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }
}

impl Prompter for TerminalPrompter {
    fn input(&mut self, prompt: &str, default: Option<&str>) -> PromptResult<String> {
        let mut input = Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        input
            .interact_text()
            .map(|s| s.trim().to_string())
            .map_err(|e| PromptError::Io(e.to_string()))
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> PromptResult<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(|e| PromptError::Io(e.to_string()))
    }
}
