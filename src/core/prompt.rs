use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Interrupted by user")]
    Interrupted,

    #[error("Terminal error: {0}")]
    Io(io::Error),
}

impl From<dialoguer::Error> for PromptError {
    fn from(err: dialoguer::Error) -> Self {
        let dialoguer::Error::IO(err) = err;
        if err.kind() == io::ErrorKind::Interrupted {
            PromptError::Interrupted
        } else {
            PromptError::Io(err)
        }
    }
}

/// Console questions asked while classifying images.
pub trait Prompter {
    /// Ask `prompt` with `prefill` as editable text and return the edited line.
    fn input(&mut self, prompt: &str, prefill: &str) -> Result<String, PromptError>;

    /// Yes/no question; an empty answer picks `default`.
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, PromptError>;
}

/// Interactive prompter on the controlling terminal.
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn input(&mut self, prompt: &str, prefill: &str) -> Result<String, PromptError> {
        let value = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .with_initial_text(prefill)
            .allow_empty(true)
            .interact_text()?;
        Ok(value)
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, PromptError> {
        let answer = Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(answer)
    }
}
