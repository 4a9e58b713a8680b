//! ui::prompts
//!
//! Interactive prompts.
//!
//! Prompts are only shown in interactive mode. Non-interactive callers get
//! [`PromptError::NotInteractive`] and must supply the value another way.

use std::io::{self, Write};

use dialoguer::Confirm;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt cancelled by user")]
    Cancelled,

    #[error("not in interactive mode")]
    NotInteractive,

    #[error("IO error: {0}")]
    IoError(String),
}

/// Yes/no question on the terminal.
pub fn confirm(message: &str, default: bool, interactive: bool) -> Result<bool, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }
    Confirm::new()
        .with_prompt(message)
        .default(default)
        .interact_opt()
        .map_err(|e| PromptError::IoError(e.to_string()))?
        .ok_or(PromptError::Cancelled)
}

/// Masked input. The answer is not echoed.
pub fn password(message: &str, interactive: bool) -> Result<String, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }
    eprint!("{message}: ");
    io::stderr()
        .flush()
        .map_err(|e| PromptError::IoError(e.to_string()))?;
    rpassword::read_password().map_err(|e| PromptError::IoError(e.to_string()))
}

/// Read one plain line from the terminal, without the newline.
pub fn line(message: &str, interactive: bool) -> Result<String, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }
    eprint!("{message}: ");
    io::stderr()
        .flush()
        .map_err(|e| PromptError::IoError(e.to_string()))?;
    let mut answer = String::new();
    let read = io::stdin()
        .read_line(&mut answer)
        .map_err(|e| PromptError::IoError(e.to_string()))?;
    if read == 0 {
        return Err(PromptError::Cancelled);
    }
    Ok(answer.trim_end_matches(['\r', '\n']).to_string())
}
