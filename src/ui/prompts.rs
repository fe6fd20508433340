//! Interactive line prompts.

use console::Term;
use dialoguer::Input;

use crate::error::{ProvisionError, Result};

use super::Prompt;

/// Convert dialoguer errors to ProvisionError.
fn map_dialoguer_err(e: dialoguer::Error) -> ProvisionError {
    ProvisionError::Io(e.into())
}

/// Show `prompt` and read one line. An empty line is returned as-is.
pub fn read_line(prompt: &Prompt, term: &Term) -> Result<String> {
    Input::<String>::new()
        .with_prompt(&prompt.question)
        .allow_empty(true)
        .interact_on(term)
        .map_err(map_dialoguer_err)
}
