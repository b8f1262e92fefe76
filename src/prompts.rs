//! Prompt configuration files.
//!
//! Each prompt is a YAML document with a `system_instruction` and a
//! `user_prompt`. The user prompt carries `{{ variable }}` placeholders that
//! are substituted by literal string replacement, not a template engine.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::PromptError;

/// A loaded prompt pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PromptTemplate {
    pub system_instruction: String,
    pub user_prompt: String,
}

impl PromptTemplate {
    pub fn new(system_instruction: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            user_prompt: user_prompt.into(),
        }
    }

    /// Load a prompt from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PromptError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        info!(path = %path.display(), "Loading LLM prompt");

        let raw = std::fs::read_to_string(path).map_err(|source| PromptError::Io {
            path: display.clone(),
            source,
        })?;
        Self::from_yaml(&raw).map_err(|source| PromptError::Parse {
            path: display,
            source,
        })
    }

    /// Parse a prompt from YAML text.
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Render the user prompt with the given variables.
    pub fn render_user(&self, vars: &[(&str, &str)]) -> String {
        render_prompt(&self.user_prompt, vars)
    }
}

/// Replace every `{{ key }}` in `prompt` with its value.
///
/// Placeholders without a matching variable are left untouched.
pub fn render_prompt(prompt: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(prompt.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{{ {key} }}}}"), value)
    })
}
