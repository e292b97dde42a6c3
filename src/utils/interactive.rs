//! Interactive input utilities for prompts, spinners and the clipboard

use crate::error::{Result, VaultKrateError};
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Interactive prompt utilities
pub struct InteractivePrompt {
    theme: ColorfulTheme,
}

impl InteractivePrompt {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }

    /// Prompt for yes/no confirmation with a default value
    pub fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        let result = Confirm::with_theme(&self.theme)
            .with_prompt(message)
            .default(default)
            .interact()?;
        Ok(result)
    }

    /// Prompt for text input with an optional default
    pub fn input_text(&self, message: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(message)
            .allow_empty(default.is_some());

        if let Some(default_value) = default {
            input = input.default(default_value.to_string());
        }

        Ok(input.interact_text()?)
    }

    /// Prompt for text input, re-asking until `validator` accepts it
    pub fn input_text_validated<F>(&self, message: &str, validator: F) -> Result<String>
    where
        F: Fn(&str) -> std::result::Result<(), String>,
    {
        let result = Input::<String>::with_theme(&self.theme)
            .with_prompt(message)
            .validate_with(|input: &String| validator(input.as_str()))
            .interact_text()?;
        Ok(result)
    }
}

impl Default for InteractivePrompt {
    fn default() -> Self {
        Self::new()
    }
}

/// Spinner for long-running operations
pub struct ProgressIndicator {
    bar: ProgressBar,
}

impl ProgressIndicator {
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.blue} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Spinner that draws nothing, for machine-readable output
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    pub fn finish_success(&self, message: &str) {
        self.bar.finish_with_message(format!("✓ {message}"));
    }

    pub fn finish_error(&self, message: &str) {
        self.bar.finish_with_message(format!("✗ {message}"));
    }

    pub fn finish_clear(&self) {
        self.bar.finish_and_clear();
    }
}

/// Copy `text` to the system clipboard
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new()?;
    clipboard.set_text(text.to_string())?;
    Ok(())
}

/// Open `target` (a URL or path) with the system handler
pub fn open_external(target: &str) -> Result<()> {
    opener::open(target)
        .map_err(|e| VaultKrateError::unknown(format!("Failed to open {target}: {e}")))
}

/// Validator for user ids entered at the login prompt
pub fn validate_user_id(user_id: &str) -> std::result::Result<(), String> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err("User id cannot be empty".to_string());
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err("User id cannot contain whitespace".to_string());
    }
    Ok(())
}
