// src/system/prompt.rs

use crate::system::services::Prompt;
use dialoguer::{Input, Password, theme::ColorfulTheme};

/// Asks on the terminal. `kind` `password` hides the typed text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn prompt(&self, kind: &str, message: &str, initial: &str) -> Option<String> {
        let theme = ColorfulTheme::default();
        let message = if message.is_empty() { "Input" } else { message };
        let result = if kind.eq_ignore_ascii_case("password") {
            Password::with_theme(&theme)
                .with_prompt(message)
                .allow_empty_password(true)
                .interact()
        } else {
            Input::<String>::with_theme(&theme)
                .with_prompt(message)
                .with_initial_text(initial)
                .allow_empty(true)
                .interact_text()
        };
        match result {
            Ok(text) => Some(text),
            Err(e) => {
                log::debug!("Prompt cancelled: {}", e);
                None
            }
        }
    }
}
