//! # System Interaction Layer
//!
//! Collaborators the template functions reach out to, behind the traits in
//! [`services`], plus the default implementations used by the CLI.
//!
//! ## Modules
//!
//! - **`services`**: The narrow traits (`SettingsProvider`, `UrlFetcher`, `Prompt`,
//!   `RuleMatcher`, `StreamInfoProvider`) and their value types.
//! - **`settings`**: Settings backed by the `[settings]` table of `config.toml`.
//! - **`http`**: A blocking `reqwest` client for `$request()`.
//! - **`prompt`**: Terminal prompts for `$input()`.
//! - **`matcher`**: The rule language understood by `$is()`.
//! - **`stream`**: A fixed stream status taken from the `[stream]` table.

pub mod http;
pub mod matcher;
pub mod prompt;
pub mod services;
pub mod settings;
pub mod stream;
