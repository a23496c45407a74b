// src/models.rs

use serde::{Deserialize, Serialize};

// --- CONFIGURATION MODELS (FOR TOML) ---
// These are what the user writes in config.toml

/// The contents of `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Persisted `"name template"` lines, loaded into the command registry.
    pub commands: Vec<String>,
    /// Whether `$request()` may perform HTTP requests.
    pub allow_request: bool,
    /// Free-form settings readable through `$get()`.
    pub settings: toml::Table,
    /// Fixed stream status reported for every channel.
    pub stream: Option<StreamConfig>,
}

/// The `[stream]` table.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct StreamConfig {
    pub live: bool,
    pub title: String,
    pub game: String,
    pub viewers: u64,
    pub uptime: String,
}
