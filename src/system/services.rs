// src/system/services.rs

//! Collaborators consulted by the external-service functions.
//!
//! The template core only ever talks to these traits; concrete implementations
//! live next to this module and are wired into a [`Context`](crate::core::parameters::Context).

use crate::core::parameters::Parameters;
use std::collections::BTreeMap;
use std::fmt::Debug;

/// A typed setting value as returned by a [`SettingsProvider`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    /// A string setting.
    String(String),
    /// A boolean setting.
    Boolean(bool),
    /// An integer setting.
    Long(i64),
    /// A map setting, addressable by key.
    Map(BTreeMap<String, String>),
    /// A list setting.
    List(Vec<String>),
}

/// Read access to application settings, keyed by setting name.
pub trait SettingsProvider: Debug + Send + Sync {
    /// Returns the setting's value, or `None` if there is no such setting.
    fn lookup(&self, name: &str) -> Option<SettingValue>;
}

/// The outcome of a synchronous HTTP GET.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResult {
    /// The response body, if one was received.
    pub body: Option<String>,
    /// The HTTP status code, `0` if no response was received.
    pub status: u16,
    /// A description of what went wrong, if anything.
    pub error: Option<String>,
}

/// Performs blocking HTTP GET requests. Implementations enforce their own timeout.
pub trait UrlFetcher: Debug + Send + Sync {
    /// Fetches `url`; `label` identifies the caller in logs.
    fn get(&self, url: &str, label: &str) -> FetchResult;
}

/// Asks the user for a line of text.
pub trait Prompt: Debug + Send + Sync {
    /// Shows `message` with `initial` prefilled. `None` means the user cancelled.
    fn prompt(&self, kind: &str, message: &str, initial: &str) -> Option<String>;
}

/// Tests a highlight-style rule against the current message context.
pub trait RuleMatcher: Debug + Send + Sync {
    /// Returns `true` if `rule` matches the message described by `params`.
    fn matches(&self, rule: &str, params: &Parameters) -> bool;
}

/// Live stream status for a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamInfo {
    /// Whether the stream is currently live.
    pub live: bool,
    /// Stream title.
    pub title: String,
    /// Current game or category.
    pub game: String,
    /// Current viewer count.
    pub viewers: u64,
    /// Human readable uptime, empty when offline.
    pub uptime: String,
}

/// Looks up live stream status for a channel name (without `#`).
pub trait StreamInfoProvider: Debug + Send + Sync {
    /// Returns the channel's status, or `None` if it is unknown.
    fn stream_info(&self, channel: &str) -> Option<StreamInfo>;
}
