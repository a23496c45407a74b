// src/constants.rs

use std::time::Duration;

/// The name of the directory containing customcmd configuration (inside the system config dir).
pub const APP_DIR: &str = "customcmd";

/// The name of the main configuration file.
pub const CONFIG_FILENAME: &str = "config.toml";

/// The list setting holding persisted `"name body"` command lines.
pub const COMMANDS_SETTING: &str = "commands";

/// The parameter that holds the space-separated positional arguments.
pub const ARGS_KEY: &str = "args";

/// Bound used by `$randnum(a)` when `a` is not a number.
pub const RANDNUM_FALLBACK_BOUND: i64 = i32::MAX as i64;

/// Timeout enforced by the default HTTP client used by `$request()`.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Label attached to HTTP requests issued by `$request()`.
pub const REQUEST_LABEL: &str = "CustomCommand";

/// Prefix of the identifiers that trigger a stream-status lookup.
pub const STREAM_IDENTIFIER_PREFIX: &str = "stream";
