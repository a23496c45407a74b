// src/core/command.rs

//! Parse-once command templates and the name → command registry.

use crate::{
    constants::{COMMANDS_SETTING, STREAM_IDENTIFIER_PREFIX},
    core::{
        items::{Item, Items},
        parameters::Parameters,
        parser::{self, ParseError},
    },
    system::services::{SettingValue, SettingsProvider},
};
use rayon::prelude::*;
use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, PoisonError, RwLock},
};

// --- CUSTOM COMMAND ---

/// A template parsed exactly once. Holds either the tree or the parse error.
#[derive(Debug, Clone)]
pub struct CustomCommand {
    name: Option<String>,
    raw: String,
    parsed: Result<Items, ParseError>,
}

impl CustomCommand {
    /// Parses `text`. Errors are stored, not returned; see [`CustomCommand::error`].
    pub fn parse(name: Option<&str>, text: &str) -> Self {
        let parsed = parser::parse(text);
        if let Err(e) = &parsed {
            log::debug!("Template {:?} failed to parse: {}", name.unwrap_or("<anonymous>"), e);
        }
        Self {
            name: name.map(str::to_string),
            raw: text.to_string(),
            parsed,
        }
    }

    /// The registry name, if this command was loaded under one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The template text as written.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Returns `true` if the template did not parse.
    pub fn has_error(&self) -> bool {
        self.parsed.is_err()
    }

    /// The parse error, if any.
    pub fn error(&self) -> Option<&ParseError> {
        self.parsed.as_ref().err()
    }

    /// The parsed tree, if the template parsed.
    pub fn items(&self) -> Option<&Items> {
        self.parsed.as_ref().ok()
    }

    /// Evaluates the template. `None` means the command aborted (or never parsed).
    pub fn replace(&self, params: &Parameters) -> Option<String> {
        self.items()?.replace(params)
    }

    /// If the template starts with a literal `/name ...`, returns `name`.
    pub fn command_name(&self) -> Option<String> {
        let Some(Item::Literal(text)) = self.items()?.items().first() else {
            return None;
        };
        let rest = text.strip_prefix('/')?;
        let name = rest.split(' ').next().unwrap_or_default();
        (!name.is_empty()).then(|| name.to_string())
    }

    /// Named identifiers starting with `prefix` (empty for all).
    pub fn identifiers_with_prefix(&self, prefix: &str) -> BTreeSet<String> {
        self.items()
            .map(|items| items.identifiers_with_prefix(prefix))
            .unwrap_or_default()
    }

    /// Identifiers whose missing or empty value aborts the command.
    pub fn required_identifiers(&self) -> BTreeSet<String> {
        self.items()
            .map(Items::required_identifiers)
            .unwrap_or_default()
    }
}

// --- REGISTRY ---

type CommandMap = HashMap<String, Arc<CustomCommand>>;

/// Case-insensitive registry of named commands.
///
/// Reloading builds a complete new map and swaps it in under the write lock, so
/// a concurrent reader sees either the old map or the new one.
#[derive(Debug, Default)]
pub struct CustomCommands {
    commands: RwLock<Arc<CommandMap>>,
}

impl CustomCommands {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the registry with the given `"name template"` lines and returns
    /// how many commands were loaded. Lines that do not parse are skipped.
    pub fn load<I, S>(&self, lines: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines: Vec<String> = lines.into_iter().map(|l| l.as_ref().to_string()).collect();
        let map: CommandMap = lines
            .par_iter()
            .filter_map(|line| parse_line(line))
            .map(|command| (command.name().unwrap_or_default().to_string(), Arc::new(command)))
            .collect();
        let count = map.len();

        let mut guard = self.commands.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(map);
        log::debug!("Loaded {} custom commands ({} lines)", count, lines.len());
        count
    }

    /// Reloads from the `commands` list setting. A missing setting empties the registry.
    pub fn load_from_settings(&self, settings: &dyn SettingsProvider) -> usize {
        match settings.lookup(COMMANDS_SETTING) {
            Some(SettingValue::List(lines)) => self.load(lines),
            Some(other) => {
                log::warn!("Setting '{}' is not a list: {:?}", COMMANDS_SETTING, other);
                self.load(Vec::<String>::new())
            }
            None => self.load(Vec::<String>::new()),
        }
    }

    fn snapshot(&self) -> Arc<CommandMap> {
        let guard = self.commands.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Looks up a command by name, ignoring case and a leading `/`.
    pub fn get(&self, name: &str) -> Option<Arc<CustomCommand>> {
        let key = normalize_name(name);
        self.snapshot().get(&key).cloned()
    }

    /// All command names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.snapshot().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of loaded commands.
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Returns `true` if no commands are loaded.
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Evaluates the command `name` for `channel`.
    ///
    /// Adds `chan` (without `#`) and `channel` (with `#`) unless `params` already
    /// has them. If the command references a `stream*` identifier, the context's
    /// stream-info service is asked once and its fields are added as well.
    pub fn command(&self, name: &str, params: &Parameters, channel: &str) -> Option<String> {
        let Some(command) = self.get(name) else {
            log::debug!("No custom command named '{}'", name);
            return None;
        };

        let mut params = params.derive();
        let chan = channel.trim().trim_start_matches('#');
        if !chan.is_empty() {
            params.put_if_absent("chan", chan);
            params.put_if_absent("channel", &format!("#{}", chan));
        }
        if !command
            .identifiers_with_prefix(STREAM_IDENTIFIER_PREFIX)
            .is_empty()
        {
            add_stream_params(&mut params, chan);
        }
        command.replace(&params)
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().trim_start_matches('/').to_lowercase()
}

/// Splits `"name template"` at the first space and parses the template.
fn parse_line(line: &str) -> Option<CustomCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some((name, template)) = line.split_once(' ') else {
        log::warn!("Ignoring custom command without a template: '{}'", line);
        return None;
    };
    let name = normalize_name(name);
    if name.is_empty() {
        log::warn!("Ignoring custom command without a name: '{}'", line);
        return None;
    }
    let command = CustomCommand::parse(Some(name.as_str()), template);
    if let Some(e) = command.error() {
        log::warn!("Ignoring custom command '{}': {}", name, e);
        return None;
    }
    Some(command)
}

fn add_stream_params(params: &mut Parameters, chan: &str) {
    let Some(provider) = params.context().stream_info.clone() else {
        return;
    };
    let Some(info) = provider.stream_info(chan) else {
        log::debug!("No stream info for '{}'", chan);
        return;
    };
    let status = if info.live { "live" } else { "offline" };
    params.put_if_absent("streamstatus", status);
    params.put_if_absent("streamtitle", &info.title);
    params.put_if_absent("streamgame", &info.game);
    params.put_if_absent("streamviewers", &info.viewers.to_string());
    params.put_if_absent("streamuptime", &info.uptime);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::parameters::Context,
        system::services::{StreamInfo, StreamInfoProvider},
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingStream {
        calls: AtomicUsize,
    }

    impl StreamInfoProvider for CountingStream {
        fn stream_info(&self, channel: &str) -> Option<StreamInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(StreamInfo {
                live: true,
                title: format!("{} plays", channel),
                game: "Chess".to_string(),
                viewers: 42,
                uptime: "1h".to_string(),
            })
        }
    }

    #[test]
    fn test_parse_keeps_error() {
        let ok = CustomCommand::parse(None, "Hello $1");
        assert!(!ok.has_error());
        assert_eq!(ok.replace(&Parameters::from_args("you")).as_deref(), Some("Hello you"));

        let bad = CustomCommand::parse(Some("bad"), "$nope(x)");
        assert!(bad.has_error());
        assert_eq!(bad.error().map(|e| e.offset), Some(1));
        assert_eq!(bad.replace(&Parameters::new()), None);
        assert!(bad.identifiers_with_prefix("").is_empty());
    }

    #[test]
    fn test_command_name() {
        assert_eq!(
            CustomCommand::parse(None, "/me waves $1").command_name().as_deref(),
            Some("me")
        );
        assert_eq!(CustomCommand::parse(None, "say $1").command_name(), None);
        assert_eq!(CustomCommand::parse(None, "$1 /me").command_name(), None);
    }

    #[test]
    fn test_load_skips_broken_lines() {
        let commands = CustomCommands::new();
        let loaded = commands.load(["/Hello Hi $1!", "broken $if(", "noTemplate", "so Go follow $$1"]);
        assert_eq!(loaded, 2);
        assert_eq!(commands.names(), vec!["hello".to_string(), "so".to_string()]);
        assert!(commands.get("HELLO").is_some());
        assert!(commands.get("/so").is_some());
        assert!(commands.get("broken").is_none());
    }

    #[test]
    fn test_reload_replaces_everything() {
        let commands = CustomCommands::new();
        commands.load(["a one", "b two"]);
        commands.load(["c three"]);
        assert_eq!(commands.names(), vec!["c".to_string()]);
    }

    #[test]
    fn test_command_injects_channel() {
        let commands = CustomCommands::new();
        commands.load(["where $chan / $channel / $$1"]);
        let params = Parameters::from_args("x");
        assert_eq!(
            commands.command("where", &params, "#room").as_deref(),
            Some("room / #room / x")
        );
        assert_eq!(commands.command("where", &Parameters::new(), "#room"), None);
        assert_eq!(commands.command("unknown", &params, "#room"), None);

        let preset = Parameters::from_args("x").with("chan", "mine");
        assert_eq!(
            commands.command("where", &preset, "room").as_deref(),
            Some("mine / #room / x")
        );
    }

    #[test]
    fn test_stream_info_only_when_referenced() {
        let stream = Arc::new(CountingStream::default());
        let context = Context {
            stream_info: Some(stream.clone() as Arc<dyn StreamInfoProvider>),
            ..Context::default()
        };
        let params = Parameters::new().with_context(context);
        let commands = CustomCommands::new();
        commands.load(["plain hello", "status $streamtitle ($streamviewers, $streamstatus)"]);

        assert_eq!(commands.command("plain", &params, "#room").as_deref(), Some("hello"));
        assert_eq!(stream.calls.load(Ordering::SeqCst), 0);

        assert_eq!(
            commands.command("status", &params, "#room").as_deref(),
            Some("room plays (42, live)")
        );
        assert_eq!(stream.calls.load(Ordering::SeqCst), 1);
    }
}
