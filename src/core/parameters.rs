// src/core/parameters.rs

use crate::{
    constants::ARGS_KEY,
    core::command::CustomCommands,
    system::services::{Prompt, RuleMatcher, SettingsProvider, StreamInfoProvider, UrlFetcher},
};
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};

// --- DATA STRUCTS ---

/// Escaping applied to top-level output before it is substituted into an
/// enclosing command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EscapeFlags {
    /// Output lands inside a `/chain` command (`|` separates commands).
    pub chain: bool,
    /// Output lands inside a `/foreach` command (`>` separates the body).
    pub foreach: bool,
}

/// Typed, non-string context shared by a top-level evaluation and every
/// parameter set derived from it.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Backs `$get()`.
    pub settings: Option<Arc<dyn SettingsProvider>>,
    /// Backs `$request()`.
    pub fetcher: Option<Arc<dyn UrlFetcher>>,
    /// Backs `$input()`.
    pub prompt: Option<Arc<dyn Prompt>>,
    /// Backs `$is()`.
    pub matcher: Option<Arc<dyn RuleMatcher>>,
    /// Backs the lazily added `stream*` parameters.
    pub stream_info: Option<Arc<dyn StreamInfoProvider>>,
    /// Backs `$replace(..., regCustom)`.
    pub commands: Option<Arc<CustomCommands>>,
    /// Capability required by `$request()`.
    pub allow_request: bool,
    /// Output escaping for top-level items.
    pub escape: EscapeFlags,
}

/// The runtime values a template is evaluated against.
///
/// Names are stored lower-case. The `args` entry is additionally split on
/// spaces into positional arguments for `$1`, `$2-` and friends.
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    values: HashMap<String, String>,
    args: Vec<String>,
    context: Arc<Context>,
    json: Option<Arc<Value>>,
}

// --- IMPLEMENTATION ---

impl Parameters {
    /// Creates an empty parameter set with a default context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parameter set whose `args` entry is `args`.
    pub fn from_args(args: &str) -> Self {
        let mut params = Self::new();
        params.put(ARGS_KEY, args);
        params
    }

    /// Builder form of [`Parameters::put`].
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.put(name, value);
        self
    }

    /// Replaces the context.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = Arc::new(context);
        self
    }

    /// Sets the escape flags, keeping the rest of the context.
    pub fn with_escape(mut self, chain: bool, foreach: bool) -> Self {
        Arc::make_mut(&mut self.context).escape = EscapeFlags { chain, foreach };
        self
    }

    /// Sets a value. Setting `args` also recomputes the positional arguments.
    pub fn put(&mut self, name: &str, value: &str) {
        let name = name.to_lowercase();
        if name == ARGS_KEY {
            self.args = split_args(value);
        }
        self.values.insert(name, value.to_string());
    }

    /// Sets a value only if no value is present yet.
    pub fn put_if_absent(&mut self, name: &str, value: &str) {
        if !self.contains(name) {
            self.put(name, value);
        }
    }

    /// Returns `true` if `name` has a value (possibly empty).
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(&name.to_lowercase())
    }

    /// Looks up a value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(&name.to_lowercase()).map(String::as_str)
    }

    /// The positional arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the argument at the 0-based `index`, or every argument from
    /// `index` on joined by single spaces. `None` if `index` is past the end.
    pub fn get_range(&self, index: usize, to_end: bool) -> Option<String> {
        if to_end {
            self.args.get(index..).filter(|rest| !rest.is_empty()).map(|rest| rest.join(" "))
        } else {
            self.args.get(index).cloned()
        }
    }

    /// The shared evaluation context.
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The JSON document bound by an enclosing `$json()`.
    pub fn json(&self) -> Option<&Value> {
        self.json.as_deref()
    }

    /// A copy with its own value map. The context is shared.
    pub fn derive(&self) -> Self {
        self.clone()
    }

    /// A derived copy with `document` bound for `$j()` lookups.
    pub fn derive_with_json(&self, document: Value) -> Self {
        let mut derived = self.derive();
        derived.json = Some(Arc::new(document));
        derived
    }

    /// A derived copy describing one regex match: argument 1 is the whole match and
    /// `g1`, `g2`, ... hold the capture groups.
    pub fn derive_for_match(&self, whole: &str, groups: &[String]) -> Self {
        let mut derived = self.derive();
        derived.put(ARGS_KEY, whole);
        derived.args = vec![whole.to_string()];
        for (i, group) in groups.iter().enumerate() {
            derived.put(&format!("g{}", i + 1), group);
        }
        derived
    }
}

/// Splits the raw `args` value on single spaces; an empty value has no arguments.
fn split_args(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    let mut args: Vec<String> = value.split(' ').map(str::to_string).collect();
    while args.last().is_some_and(String::is_empty) {
        args.pop();
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_args_and_ranges() {
        let params = Parameters::from_args("a b c");
        assert_eq!(params.args().len(), 3);
        assert_eq!(params.get_range(0, false).as_deref(), Some("a"));
        assert_eq!(params.get_range(1, true).as_deref(), Some("b c"));
        assert_eq!(params.get_range(3, false), None);
        assert_eq!(params.get_range(3, true), None);
    }

    #[test]
    fn test_empty_args_have_no_positionals() {
        let params = Parameters::from_args("");
        assert!(params.args().is_empty());
        assert_eq!(params.get("args"), Some(""));
    }

    #[test]
    fn test_names_are_case_folded() {
        let params = Parameters::new().with("UserName", "x");
        assert_eq!(params.get("username"), Some("x"));
        assert!(params.contains("USERNAME"));
        assert_eq!(params.get("UserName"), Some("x"));
    }

    #[test]
    fn test_derived_copy_does_not_touch_parent() {
        let parent = Parameters::from_args("one two").with("keep", "1");
        let child = parent.derive_for_match("m", &["x".to_string(), String::new()]);
        assert_eq!(child.get("g1"), Some("x"));
        assert_eq!(child.get("g2"), Some(""));
        assert_eq!(child.get_range(0, true).as_deref(), Some("m"));
        assert_eq!(child.get("keep"), Some("1"));
        assert_eq!(parent.get("g1"), None);
        assert_eq!(parent.get_range(0, true).as_deref(), Some("one two"));
    }

    #[test]
    fn test_put_if_absent_keeps_existing() {
        let mut params = Parameters::new().with("chan", "first");
        params.put_if_absent("chan", "second");
        params.put_if_absent("channel", "#first");
        assert_eq!(params.get("chan"), Some("first"));
        assert_eq!(params.get("channel"), Some("#first"));
    }
}
