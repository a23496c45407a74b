// src/core/items.rs

//! The template tree.
//!
//! A parsed template is an [`Items`] sequence of [`Item`] nodes. Nodes never change
//! after parsing; evaluation returns `Some(text)` or `None` when the command cannot
//! currently produce output (an abort), which propagates through every ancestor.

use crate::core::{commons, json_path::JsonPath, parameters::Parameters};
use std::collections::BTreeSet;

/// An ordered sequence of nodes whose results are concatenated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Items(Vec<Item>);

/// A single node of the template tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// Text copied to the output unchanged.
    Literal(String),
    /// A named parameter lookup (name is lower-case).
    Identifier(String),
    /// A 1-based positional argument, optionally extending to the last argument.
    Range {
        /// 1-based index of the first argument.
        index: usize,
        /// Whether all arguments after `index` are included.
        to_end: bool,
    },
    /// `$name` / `$$name`: falls back to empty text unless required.
    Replacement {
        /// The identifier being replaced.
        item: Box<Item>,
        /// Whether an empty value aborts.
        required: bool,
    },
    /// Top-level wrapper that escapes output for chain/foreach commands.
    SpecialEscape(Box<Item>),
    /// A nested sequence, used where an argument position holds a full template.
    Group(Items),
    /// A `$name(...)` function call.
    Function {
        /// The function and its arguments.
        function: Box<Function>,
        /// Set by the `$$` sigil.
        required: bool,
    },
}

/// The built-in functions and their parsed arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    /// `$if(ident, then[, else])`
    If {
        /// Tested for non-empty text.
        condition: Items,
        /// Output when the condition holds.
        then: Items,
        /// Output otherwise.
        otherwise: Option<Items>,
    },
    /// `$ifeq(ident, compare, then[, else])`
    IfEq {
        /// Left side of the comparison.
        condition: Items,
        /// Right side of the comparison.
        compare: Items,
        /// Output when both sides are equal.
        then: Items,
        /// Output otherwise.
        otherwise: Option<Items>,
    },
    /// `$switch(value, key:out, ..., default)`
    Switch {
        /// The value matched against each case key.
        value: Items,
        /// Cases in declaration order.
        cases: Vec<(Items, Items)>,
        /// Output when no case matches.
        default: Option<Items>,
    },
    /// `$join(ident, separator)`
    Join {
        /// Text whose spaces are replaced.
        item: Items,
        /// Replacement for each space.
        separator: Items,
    },
    /// `$lower(item)`
    Lower(Items),
    /// `$upper(item)`
    Upper(Items),
    /// `$trim(item)`
    Trim(Items),
    /// `$urlencode(item)`
    UrlEncode(Items),
    /// `$calc(expression)`
    Calc(Items),
    /// `$is(rule)`
    Is(Items),
    /// `$rand(a, b, ...)`
    Rand(Vec<Items>),
    /// `$randnum(a[, b])`
    RandNum {
        /// Upper bound alone, or lower bound when `to` is given.
        from: Items,
        /// Upper bound.
        to: Option<Items>,
    },
    /// `$datetime([format[, zone[, locale[, timestamp]]]])`
    DateTime {
        /// Named format or strftime pattern.
        format: Option<Items>,
        /// Time zone id or search term.
        zone: Option<Items>,
        /// IETF language tag.
        locale: Option<Items>,
        /// Epoch milliseconds.
        timestamp: Option<Items>,
    },
    /// `$sort(item[, separator[, type]])`
    Sort {
        /// Text to split and sort.
        item: Items,
        /// Split/join separator, a space by default.
        separator: Option<Items>,
        /// `abc`, `Abc` or anything else for no reordering.
        kind: Option<Items>,
    },
    /// `$replace(item, search, replace[, type])`
    Replace {
        /// Text to search in.
        item: Items,
        /// Literal or regex, depending on `kind`.
        search: Items,
        /// Replacement text, re-evaluated per match for `regFunc`.
        replacement: Items,
        /// The replace mode.
        kind: Option<Items>,
    },
    /// `$quote(item[, quote])`
    Quote {
        /// Text to quote.
        item: Items,
        /// Quote string, `"` by default.
        quote: Option<Items>,
    },
    /// `$round(item[, decimals[, mode[, minDecimals]]])`
    Round {
        /// Number to round.
        item: Items,
        /// Maximum fraction digits.
        decimals: Option<Items>,
        /// Rounding mode name.
        mode: Option<Items>,
        /// Minimum fraction digits.
        min_decimals: Option<Items>,
    },
    /// `$get(setting[, key])`
    Get {
        /// Setting name.
        setting: Items,
        /// Entry of a map setting.
        key: Option<Items>,
    },
    /// `$json(input, output)`
    Json {
        /// JSON text to parse.
        input: Items,
        /// Evaluated with the parsed document bound.
        output: Items,
    },
    /// `$j(path[, default])`
    JsonPath {
        /// Parsed path into the bound document.
        path: JsonPath,
        /// Output when the path yields nothing.
        default: Option<Items>,
    },
    /// `$request(url[, option...])`
    Request {
        /// URL to fetch.
        url: Items,
        /// `error` and/or `trim`.
        options: Vec<Items>,
    },
    /// `$input([type[, message[, initial]]])`
    Input {
        /// Prompt type hint.
        kind: Option<Items>,
        /// Message shown to the user.
        message: Option<Items>,
        /// Initial text of the entry field.
        initial: Option<Items>,
    },
}

/// Applies the required rule: `None` always propagates, empty text only when required.
pub fn check_req(value: Option<String>, required: bool) -> Option<String> {
    match value {
        Some(v) if required && v.is_empty() => None,
        other => other,
    }
}

impl Items {
    /// Wraps a list of nodes.
    pub fn new(items: Vec<Item>) -> Self {
        Self(items)
    }

    /// The nodes of this sequence.
    pub fn items(&self) -> &[Item] {
        &self.0
    }

    /// Returns `true` if the sequence has no nodes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Evaluates every node left to right; the first abort aborts the whole sequence.
    pub fn replace(&self, params: &Parameters) -> Option<String> {
        let mut output = String::new();
        for item in &self.0 {
            output.push_str(&item.replace(params)?);
        }
        Some(output)
    }

    /// All named identifiers in this subtree starting with `prefix`.
    pub fn identifiers_with_prefix(&self, prefix: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        self.collect_identifiers(prefix, &mut found);
        found
    }

    /// The identifiers whose missing or empty value aborts evaluation.
    pub fn required_identifiers(&self) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        self.collect_required(&mut found);
        found
    }

    pub(crate) fn collect_identifiers(&self, prefix: &str, found: &mut BTreeSet<String>) {
        for item in &self.0 {
            item.collect_identifiers(prefix, found);
        }
    }

    pub(crate) fn collect_required(&self, found: &mut BTreeSet<String>) {
        for item in &self.0 {
            item.collect_required(found);
        }
    }
}

impl Item {
    /// Evaluates this node against `params`.
    pub fn replace(&self, params: &Parameters) -> Option<String> {
        match self {
            Item::Literal(text) => Some(text.clone()),
            Item::Identifier(name) => params.get(name).map(str::to_string),
            Item::Range { index, to_end } => params.get_range(index.saturating_sub(1), *to_end),
            Item::Replacement { item, required } => match item.replace(params) {
                Some(value) if !value.is_empty() => Some(value),
                _ if *required => None,
                _ => Some(String::new()),
            },
            Item::SpecialEscape(item) => {
                let mut value = item.replace(params)?;
                let escape = params.context().escape;
                if escape.chain {
                    value = commons::escape_for_chain_command(&value);
                }
                if escape.foreach {
                    value = commons::escape_for_foreach_command(&value);
                }
                Some(value)
            }
            Item::Group(items) => items.replace(params),
            Item::Function { function, required } => function.replace(*required, params),
        }
    }

    fn collect_identifiers(&self, prefix: &str, found: &mut BTreeSet<String>) {
        match self {
            Item::Literal(_) | Item::Range { .. } => {}
            Item::Identifier(name) => {
                if name.starts_with(prefix) {
                    found.insert(name.clone());
                }
            }
            Item::Replacement { item, .. } | Item::SpecialEscape(item) => {
                item.collect_identifiers(prefix, found)
            }
            Item::Group(items) => items.collect_identifiers(prefix, found),
            Item::Function { function, .. } => {
                for items in function.arguments() {
                    items.collect_identifiers(prefix, found);
                }
            }
        }
    }

    fn collect_required(&self, found: &mut BTreeSet<String>) {
        match self {
            Item::Literal(_) | Item::Range { .. } | Item::Identifier(_) => {}
            Item::Replacement { item, required } => {
                if *required {
                    item.collect_identifiers("", found);
                }
                item.collect_required(found);
            }
            Item::SpecialEscape(item) => item.collect_required(found),
            Item::Group(items) => items.collect_required(found),
            Item::Function { function, required } => {
                if *required {
                    for items in function.checked_arguments() {
                        items.collect_identifiers("", found);
                    }
                }
                for items in function.arguments() {
                    items.collect_required(found);
                }
            }
        }
    }
}

impl Function {
    /// Every argument of this function, in grammar order.
    pub fn arguments(&self) -> Vec<&Items> {
        match self {
            Function::If {
                condition,
                then,
                otherwise,
            } => [Some(condition), Some(then), otherwise.as_ref()]
                .into_iter()
                .flatten()
                .collect(),
            Function::IfEq {
                condition,
                compare,
                then,
                otherwise,
            } => [Some(condition), Some(compare), Some(then), otherwise.as_ref()]
                .into_iter()
                .flatten()
                .collect(),
            Function::Switch {
                value,
                cases,
                default,
            } => {
                let mut args = vec![value];
                for (key, output) in cases {
                    args.push(key);
                    args.push(output);
                }
                args.extend(default.as_ref());
                args
            }
            Function::Join { item, separator } => vec![item, separator],
            Function::Lower(item)
            | Function::Upper(item)
            | Function::Trim(item)
            | Function::UrlEncode(item)
            | Function::Calc(item)
            | Function::Is(item) => vec![item],
            Function::Rand(choices) => choices.iter().collect(),
            Function::RandNum { from, to } => [Some(from), to.as_ref()].into_iter().flatten().collect(),
            Function::DateTime {
                format,
                zone,
                locale,
                timestamp,
            } => [format, zone, locale, timestamp]
                .into_iter()
                .filter_map(Option::as_ref)
                .collect(),
            Function::Sort {
                item,
                separator,
                kind,
            } => [Some(item), separator.as_ref(), kind.as_ref()]
                .into_iter()
                .flatten()
                .collect(),
            Function::Replace {
                item,
                search,
                replacement,
                kind,
            } => [Some(item), Some(search), Some(replacement), kind.as_ref()]
                .into_iter()
                .flatten()
                .collect(),
            Function::Quote { item, quote } => {
                [Some(item), quote.as_ref()].into_iter().flatten().collect()
            }
            Function::Round {
                item,
                decimals,
                mode,
                min_decimals,
            } => [Some(item), decimals.as_ref(), mode.as_ref(), min_decimals.as_ref()]
                .into_iter()
                .flatten()
                .collect(),
            Function::Get { setting, key } => {
                [Some(setting), key.as_ref()].into_iter().flatten().collect()
            }
            Function::Json { input, output } => vec![input, output],
            Function::JsonPath { default, .. } => default.iter().collect(),
            Function::Request { url, options } => {
                let mut args = vec![url];
                args.extend(options);
                args
            }
            Function::Input {
                kind,
                message,
                initial,
            } => [kind, message, initial]
                .into_iter()
                .filter_map(Option::as_ref)
                .collect(),
        }
    }

    /// The arguments the required flag is applied to.
    fn checked_arguments(&self) -> Vec<&Items> {
        match self {
            Function::If {
                condition,
                then,
                otherwise,
            } => match otherwise {
                // A missing condition selects the else branch instead of aborting.
                Some(otherwise) => vec![then, otherwise],
                None => vec![condition, then],
            },
            Function::IfEq {
                then, otherwise, ..
            } => [Some(then), otherwise.as_ref()].into_iter().flatten().collect(),
            Function::Switch { value, .. } => vec![value],
            Function::Join { item, .. }
            | Function::Lower(item)
            | Function::Upper(item)
            | Function::Trim(item)
            | Function::UrlEncode(item)
            | Function::Calc(item)
            | Function::Is(item)
            | Function::Sort { item, .. }
            | Function::Replace { item, .. }
            | Function::Quote { item, .. }
            | Function::Round { item, .. }
            | Function::Json { input: item, .. }
            | Function::Request { url: item, .. } => vec![item],
            Function::RandNum { from, .. } => vec![from],
            Function::Rand(choices) => choices.iter().collect(),
            Function::Get { setting, key } => {
                [Some(setting), key.as_ref()].into_iter().flatten().collect()
            }
            Function::JsonPath { default, .. } => default.iter().collect(),
            Function::DateTime { .. } | Function::Input { .. } => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str, required: bool) -> Item {
        Item::Replacement {
            item: Box::new(Item::Identifier(name.to_string())),
            required,
        }
    }

    #[test]
    fn test_items_concatenate_in_order() {
        let items = Items::new(vec![
            Item::Literal("Hello ".to_string()),
            ident("name", false),
            Item::Literal("!".to_string()),
        ]);
        let params = Parameters::new().with("name", "World");
        assert_eq!(items.replace(&params).as_deref(), Some("Hello World!"));
    }

    #[test]
    fn test_abort_is_never_partial() {
        let items = Items::new(vec![
            Item::Literal("a".to_string()),
            ident("missing", true),
            Item::Literal(" b".to_string()),
        ]);
        assert_eq!(items.replace(&Parameters::new()), None);
    }

    #[test]
    fn test_replacement_required_law() {
        let params = Parameters::new().with("name", "");
        assert_eq!(ident("name", false).replace(&params).as_deref(), Some(""));
        assert_eq!(ident("name", true).replace(&params), None);
        assert_eq!(ident("absent", false).replace(&params).as_deref(), Some(""));
    }

    #[test]
    fn test_check_req() {
        assert_eq!(check_req(None, false), None);
        assert_eq!(check_req(Some(String::new()), false).as_deref(), Some(""));
        assert_eq!(check_req(Some(String::new()), true), None);
        assert_eq!(check_req(Some("x".to_string()), true).as_deref(), Some("x"));
    }

    #[test]
    fn test_special_escape_applies_chain_then_foreach() {
        let item = Item::SpecialEscape(Box::new(ident("v", false)));
        let params = Parameters::new()
            .with("v", "a | b > c")
            .with_escape(true, true);
        assert_eq!(item.replace(&params).as_deref(), Some("a || b >> c"));

        let plain = Parameters::new().with("v", "a | b > c");
        assert_eq!(item.replace(&plain).as_deref(), Some("a | b > c"));
    }

    #[test]
    fn test_identifier_queries() {
        let items = Items::new(vec![
            ident("user", true),
            ident("userid", false),
            Item::Function {
                function: Box::new(Function::Upper(Items::new(vec![ident("msg", false)]))),
                required: true,
            },
        ]);
        let all = items.identifiers_with_prefix("");
        assert_eq!(all.len(), 3);
        let users = items.identifiers_with_prefix("user");
        assert!(users.contains("user") && users.contains("userid"));
        let required = items.required_identifiers();
        assert!(required.contains("user"));
        assert!(required.contains("msg"));
        assert!(!required.contains("userid"));
    }
}
