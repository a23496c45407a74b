// src/system/matcher.rs

//! The rule language tested by `$is()`, matched against the `msg` parameter.
//!
//! | rule           | matches when `msg`...                     |
//! |----------------|-------------------------------------------|
//! | `re:<regex>`   | matches the regex                         |
//! | `start:<text>` | starts with `text`, ignoring case         |
//! | `cs:<text>`    | contains `text`, case-sensitive           |
//! | `w:<word>`     | contains `word` as a whole word, any case |
//! | `<text>`       | contains `text`, ignoring case            |

use crate::{core::parameters::Parameters, system::services::RuleMatcher};
use regex::{Regex, RegexBuilder};

const MESSAGE_KEY: &str = "msg";

/// Default [`RuleMatcher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRuleMatcher;

impl RuleMatcher for TextRuleMatcher {
    fn matches(&self, rule: &str, params: &Parameters) -> bool {
        let rule = rule.trim();
        if rule.is_empty() {
            return false;
        }
        let message = params.get(MESSAGE_KEY).unwrap_or_default();

        if let Some(pattern) = rule.strip_prefix("re:") {
            return match Regex::new(pattern) {
                Ok(regex) => regex.is_match(message),
                Err(e) => {
                    log::warn!("Invalid regex in rule '{}': {}", rule, e);
                    false
                }
            };
        }
        if let Some(text) = rule.strip_prefix("start:") {
            return message.to_lowercase().starts_with(&text.to_lowercase());
        }
        if let Some(text) = rule.strip_prefix("cs:") {
            return message.contains(text);
        }
        if let Some(word) = rule.strip_prefix("w:") {
            let pattern = format!(r"\b{}\b", regex::escape(word));
            return RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .is_ok_and(|regex| regex.is_match(message));
        }
        message.to_lowercase().contains(&rule.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is(rule: &str, msg: &str) -> bool {
        TextRuleMatcher.matches(rule, &Parameters::new().with("msg", msg))
    }

    #[test]
    fn test_rule_prefixes() {
        assert!(is("hello", "Well HELLO there"));
        assert!(is("start:well", "Well hello"));
        assert!(!is("start:hello", "Well hello"));
        assert!(is("cs:Hello", "Hello"));
        assert!(!is("cs:hello", "Hello"));
        assert!(is("w:cat", "the Cat sat"));
        assert!(!is("w:cat", "concatenate"));
        assert!(is("re:^\\d+$", "12345"));
        assert!(!is("re:(", "anything"));
        assert!(!is("", "anything"));
    }
}
