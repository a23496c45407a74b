// src/core/commons.rs

/// Wraps a value in `quote`, doubling any occurrence of `quote` inside it.
pub fn wrap_value(value: &str, quote: &str) -> String {
    if quote.is_empty() {
        return value.to_string();
    }
    let doubled = format!("{quote}{quote}");
    format!("{quote}{}{quote}", value.replace(quote, &doubled))
}

/// Escapes text substituted into a `/chain` command, where `|` separates commands.
pub fn escape_for_chain_command(value: &str) -> String {
    value.replace('|', "||")
}

/// Escapes text substituted into a `/foreach` command, where `>` starts the body.
pub fn escape_for_foreach_command(value: &str) -> String {
    value.replace('>', ">>")
}

/// The last line of a regex compile error, which names the actual problem.
pub fn regex_error_summary(error: &regex::Error) -> String {
    error.to_string().lines().last().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_value_doubles_inner_quotes() {
        assert_eq!(wrap_value("a \"b\"", "\""), "\"a \"\"b\"\"\"");
        assert_eq!(wrap_value("it's", "'"), "'it''s'");
        assert_eq!(wrap_value("plain", ""), "plain");
    }

    #[test]
    fn test_command_escapes() {
        assert_eq!(escape_for_chain_command("a|b"), "a||b");
        assert_eq!(escape_for_foreach_command("a>b"), "a>>b");
    }

    #[test]
    fn test_regex_error_summary_is_one_line() {
        let err = regex::Regex::new("(").unwrap_err();
        let summary = regex_error_summary(&err);
        assert!(!summary.is_empty());
        assert!(!summary.contains('\n'));
    }
}
