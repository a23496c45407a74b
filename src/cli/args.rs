// src/cli/args.rs
use clap::Parser;

/// Parses a `key=value` pair for `--param`.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)] // The action name is not part of these args.
pub struct RunArgs {
    /// The template to evaluate.
    pub template: String,

    /// Space-separated positional arguments (`$1`, `$2-`, ...).
    #[arg(long, short, default_value = "")]
    pub args: String,

    /// Named parameters as KEY=VALUE. Repeatable.
    #[arg(long = "param", short = 'p', value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Channel used for `chan` / `channel`.
    #[arg(long)]
    pub channel: Option<String>,

    /// Escape `|` in top-level output, as inside a /chain command.
    #[arg(long)]
    pub chain: bool,

    /// Escape `>` in top-level output, as inside a /foreach command.
    #[arg(long)]
    pub foreach: bool,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct CheckArgs {
    /// The template to parse.
    pub template: String,

    /// Only list identifiers starting with this prefix.
    #[arg(long, default_value = "")]
    pub prefix: String,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct ListArgs {
    /// Show each command's template.
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct ExecArgs {
    /// The configured command to evaluate.
    pub name: String,

    /// Positional arguments, joined with spaces.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,

    /// Named parameters as KEY=VALUE. Repeatable.
    #[arg(long = "param", short = 'p', value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Channel used for `chan` / `channel`.
    #[arg(long, default_value = "")]
    pub channel: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("user=Alice=B").unwrap(),
            ("user".to_string(), "Alice=B".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_run_args() {
        let args = RunArgs::try_parse_from(["Hi $1", "-a", "you", "-p", "msg=yo", "--chain"]).unwrap();
        assert_eq!(args.template, "Hi $1");
        assert_eq!(args.args, "you");
        assert_eq!(args.params, vec![("msg".to_string(), "yo".to_string())]);
        assert!(args.chain && !args.foreach);
    }

    #[test]
    fn test_exec_args_keep_trailing_words() {
        let args = ExecArgs::try_parse_from(["--channel", "#room", "so", "alice", "-x"]).unwrap();
        assert_eq!(args.name, "so");
        assert_eq!(args.args, vec!["alice".to_string(), "-x".to_string()]);
        assert_eq!(args.channel, "#room");
    }
}
