// src/cli/mod.rs

use clap::Parser;
use std::path::PathBuf;

pub mod args;
pub mod handlers;

/// customcmd: parse and evaluate Custom Command templates.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    after_help = "Actions:\n  run <template>     Evaluate a template\n  check <template>   Parse a template and list its identifiers\n  list               Show the configured commands\n  exec <name> [args] Evaluate a configured command",
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Use this config file instead of `~/.config/customcmd/config.toml`.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// The action to perform.
    pub action: Option<String>,

    /// Arguments for the action.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
