// src/cli/handlers/list.rs

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::{cli::args::ListArgs, core::command::CustomCommand, models::AppConfig, state};

/// `customcmd list [--verbose]`
pub fn handle(args: Vec<String>, config: &AppConfig) -> Result<()> {
    let list_args = ListArgs::try_parse_from(&args)?;
    let commands = state::get_commands();

    if commands.is_empty() {
        println!("{}", "No custom commands configured.".dimmed());
    }
    for name in commands.names() {
        let Some(command) = commands.get(&name) else {
            continue;
        };
        if list_args.verbose {
            println!("{} {}", format!("/{}", name).cyan().bold(), command.raw());
        } else {
            println!("{}", format!("/{}", name).cyan().bold());
        }
    }

    // Lines the registry skipped, so the user can find them.
    for line in &config.commands {
        let Some((name, template)) = line.trim().split_once(' ') else {
            continue;
        };
        let parsed = CustomCommand::parse(Some(name), template);
        if let Some(e) = parsed.error() {
            println!("{} {}: {}", name.red().bold(), "(invalid)".red(), e);
        }
    }
    Ok(())
}
