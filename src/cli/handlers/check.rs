// src/cli/handlers/check.rs

use anyhow::{Result, anyhow};
use clap::Parser;
use colored::Colorize;

use crate::{cli::args::CheckArgs, core::command::CustomCommand, models::AppConfig};

/// `customcmd check <template> [--prefix P]`
pub fn handle(args: Vec<String>, _config: &AppConfig) -> Result<()> {
    let check_args = CheckArgs::try_parse_from(&args)?;
    let command = CustomCommand::parse(None, &check_args.template);

    if let Some(e) = command.error() {
        eprintln!("{}", e.render(&check_args.template).red());
        return Err(anyhow!("Template could not be parsed: {}", e));
    }

    println!("{}", "Template OK".green().bold());
    if let Some(name) = command.command_name() {
        println!("  {} /{}", "Runs command:".dimmed(), name.cyan());
    }
    let identifiers = command.identifiers_with_prefix(&check_args.prefix);
    let required = command.required_identifiers();
    if identifiers.is_empty() {
        println!("  {}", "No named identifiers.".dimmed());
    }
    for identifier in identifiers {
        if required.contains(&identifier) {
            println!("  {} {}", identifier.yellow(), "(required)".dimmed());
        } else {
            println!("  {}", identifier);
        }
    }
    Ok(())
}
