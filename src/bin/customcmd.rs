// src/bin/customcmd.rs

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::*;
use customcmd::{
    cli::{Cli, handlers},
    core::config_loader,
    models::AppConfig,
    state,
    system::settings::TomlSettings,
};

// --- Command Definition and Registry ---

/// A CLI action, its aliases, and its handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>, &AppConfig) -> Result<()>,
}

/// All actions. To add one, add an entry here and a module under `cli::handlers`.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "check",
        aliases: &["parse"],
        handler: handlers::check::handle,
    },
    CommandDefinition {
        name: "exec",
        aliases: &["x"],
        handler: handlers::exec::handle,
    },
    CommandDefinition {
        name: "list",
        aliases: &["ls"],
        handler: handlers::list::handle,
    },
    CommandDefinition {
        name: "run",
        aliases: &[],
        handler: handlers::run::handle,
    },
];

/// Finds an action by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()) {
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Loads the configuration and the command registry, then dispatches.
///
/// An unknown action is treated as the name of a configured command, so
/// `customcmd so alice` is a shortcut for `customcmd exec so alice`.
fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let config = config_loader::load_config(cli.config.as_deref())
        .context("Failed to load the configuration")?;
    let loaded = state::get_commands().load_from_settings(&TomlSettings::from_config(&config));
    log::debug!("{} custom commands available", loaded);

    let Some(action) = cli.action else {
        return Err(anyhow!(
            "No action given. Try `customcmd run '<template>'` or `customcmd --help`."
        ));
    };

    match find_command(&action) {
        Some(command) => (command.handler)(cli.args, &config),
        None => {
            let mut exec_args = vec![action];
            exec_args.extend(cli.args);
            handlers::exec::handle(exec_args, &config)
        }
    }
}
