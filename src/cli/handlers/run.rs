// src/cli/handlers/run.rs

use anyhow::{Result, anyhow};
use clap::Parser;
use colored::Colorize;

use crate::{
    cli::{args::RunArgs, handlers::commons},
    core::{command::CustomCommand, parameters::EscapeFlags},
    models::AppConfig,
};

/// `customcmd run <template> [-a ARGS] [-p KEY=VALUE]... [--channel C] [--chain] [--foreach]`
pub fn handle(args: Vec<String>, config: &AppConfig) -> Result<()> {
    let run_args = RunArgs::try_parse_from(&args)?;

    let command = CustomCommand::parse(None, &run_args.template);
    if let Some(e) = command.error() {
        eprintln!("{}", e.render(&run_args.template).red());
        return Err(anyhow!("Template could not be parsed: {}", e));
    }

    let escape = EscapeFlags {
        chain: run_args.chain,
        foreach: run_args.foreach,
    };
    let context = commons::build_context(config, escape)?;
    let mut params = commons::build_parameters(&run_args.args, &run_args.params, context);
    if let Some(channel) = &run_args.channel {
        let chan = channel.trim_start_matches('#');
        params.put_if_absent("chan", chan);
        params.put_if_absent("channel", &format!("#{}", chan));
    }

    commons::print_result(command.replace(&params))
}
