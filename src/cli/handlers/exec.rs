// src/cli/handlers/exec.rs

use anyhow::{Result, anyhow};
use clap::Parser;

use crate::{
    cli::{args::ExecArgs, handlers::commons},
    core::parameters::EscapeFlags,
    models::AppConfig,
    state,
};

/// `customcmd exec <name> [args...] [-p KEY=VALUE]... [--channel C]`
pub fn handle(args: Vec<String>, config: &AppConfig) -> Result<()> {
    let exec_args = ExecArgs::try_parse_from(&args)?;
    let commands = state::get_commands();
    if commands.get(&exec_args.name).is_none() {
        return Err(anyhow!("No custom command named '{}'.", exec_args.name));
    }

    let context = commons::build_context(config, EscapeFlags::default())?;
    let params = commons::build_parameters(&exec_args.args.join(" "), &exec_args.params, context);
    commons::print_result(commands.command(&exec_args.name, &params, &exec_args.channel))
}
