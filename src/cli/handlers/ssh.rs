// src/cli/handlers/ssh.rs

use crate::{
    CancellationToken,
    cli::handlers::commons,
    core::{
        dispatcher::{self, Target},
        project::ProjectContext,
    },
    models::Machine,
    system::{executor, ssh},
};
use anyhow::Result;
use clap::Parser;
use colored::*;
use std::time::Duration;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
struct ConnectArgs {
    /// Member name, 1-based index, or `all` to visit every machine in turn.
    /// Defaults to the first member.
    target: Option<String>,

    /// Act on the cluster project in this directory.
    #[arg(long, short = 'd')]
    workingdir: Option<String>,
}

///
/// Entry point for the 'ssh' command: open an interactive shell on a member.
///
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let args = ConnectArgs::try_parse_from(&args)?;
    let ctx = commons::project_context(args.workingdir.as_deref())?;
    let members = commons::resolved_members(&ctx, cancellation_token)?;
    if members.is_empty() {
        println!("{}", "No cluster members found.".yellow());
        return Ok(());
    }

    let key_paths = ctx.candidate_key_paths()?;
    ssh::offer_keys_to_agent(&key_paths, ctx.root(), cancellation_token);

    let target = args
        .target
        .as_deref()
        .map(Target::parse)
        .unwrap_or(Target::Indexed(1));
    match target {
        Target::All => {
            for machine in &members {
                connect_until_reachable(&ctx, machine, cancellation_token)?;
            }
            Ok(())
        }
        target @ Target::Indexed(_) => {
            let selected = dispatcher::select_members(&members, &target)?;
            for machine in &selected {
                connect_until_reachable(&ctx, machine, cancellation_token)?;
            }
            Ok(())
        }
        Target::Named(name) if members.iter().any(|m| m.name == name) => {
            executor::run_interactive(
                &format!("vagrant ssh {name}"),
                ctx.root(),
                cancellation_token,
            )?;
            Ok(())
        }
        Target::Named(_) => {
            // A name the cluster does not know: ask.
            let machine = commons::select_member(&members)?;
            executor::run_interactive(
                &format!("vagrant ssh {}", machine.name),
                ctx.root(),
                cancellation_token,
            )?;
            Ok(())
        }
    }
}

/// Opens a shell directly over ssh, retrying while the member is still
/// booting. The ssh client exits with 255 when the connection itself failed.
fn connect_until_reachable(
    ctx: &ProjectContext,
    machine: &Machine,
    cancellation_token: &CancellationToken,
) -> Result<()> {
    let address = machine.address(&ctx.settings().domain);
    let command_line = format!("ssh {}@{}", ctx.settings().ssh_user, address);
    loop {
        let status =
            executor::run_interactive_status(&command_line, ctx.root(), cancellation_token)?;
        if status.code() == Some(255) {
            println!("{}", format!("waiting for {address}...").yellow());
            std::thread::sleep(Duration::from_secs(1));
            continue;
        }
        return Ok(());
    }
}
