// src/cli/handlers/up.rs

use crate::{
    CancellationToken,
    cli::handlers::commons,
    core::machines,
    system::executor,
};
use anyhow::Result;
use clap::Parser;
use colored::*;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
struct UpArgs {
    /// Vagrant provider to boot with (virtualbox, vmware_fusion, ...).
    #[arg(long)]
    provider: Option<String>,

    /// Act on the cluster project in this directory.
    #[arg(long, short = 'd')]
    workingdir: Option<String>,
}

///
/// Entry point for the 'up' command: boot the cluster and rebuild the
/// membership cache from what actually came up.
///
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let args = UpArgs::try_parse_from(&args)?;
    let ctx = commons::project_context(args.workingdir.as_deref())?;

    machines::invalidate_cache(&ctx)?;

    let mut command_line = String::from("vagrant up");
    if let Some(provider) = &args.provider {
        command_line.push_str(&format!(" --provider={provider}"));
    }
    executor::run_interactive(&command_line, ctx.root(), cancellation_token)?;

    let members = commons::resolved_members(&ctx, cancellation_token)?;
    println!(
        "{}",
        format!("Cluster up with {} members.", members.len()).green()
    );
    Ok(())
}
