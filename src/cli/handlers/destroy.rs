// src/cli/handlers/destroy.rs

use crate::{
    CancellationToken,
    cli::handlers::commons,
    system::executor,
};
use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::fs;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
struct DestroyArgs {
    /// Skip the confirmation prompt.
    #[arg(long, short)]
    force: bool,

    /// Act on the cluster project in this directory.
    #[arg(long, short = 'd')]
    workingdir: Option<String>,
}

///
/// Entry point for the 'destroy' command: delete the machines and drop the
/// cluster state kept next to the Vagrantfile.
///
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let args = DestroyArgs::try_parse_from(&args)?;
    let ctx = commons::project_context(args.workingdir.as_deref())?;

    if !args.force && !commons::confirm("Destroy all cluster machines?", false)? {
        println!("{}", "Aborted.".yellow());
        return Ok(());
    }

    executor::run_interactive("vagrant destroy -f", ctx.root(), cancellation_token)?;

    let cluster_dir = ctx.cluster_dir();
    if cluster_dir.exists() {
        fs::remove_dir_all(&cluster_dir)
            .with_context(|| format!("Failed to remove {}", cluster_dir.display()))?;
    }
    let inventory = ctx.inventory_path();
    if inventory.is_file() {
        fs::remove_file(&inventory)
            .with_context(|| format!("Failed to remove {}", inventory.display()))?;
    }

    println!("{}", "Cluster destroyed.".red());
    Ok(())
}
