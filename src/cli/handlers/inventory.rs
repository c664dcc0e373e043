// src/cli/handlers/inventory.rs

use crate::{
    CancellationToken,
    cli::{args::ProjectArgs, handlers::commons},
    core::inventory,
};
use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::fs;

///
/// Entry point for the 'inventory' command: wipe the cluster state and write
/// a fresh Ansible inventory for this host.
///
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let args = ProjectArgs::try_parse_from(&args)?;
    let ctx = commons::project_context(args.workingdir.as_deref())?;

    let cluster_dir = ctx.cluster_dir();
    if cluster_dir.exists() {
        fs::remove_dir_all(&cluster_dir)
            .with_context(|| format!("Failed to remove {}", cluster_dir.display()))?;
    }
    let old_inventory = ctx.inventory_path();
    if old_inventory.is_file() {
        fs::remove_file(&old_inventory)
            .with_context(|| format!("Failed to remove {}", old_inventory.display()))?;
    }
    ctx.ensure_cluster_dir()?;

    let members = commons::resolved_members(&ctx, cancellation_token)?;
    let path =
        inventory::write_inventory(&ctx, &members).context("Failed to write the inventory.")?;
    println!(
        "{} {}",
        format!("Localized for {}.", ctx.platform().label()).green(),
        path.display().to_string().dimmed()
    );
    Ok(())
}
