// src/cli/handlers/reload.rs

use crate::{
    CancellationToken,
    cli::{args::ProjectArgs, handlers::commons},
    core::machines,
    system::executor,
};
use anyhow::Result;
use clap::Parser;
use colored::*;

///
/// Entry point for the 'reload' command: restart the machines so Vagrantfile
/// changes take effect, then rebuild the membership cache.
///
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let args = ProjectArgs::try_parse_from(&args)?;
    let ctx = commons::project_context(args.workingdir.as_deref())?;

    machines::invalidate_cache(&ctx)?;
    executor::run_interactive("vagrant reload", ctx.root(), cancellation_token)?;

    let members = commons::resolved_members(&ctx, cancellation_token)?;
    println!(
        "{}",
        format!("Cluster reloaded with {} members.", members.len()).green()
    );
    Ok(())
}
