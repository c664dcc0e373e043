// src/cli/handlers/reboot.rs

use crate::{
    CancellationToken,
    cli::handlers::commons,
    constants::REBOOT_TIMEOUT_SECS,
    core::dispatcher::{self, FanoutOptions, Target},
};
use anyhow::Result;
use clap::Parser;
use std::time::Duration;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
struct RebootArgs {
    /// Member name, 1-based index, or `all` (the default).
    target: Option<String>,

    /// Act on the cluster project in this directory.
    #[arg(long, short = 'd')]
    workingdir: Option<String>,
}

///
/// Entry point for the 'reboot' command: `sudo reboot` fanned out to the
/// whole cluster at once.
///
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let args = RebootArgs::try_parse_from(&args)?;
    let ctx = commons::project_context(args.workingdir.as_deref())?;
    let members = commons::resolved_members(&ctx, cancellation_token)?;

    let target = args
        .target
        .as_deref()
        .map(Target::parse)
        .unwrap_or(Target::All);
    // Rebooting members drop the connection instead of answering, so the
    // deadline is kept short.
    let options = FanoutOptions {
        parallel: true,
        wait: 0,
        timeout: Duration::from_secs(REBOOT_TIMEOUT_SECS),
    };
    dispatcher::fan_out(
        &ctx,
        &members,
        &target,
        "sudo reboot",
        &options,
        cancellation_token,
    )?;
    Ok(())
}
