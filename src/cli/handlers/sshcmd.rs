// src/cli/handlers/sshcmd.rs

use crate::{
    CancellationToken,
    cli::{args::SweepArgs, handlers::commons},
    core::dispatcher::{self, FanoutOptions, Target},
};
use anyhow::{Result, anyhow};
use clap::Parser;
use std::time::Duration;

///
/// Entry point for the 'sshcmd' command: run one command on one, several, or
/// all cluster members.
///
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let args = SweepArgs::try_parse_from(&args)?;
    let ctx = commons::project_context(args.workingdir.as_deref())?;
    let members = commons::resolved_members(&ctx, cancellation_token)?;

    let (prefix, command_line) = args.target_and_command();
    if command_line.is_empty() {
        return Err(anyhow!("No remote command given."));
    }
    let target = prefix.as_deref().map(Target::parse).unwrap_or(Target::All);
    let options = FanoutOptions {
        parallel: args.parallel,
        wait: args.wait,
        timeout: Duration::from_secs(args.timeout),
    };
    let records = dispatcher::fan_out(
        &ctx,
        &members,
        &target,
        &command_line,
        &options,
        cancellation_token,
    )?;

    let failed = records.iter().filter(|r| r.is_failure()).count();
    commons::note_failures(failed, records.len());
    Ok(())
}
