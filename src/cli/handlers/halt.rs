// src/cli/handlers/halt.rs

use crate::{
    CancellationToken,
    cli::{args::ProjectArgs, handlers::commons},
    system::executor,
};
use anyhow::Result;
use clap::Parser;

///
/// Entry point for the 'halt' command.
///
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let args = ProjectArgs::try_parse_from(&args)?;
    let ctx = commons::project_context(args.workingdir.as_deref())?;
    executor::run_interactive("vagrant halt", ctx.root(), cancellation_token)?;
    Ok(())
}
