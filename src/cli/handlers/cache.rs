// src/cli/handlers/cache.rs

use crate::{
    CancellationToken,
    cli::handlers::commons,
    core::machines,
};
use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;

#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct CacheArgs {
    #[command(subcommand)]
    action: CacheAction,

    /// Act on the cluster project in this directory.
    #[arg(long, short = 'd', global = true)]
    workingdir: Option<String>,
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Decode the cache and print it as JSON.
    Inspect,
    /// Drop the cache so the next command re-resolves the membership.
    Clear,
}

///
/// Entry point for the 'cache' command.
///
pub fn handle(args: Vec<String>, _cancellation_token: &CancellationToken) -> Result<()> {
    let args = CacheArgs::try_parse_from(&args)?;
    let ctx = commons::project_context(args.workingdir.as_deref())?;

    match args.action {
        CacheAction::Inspect => {
            let path = ctx.members_cache_path();
            println!("{} {}", "Cache:".cyan().bold(), path.display());
            if !path.is_file() {
                println!("{}", "No membership cache on disk.".yellow());
                return Ok(());
            }
            match machines::read_cache_file(&path) {
                Ok(members) => println!("{}", serde_json::to_string_pretty(&members)?),
                Err(e) => println!("{}", format!("Cache is unreadable: {e}").red()),
            }
        }
        CacheAction::Clear => {
            if machines::invalidate_cache(&ctx)? {
                println!("{}", "Membership cache cleared.".green());
            } else {
                println!("{}", "No membership cache to clear.".yellow());
            }
        }
    }
    Ok(())
}
