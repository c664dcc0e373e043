// src/cli/handlers/kubectl.rs

use crate::{
    CancellationToken,
    cli::handlers::commons,
    system::executor,
};
use anyhow::Result;
use clap::Parser;
use colored::*;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
struct KubectlArgs {
    /// Arguments handed to kubectl as-is.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,

    /// Act on the cluster project in this directory.
    #[arg(long, short = 'd')]
    workingdir: Option<String>,
}

///
/// Entry point for the 'kubectl' command: plain passthrough with the cluster
/// API server filled in.
///
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let args = KubectlArgs::try_parse_from(&args)?;
    let ctx = commons::project_context(args.workingdir.as_deref())?;

    if args.args.is_empty() {
        println!(
            "{}",
            "Nothing to pass through. Try 'vckube kubectl get nodes'.".yellow()
        );
        return Ok(());
    }

    let mut command_line = format!("kubectl --server={}", commons::cluster_api_server(&ctx));
    for arg in &args.args {
        command_line.push(' ');
        command_line.push_str(&commons::sh_quote(arg));
    }
    executor::run_interactive(&command_line, ctx.root(), cancellation_token)?;
    Ok(())
}
