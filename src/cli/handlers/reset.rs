// src/cli/handlers/reset.rs

use crate::{
    CancellationToken,
    cli::handlers::commons,
    constants::{
        DEFAULT_REMOTE_TIMEOUT_SECS, REBOOT_TIMEOUT_SECS, USER_DATA_INSTALL_PATH,
        USER_DATA_UPLOAD_PATH,
    },
    core::{
        dispatcher::{self, Pacing},
        project::ProjectContext,
    },
    models::Machine,
    system::executor,
};
use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::time::Duration;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
struct ResetArgs {
    /// Seconds to pause between members; -1 asks before moving on.
    #[arg(long, short, default_value_t = 0, allow_hyphen_values = true)]
    wait: i64,

    /// Act on the cluster project in this directory.
    #[arg(long, short = 'd')]
    workingdir: Option<String>,
}

///
/// Entry point for the 'reset' command: boot the cluster, push each member's
/// cloud-config, and reboot it so the new config is applied.
///
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let args = ResetArgs::try_parse_from(&args)?;
    let ctx = commons::project_context(args.workingdir.as_deref())?;

    executor::run_interactive("vagrant up", ctx.root(), cancellation_token)?;
    forget_known_hosts();

    let members = commons::resolved_members(&ctx, cancellation_token)?;
    let key_paths = ctx.candidate_key_paths()?;
    let logs_dir = ctx.root().join("logs");

    let mut failed: Vec<String> = Vec::new();
    for (i, machine) in members.iter().enumerate() {
        if cancellation_token.load(Ordering::SeqCst) {
            break;
        }
        let data_file = ctx
            .root()
            .join("configscripts")
            .join(format!("user-data{}.yml", i + 1));
        if !data_file.is_file() {
            println!(
                "{}",
                format!(
                    "No cloud-config for {} at {}; skipping.",
                    machine.name,
                    data_file.display()
                )
                .yellow()
            );
            continue;
        }
        match push_user_data(
            &ctx,
            machine,
            &data_file,
            &key_paths,
            &logs_dir,
            cancellation_token,
        ) {
            Ok(()) => println!("{}", format!("{} reset.", machine.name).green()),
            Err(e) => {
                println!("{}", format!("{}: {}", machine.name, e).red());
                failed.push(machine.name.clone());
            }
        }
        if i + 1 < members.len()
            && !dispatcher::pace_between(Pacing::from_wait(args.wait), cancellation_token)
        {
            break;
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("Reset failed on: {}", failed.join(", ")))
    }
}

/// Rebooted members present new host keys, so the old ones have to go.
fn forget_known_hosts() {
    let Some(home) = dirs::home_dir() else {
        return;
    };
    let known_hosts = home.join(".ssh").join("known_hosts");
    if known_hosts.is_file() {
        match fs::remove_file(&known_hosts) {
            Ok(()) => log::debug!("Removed {}.", known_hosts.display()),
            Err(e) => log::warn!("Could not remove {}: {}", known_hosts.display(), e),
        }
    }
}

fn push_user_data(
    ctx: &ProjectContext,
    machine: &Machine,
    data_file: &Path,
    key_paths: &[PathBuf],
    logs_dir: &Path,
    cancellation_token: &CancellationToken,
) -> Result<()> {
    let session = dispatcher::member_session(
        ctx,
        machine,
        Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
        key_paths,
    );
    session.upload(data_file, USER_DATA_UPLOAD_PATH, cancellation_token)?;
    session.run(
        &format!("sudo cp {USER_DATA_UPLOAD_PATH} {USER_DATA_INSTALL_PATH}"),
        cancellation_token,
    )?;

    // Start the serial log over for the fresh boot.
    if logs_dir.is_dir() {
        fs::write(logs_dir.join(format!("{}-serial.txt", machine.name)), "")?;
    }

    let reboot = dispatcher::member_session(
        ctx,
        machine,
        Duration::from_secs(REBOOT_TIMEOUT_SECS),
        key_paths,
    );
    if let Err(e) = reboot.run("sudo reboot", cancellation_token) {
        // The connection drops before the command can answer.
        log::debug!("Reboot on {}: {}", machine.name, e);
    }
    Ok(())
}
