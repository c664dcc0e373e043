// src/cli/handlers/status.rs

use crate::{
    CancellationToken,
    cli::{args::ProjectArgs, handlers::commons},
    constants::{DEFAULT_REMOTE_TIMEOUT_SECS, SSH_CONFIG_CACHE_SUFFIX},
    core::{dispatcher, project::ProjectContext},
    models::Machine,
    system::executor::{self, ExecutionError},
};
use anyhow::Result;
use clap::Parser;
use colored::*;
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// Unit name fragments worth surfacing in the per-member summary.
const WATCHED_UNITS: &[&str] = &[
    "kube",
    "docker",
    "flannel",
    "etcd",
    "fleet",
    "setup-network-environment",
];

lazy_static! {
    static ref HOST_NAME_RE: Regex =
        Regex::new(r"(?m)^\s*HostName\s+(\S+)").expect("host name pattern is valid");
}

///
/// Entry point for the 'status' command: per-member liveness plus a view of
/// the kubernetes control plane.
///
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let args = ProjectArgs::try_parse_from(&args)?;
    let ctx = commons::project_context(args.workingdir.as_deref())?;
    let members = commons::resolved_members(&ctx, cancellation_token)?;

    commons::clear_screen();
    println!("{}", "cluster machines:".red());
    if members.is_empty() {
        executor::run_interactive("vagrant status", ctx.root(), cancellation_token)?;
    } else {
        let key_paths = ctx.candidate_key_paths()?;
        for machine in &members {
            if cancellation_token.load(Ordering::SeqCst) {
                return Err(ExecutionError::Cancelled.into());
            }
            report_member(&ctx, machine, &key_paths, cancellation_token);
            println!();
        }
    }

    println!("{}", "kubernetes system:".red());
    let api_server = commons::cluster_api_server(&ctx);
    match executor::run_interactive(
        &format!("kubectl --server={api_server} get all"),
        ctx.root(),
        cancellation_token,
    ) {
        Ok(()) => Ok(()),
        Err(ExecutionError::Cancelled) => Err(ExecutionError::Cancelled.into()),
        Err(e) => {
            println!("{}", format!("kubectl unavailable: {e}").yellow());
            Ok(())
        }
    }
}

/// One member's block: its forwarded address, an up/down verdict, and the
/// cluster units running on it.
fn report_member(
    ctx: &ProjectContext,
    machine: &Machine,
    key_paths: &[PathBuf],
    cancellation_token: &CancellationToken,
) {
    let blob = cached_ssh_config(ctx, machine, cancellation_token);
    let address = blob
        .as_deref()
        .and_then(host_address)
        .map(str::to_string)
        .unwrap_or_else(|| machine.address(&ctx.settings().domain));
    if let Some(row) = blob.as_deref().and_then(host_name_row) {
        println!("{}", row.trim().red());
    }

    let session = dispatcher::member_session(
        ctx,
        machine,
        Duration::from_secs(DEFAULT_REMOTE_TIMEOUT_SECS),
        key_paths,
    );
    match session.run("cat /etc/os-release | grep VERSION_ID", cancellation_token) {
        Ok(output) if !output.trim().is_empty() => {
            let version = output.trim().to_lowercase();
            println!(
                "{} {}",
                format!("{} {} up", machine.name, address).green(),
                version.dimmed()
            );
            match session.run("systemctl list-units", cancellation_token) {
                Ok(units) => {
                    for line in units.lines().filter(|line| is_watched_unit(line)) {
                        println!("  {}", line.trim().dimmed());
                    }
                }
                Err(e) => log::debug!("Unit listing on {} failed: {}", machine.name, e),
            }
        }
        _ => println!("{}", format!("{} down", machine.name).red()),
    }
}

/// The ssh-config blob for a member, preferring what resolution already
/// captured, then the on-disk copy, then a fresh `vagrant ssh-config`.
fn cached_ssh_config(
    ctx: &ProjectContext,
    machine: &Machine,
    cancellation_token: &CancellationToken,
) -> Option<String> {
    if let Some(blob) = &machine.ssh_config {
        return Some(blob.clone());
    }
    let path = ctx
        .cluster_dir()
        .join(format!("{}{}", machine.name, SSH_CONFIG_CACHE_SUFFIX));
    if let Ok(blob) = fs::read_to_string(&path) {
        return Some(blob);
    }
    let blob = executor::run_capture(
        &format!("vagrant ssh-config {}", machine.name),
        ctx.root(),
        cancellation_token,
    )
    .ok()?;
    if let Err(e) = fs::write(&path, &blob) {
        log::debug!("Could not store ssh-config for {}: {}", machine.name, e);
    }
    Some(blob)
}

fn host_name_row(blob: &str) -> Option<&str> {
    HOST_NAME_RE.find(blob).map(|m| m.as_str())
}

fn host_address(blob: &str) -> Option<&str> {
    HOST_NAME_RE
        .captures(blob)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn is_watched_unit(line: &str) -> bool {
    WATCHED_UNITS.iter().any(|unit| line.contains(unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOB: &str = "\
Host core1
  HostName 172.16.8.101
  User core
  Port 22
";

    #[test]
    fn test_host_address_comes_from_the_blob() {
        assert_eq!(host_address(BLOB), Some("172.16.8.101"));
        assert_eq!(host_address("User core\n"), None);
    }

    #[test]
    fn test_watched_unit_filter() {
        assert!(is_watched_unit(
            "kube-apiserver.service loaded active running"
        ));
        assert!(is_watched_unit("early-docker.target loaded active active"));
        assert!(!is_watched_unit("sshd.service loaded active running"));
    }
}
