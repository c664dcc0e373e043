// src/cli/handlers/commons.rs

// Shared plumbing used by multiple command handlers.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::{
    CancellationToken,
    constants::KUBE_API_PORT,
    core::{machines, project::ProjectContext},
    models::Machine,
};

use dialoguer::{Confirm, Select, console::Term, theme::ColorfulTheme};

use colored::Colorize;

/// Locates the cluster project, honoring an explicit `--workingdir` override.
pub fn project_context(workingdir: Option<&str>) -> Result<ProjectContext> {
    let start = workingdir.map(|dir| PathBuf::from(shellexpand::tilde(dir).into_owned()));
    let ctx = ProjectContext::discover(start)?;
    log::debug!("Cluster project at {}", ctx.root().display());
    Ok(ctx)
}

pub fn resolved_members(
    ctx: &ProjectContext,
    cancellation_token: &CancellationToken,
) -> Result<Vec<Machine>> {
    machines::resolve_members(ctx, cancellation_token)
        .context("Failed to resolve the cluster member list.")
}

/// The kubectl endpoint for this cluster: always the first member, whose name
/// depends on the host platform.
pub fn cluster_api_server(ctx: &ProjectContext) -> String {
    format!(
        "http://{}1.{}:{}",
        ctx.platform().member_prefix(),
        ctx.settings().domain,
        KUBE_API_PORT
    )
}

pub fn confirm(prompt: &str, default: bool) -> Result<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default)
        .interact()?)
}

/// Interactive member pick-list, used when a command is given no usable name.
pub fn select_member(members: &[Machine]) -> Result<Machine> {
    let names: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
    let picked = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Which machine?")
        .items(&names)
        .default(0)
        .interact()?;
    members
        .get(picked)
        .cloned()
        .with_context(|| format!("Selection {picked} is out of range."))
}

pub fn clear_screen() {
    Term::stdout().clear_screen().ok();
}

/// Quotes one value for a command line that will be re-split by the executor.
pub fn sh_quote(value: &str) -> String {
    shlex::try_quote(value)
        .map(|quoted| quoted.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

/// Warns when a sweep left failures behind, without failing the process.
pub fn note_failures(failed: usize, total: usize) {
    if failed > 0 {
        println!(
            "{}",
            format!("{failed} of {total} members reported a failure.").yellow()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sh_quote_wraps_values_with_spaces() {
        assert_eq!(sh_quote("plain"), "plain");
        let quoted = sh_quote("two words");
        assert!(quoted == "'two words'" || quoted == "\"two words\"");
    }
}
