// src/cli/handlers/ansible.rs

use crate::{
    CancellationToken,
    cli::{args::split_target_prefix, handlers::commons},
    core::dispatcher::Target,
    system::executor,
};
use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use dialoguer::{Password, theme::ColorfulTheme};
use std::io::Write as _;
use std::path::Path;
use std::process::{Command as StdCommand, Stdio};
use tempfile::NamedTempFile;

#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct AnsibleArgs {
    /// The playbook to run; a `member:` prefix limits provisioning to that
    /// machine.
    playbook: String,

    /// Prompt for the Ansible vault password.
    #[arg(long)]
    vault_pass: bool,

    /// Act on the cluster project in this directory.
    #[arg(long, short = 'd')]
    workingdir: Option<String>,
}

///
/// Entry point for the 'ansible' command: run a playbook against the local
/// inventory, falling back to `vagrant provision` when none exists yet.
///
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let args = AnsibleArgs::try_parse_from(&args)?;
    let ctx = commons::project_context(args.workingdir.as_deref())?;

    let inventory = ctx.inventory_path();
    if !inventory.is_file() {
        println!(
            "{}",
            format!(
                "No inventory at {}; provisioning through vagrant instead.",
                inventory.display()
            )
            .yellow()
        );
        executor::run_interactive("vagrant provision", ctx.root(), cancellation_token)?;
        return Ok(());
    }

    let (prefix, playbook_arg) = split_target_prefix(&args.playbook);
    let members = commons::resolved_members(&ctx, cancellation_token)?;
    let limit = match prefix.map(Target::parse) {
        None | Some(Target::All) => "all".to_string(),
        Some(Target::Named(name)) => {
            if members.iter().any(|m| m.name == name) {
                name
            } else {
                println!(
                    "{}",
                    format!("No cluster member named '{name}'; nothing to provision.").yellow()
                );
                return Ok(());
            }
        }
        Some(Target::Indexed(index)) => match index
            .checked_sub(1)
            .and_then(|i| members.get(i))
        {
            Some(machine) => machine.name.clone(),
            None => {
                println!(
                    "{}",
                    format!("No cluster member at index {index}; nothing to provision.").yellow()
                );
                return Ok(());
            }
        },
    };

    let playbook = shellexpand::tilde(playbook_arg).into_owned();
    if !Path::new(&playbook).is_file() {
        println!(
            "{}",
            format!("Playbook {playbook} does not exist; trying anyway.").yellow()
        );
    }

    // The password never touches the command line; ansible reads it from a
    // temp file that disappears when the handler returns.
    let vault_file = if args.vault_pass {
        let password = Password::with_theme(&ColorfulTheme::default())
            .with_prompt("Vault password")
            .interact()?;
        let mut file = NamedTempFile::new().context("Failed to create the vault password file.")?;
        writeln!(file, "{password}")?;
        Some(file)
    } else {
        None
    };

    // Cloud-config units on the members pull assets from the project over
    // plain http while the playbook runs.
    let file_server = spawn_file_server(ctx.root());
    let _file_server = scopeguard::guard(file_server, |server| {
        if let Some(mut child) = server {
            child.kill().ok();
            child.wait().ok();
        }
    });

    let mut command_line = format!(
        "ansible-playbook -u {} --inventory-file={} --limit={} {}",
        ctx.settings().ssh_user,
        commons::sh_quote(&inventory.display().to_string()),
        limit,
        commons::sh_quote(&playbook),
    );
    if let Some(file) = &vault_file {
        command_line.push_str(&format!(
            " --vault-password-file {}",
            commons::sh_quote(&file.path().display().to_string())
        ));
    }
    executor::run_interactive(&command_line, ctx.root(), cancellation_token)?;
    Ok(())
}

fn spawn_file_server(root: &Path) -> Option<std::process::Child> {
    match StdCommand::new("python3")
        .args(["-m", "http.server", "8000"])
        .current_dir(root)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => {
            log::debug!("Asset file server on :8000 (PID {}).", child.id());
            Some(child)
        }
        Err(e) => {
            log::warn!("Could not start the asset file server: {e}");
            None
        }
    }
}
