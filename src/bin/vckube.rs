// src/bin/vckube.rs

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser};
use colored::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use vckube::{
    CancellationToken,
    cli::{Cli, handlers},
    system::{executor, ssh},
};

// --- Command Definition and Registry ---

/// Defines a command, its aliases, and its synchronous handler function.
/// The handler signature is kept consistent across all commands for
/// simplicity in the registry.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>, &CancellationToken) -> Result<()>,
}

/// The single source of truth for all commands.
/// To add a new command, add an entry here and a handler module under
/// `cli/handlers/`.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "ansible",
        aliases: &[],
        handler: handlers::ansible::handle,
    },
    CommandDefinition {
        name: "cache",
        aliases: &[],
        handler: handlers::cache::handle,
    },
    CommandDefinition {
        name: "destroy",
        aliases: &[],
        handler: handlers::destroy::handle,
    },
    CommandDefinition {
        name: "halt",
        aliases: &[],
        handler: handlers::halt::handle,
    },
    CommandDefinition {
        name: "inventory",
        aliases: &["hosts"],
        handler: handlers::inventory::handle,
    },
    CommandDefinition {
        name: "kubectl",
        aliases: &["k"],
        handler: handlers::kubectl::handle,
    },
    CommandDefinition {
        name: "reboot",
        aliases: &[],
        handler: handlers::reboot::handle,
    },
    CommandDefinition {
        name: "reload",
        aliases: &[],
        handler: handlers::reload::handle,
    },
    CommandDefinition {
        name: "reset",
        aliases: &[],
        handler: handlers::reset::handle,
    },
    CommandDefinition {
        name: "ssh",
        aliases: &[],
        handler: handlers::ssh::handle,
    },
    CommandDefinition {
        name: "sshcmd",
        aliases: &["cmd"],
        handler: handlers::sshcmd::handle,
    },
    CommandDefinition {
        name: "status",
        aliases: &["st"],
        handler: handlers::status::handle,
    },
    CommandDefinition {
        name: "up",
        aliases: &[],
        handler: handlers::up::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// The main entry point of the `vckube` application.
/// It sets up logging, parses arguments, dispatches to the correct handler,
/// and performs centralized error handling.
fn main() {
    let cancellation_token = Arc::new(AtomicBool::new(false));
    env_logger::init();

    // Ctrl+C flips the shared flag that every wait loop polls; a second
    // interrupt exits on the spot.
    let handler_token = cancellation_token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if handler_token.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        eprintln!(
            "\n{}",
            "Interrupt received; finishing the current step.".yellow()
        );
    }) {
        log::warn!("Could not install the interrupt handler: {e}");
    }

    if let Err(e) = run_cli(Cli::parse(), cancellation_token) {
        // --- Centralized Error Handling ---
        // Handler argument errors carry their own formatting and exit codes
        // (including the --help and --version short circuits).
        if let Some(clap_err) = e.downcast_ref::<clap::Error>() {
            clap_err.print().ok();
            std::process::exit(clap_err.exit_code());
        }

        // A cancelled run exits silently with the shell convention for
        // interruption.
        if let Some(exec_err) = e.downcast_ref::<executor::ExecutionError>()
            && matches!(exec_err, executor::ExecutionError::Cancelled)
        {
            std::process::exit(130);
        }
        if let Some(remote_err) = e.downcast_ref::<ssh::RemoteError>()
            && matches!(remote_err, ssh::RemoteError::Cancelled)
        {
            std::process::exit(130);
        }

        eprintln!("\n{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Routes the first CLI word to its handler; everything after it belongs to
/// the handler's own parser.
fn run_cli(cli: Cli, cancellation_token: CancellationToken) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let Some(action_name) = cli.command else {
        let mut command = Cli::command();
        command.print_help().ok();
        return Ok(());
    };

    match find_command(&action_name) {
        Some(command) => (command.handler)(cli.args, &cancellation_token),
        None => Err(anyhow!(
            "Unknown command '{}'. Run 'vckube --help' for the list.",
            action_name.cyan()
        )),
    }
}
