// src/core/dispatcher.rs

use crate::CancellationToken;
use crate::constants::FANOUT_POOL_WIDTH;
use crate::core::project::ProjectContext;
use crate::core::reporter::Reporter;
use crate::models::Machine;
use crate::system::ssh::{RemoteResult, RemoteSession};
use anyhow::Result;
use colored::*;
use dialoguer::console::Term;
use dialoguer::{Confirm, theme::ColorfulTheme};
use rayon::ThreadPoolBuilder;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Which cluster members a command addresses. Parsed once at the CLI
/// boundary; everything below works with the resolved form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    All,
    Named(String),
    Indexed(usize),
}

impl Target {
    /// `all` addresses the whole cluster, a positive integer is a 1-based
    /// member index, anything else is taken as a member name.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Self::All;
        }
        if let Ok(index) = trimmed.parse::<usize>() {
            if index >= 1 {
                return Self::Indexed(index);
            }
        }
        Self::Named(trimmed.to_string())
    }
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("No cluster member is named '{name}'.")]
    UnknownMember { name: String },
    #[error("Member index {index} is out of range for a cluster of {count} machines.")]
    IndexOutOfRange { index: usize, count: usize },
}

/// Resolves a target against the member list. An unknown name or an index
/// past the end is an error; nothing has been dispatched at that point.
pub fn select_members(members: &[Machine], target: &Target) -> Result<Vec<Machine>, DispatchError> {
    match target {
        Target::All => Ok(members.to_vec()),
        Target::Named(name) => members
            .iter()
            .find(|m| &m.name == name)
            .map(|m| vec![m.clone()])
            .ok_or_else(|| DispatchError::UnknownMember { name: name.clone() }),
        Target::Indexed(index) => index
            .checked_sub(1)
            .and_then(|i| members.get(i))
            .map(|m| vec![m.clone()])
            .ok_or(DispatchError::IndexOutOfRange {
                index: *index,
                count: members.len(),
            }),
    }
}

/// What happens between two members of a serial sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    None,
    Sleep(u64),
    Confirm,
}

impl Pacing {
    /// A negative wait means "ask before moving on", zero means "run
    /// straight through", anything else is a pause in seconds.
    pub fn from_wait(wait: i64) -> Self {
        if wait < 0 {
            Self::Confirm
        } else if wait == 0 {
            Self::None
        } else {
            Self::Sleep(wait.unsigned_abs())
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FanoutOptions {
    pub parallel: bool,
    pub wait: i64,
    pub timeout: Duration,
}

/// Outcome of one member's slice of a sweep.
#[derive(Debug)]
pub struct FanoutRecord {
    pub member: String,
    pub outcome: RemoteResult<String>,
}

impl FanoutRecord {
    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }
}

/// Builds the ssh session for one member from the project settings.
pub fn member_session(
    ctx: &ProjectContext,
    machine: &Machine,
    timeout: Duration,
    key_paths: &[PathBuf],
) -> RemoteSession {
    RemoteSession::new(
        ctx.settings().ssh_user.clone(),
        machine.address(&ctx.settings().domain),
        key_paths.to_vec(),
        timeout,
        ctx.root().to_path_buf(),
    )
}

/// Runs `command` on every member the target selects and reports each result
/// as it arrives.
///
/// Serial sweeps keep member order and honor the pacing derived from `wait`;
/// parallel sweeps run on a bounded worker pool and report in completion
/// order, so `wait` is forced to zero. A member failure is recorded and
/// reported but never stops the rest of the sweep.
pub fn fan_out(
    ctx: &ProjectContext,
    members: &[Machine],
    target: &Target,
    command: &str,
    options: &FanoutOptions,
    cancellation_token: &CancellationToken,
) -> Result<Vec<FanoutRecord>> {
    let selected = select_members(members, target)?;
    if selected.is_empty() {
        println!("{}", "No cluster members to run against.".yellow());
        return Ok(Vec::new());
    }

    let mut options = *options;
    if options.parallel && options.wait != 0 {
        println!(
            "{}",
            "Parallel mode ignores the wait interval; resetting it to 0.".yellow()
        );
        options.wait = 0;
    }
    announce(target, command, &options);

    let key_paths = ctx.candidate_key_paths()?;
    let pairs: Vec<(Machine, RemoteSession)> = selected
        .into_iter()
        .map(|machine| {
            let session = member_session(ctx, &machine, options.timeout, &key_paths);
            (machine, session)
        })
        .collect();

    let mut reporter = Reporter::new(command);
    let token = cancellation_token.clone();
    fan_out_with(
        &pairs,
        options.parallel,
        Pacing::from_wait(options.wait),
        &mut reporter,
        move |_machine, session| session.run(command, &token),
        cancellation_token,
    )
}

/// Sweep core, generic over the per-member runner so the dispatch logic can
/// be exercised without a live cluster.
fn fan_out_with<F>(
    pairs: &[(Machine, RemoteSession)],
    parallel: bool,
    pacing: Pacing,
    reporter: &mut Reporter,
    runner: F,
    cancellation_token: &CancellationToken,
) -> Result<Vec<FanoutRecord>>
where
    F: Fn(&Machine, &RemoteSession) -> RemoteResult<String> + Sync,
{
    let mut records = Vec::with_capacity(pairs.len());

    // A single member needs neither pacing nor a pool.
    if let [(machine, session)] = pairs {
        let outcome = runner(machine, session);
        reporter.report(&machine.name, &outcome);
        records.push(FanoutRecord {
            member: machine.name.clone(),
            outcome,
        });
        return Ok(records);
    }

    if parallel {
        let pool = ThreadPoolBuilder::new()
            .num_threads(FANOUT_POOL_WIDTH)
            .build()?;
        let (tx, rx) = mpsc::channel::<FanoutRecord>();
        pool.in_place_scope(|scope| {
            for pair in pairs {
                let tx = tx.clone();
                let runner = &runner;
                scope.spawn(move |_| {
                    let outcome = runner(&pair.0, &pair.1);
                    tx.send(FanoutRecord {
                        member: pair.0.name.clone(),
                        outcome,
                    })
                    .ok();
                });
            }
            drop(tx);
            // Results stream back in completion order while the workers run.
            for record in rx.iter() {
                reporter.report(&record.member, &record.outcome);
                records.push(record);
            }
        });
        return Ok(records);
    }

    let total = pairs.len();
    for (i, (machine, session)) in pairs.iter().enumerate() {
        if cancellation_token.load(Ordering::SeqCst) {
            log::info!("Cancellation requested; stopping the sweep.");
            break;
        }
        let outcome = runner(machine, session);
        reporter.report(&machine.name, &outcome);
        records.push(FanoutRecord {
            member: machine.name.clone(),
            outcome,
        });
        if i + 1 < total && !pace_between(pacing, cancellation_token) {
            break;
        }
    }
    Ok(records)
}

fn announce(target: &Target, command: &str, options: &FanoutOptions) {
    let scope = match target {
        Target::All => "cluster".to_string(),
        Target::Named(name) => name.clone(),
        Target::Indexed(index) => format!("member {index}"),
    };
    let mut annotation = format!("@ {scope}");
    if options.parallel {
        annotation.push_str(", in parallel");
    }
    if options.wait > 0 {
        annotation.push_str(&format!(", wait {}s", options.wait));
    } else if options.wait < 0 {
        annotation.push_str(", pausing for input");
    }
    println!(
        "{} {} {}",
        "→".blue(),
        command.green(),
        annotation.dimmed()
    );
}

/// Returns whether the sweep should move on to the next member.
pub fn pace_between(pacing: Pacing, cancellation_token: &CancellationToken) -> bool {
    match pacing {
        Pacing::None => true,
        Pacing::Sleep(secs) => {
            let deadline = Instant::now() + Duration::from_secs(secs);
            while Instant::now() < deadline {
                if cancellation_token.load(Ordering::SeqCst) {
                    return false;
                }
                std::thread::sleep(Duration::from_millis(100));
            }
            true
        }
        Pacing::Confirm => match Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("continue")
            .default(true)
            .interact()
        {
            Ok(true) => {
                Term::stdout().clear_screen().ok();
                true
            }
            Ok(false) => {
                println!("{}", "bye".dimmed());
                false
            }
            Err(e) => {
                log::debug!("Continue prompt failed: {e}");
                false
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::ssh::RemoteError;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn token() -> CancellationToken {
        Arc::new(AtomicBool::new(false))
    }

    fn machines(names: &[&str]) -> Vec<Machine> {
        names.iter().map(|name| Machine::named(*name)).collect()
    }

    fn pairs(names: &[&str]) -> Vec<(Machine, RemoteSession)> {
        names
            .iter()
            .map(|name| {
                let machine = Machine::named(*name);
                let session = RemoteSession::new(
                    "core",
                    format!("{name}.a8.nl"),
                    Vec::new(),
                    Duration::from_secs(5),
                    PathBuf::from("."),
                );
                (machine, session)
            })
            .collect()
    }

    #[test]
    fn test_target_parse_forms() {
        assert_eq!(Target::parse("all"), Target::All);
        assert_eq!(Target::parse("ALL"), Target::All);
        assert_eq!(Target::parse("3"), Target::Indexed(3));
        assert_eq!(Target::parse("core2"), Target::Named("core2".to_string()));
        // Zero and negatives are not valid indices; they fall through to
        // name matching and fail later as unknown members.
        assert_eq!(Target::parse("0"), Target::Named("0".to_string()));
        assert_eq!(Target::parse("-1"), Target::Named("-1".to_string()));
    }

    #[test]
    fn test_select_members_by_each_form() {
        // --- Setup ---
        let members = machines(&["core1", "core2", "core3"]);

        // --- Execute / Assert ---
        assert_eq!(select_members(&members, &Target::All).unwrap().len(), 3);

        let named = select_members(&members, &Target::Named("core2".to_string())).unwrap();
        assert_eq!(named.first().map(|m| m.name.as_str()), Some("core2"));

        let indexed = select_members(&members, &Target::Indexed(1)).unwrap();
        assert_eq!(indexed.first().map(|m| m.name.as_str()), Some("core1"));
    }

    #[test]
    fn test_select_members_rejects_unknown_name() {
        let members = machines(&["core1"]);
        let result = select_members(&members, &Target::Named("ghost".to_string()));
        assert!(matches!(
            result,
            Err(DispatchError::UnknownMember { .. })
        ));
    }

    #[test]
    fn test_select_members_rejects_out_of_range_index() {
        let members = machines(&["core1", "core2"]);
        let result = select_members(&members, &Target::Indexed(3));
        assert!(matches!(
            result,
            Err(DispatchError::IndexOutOfRange { index: 3, count: 2 })
        ));
    }

    #[test]
    fn test_pacing_from_wait() {
        assert_eq!(Pacing::from_wait(0), Pacing::None);
        assert_eq!(Pacing::from_wait(5), Pacing::Sleep(5));
        assert_eq!(Pacing::from_wait(-1), Pacing::Confirm);
    }

    #[test]
    fn test_serial_sweep_keeps_member_order() {
        // --- Setup ---
        let pairs = pairs(&["core1", "core2", "core3"]);
        let mut reporter = Reporter::new("uptime");

        // --- Execute ---
        let records = fan_out_with(
            &pairs,
            false,
            Pacing::None,
            &mut reporter,
            |machine, _| Ok(format!("up {}", machine.name)),
            &token(),
        )
        .unwrap();

        // --- Assert ---
        let order: Vec<&str> = records.iter().map(|r| r.member.as_str()).collect();
        assert_eq!(order, vec!["core1", "core2", "core3"]);
    }

    #[test]
    fn test_serial_sweep_records_failures_and_continues() {
        // --- Setup ---
        let pairs = pairs(&["core1", "core2", "core3"]);
        let mut reporter = Reporter::new("uptime");

        // --- Execute ---
        let records = fan_out_with(
            &pairs,
            false,
            Pacing::None,
            &mut reporter,
            |machine, _| {
                if machine.name == "core2" {
                    Err(RemoteError::Timeout {
                        member: "core2.a8.nl".to_string(),
                        secs: 5,
                    })
                } else {
                    Ok("ok".to_string())
                }
            },
            &token(),
        )
        .unwrap();

        // --- Assert ---
        assert_eq!(records.len(), 3);
        let failures: Vec<&str> = records
            .iter()
            .filter(|r| r.is_failure())
            .map(|r| r.member.as_str())
            .collect();
        assert_eq!(failures, vec!["core2"]);
    }

    #[test]
    fn test_parallel_sweep_reports_in_completion_order() {
        // --- Setup ---
        let pairs = pairs(&["core1", "core2", "core3"]);
        let mut reporter = Reporter::new("uptime");

        // --- Execute ---
        // core3 answers immediately, core1 and core2 lag behind.
        let records = fan_out_with(
            &pairs,
            true,
            Pacing::None,
            &mut reporter,
            |machine, _| {
                let delay = match machine.name.as_str() {
                    "core1" => 400,
                    "core2" => 800,
                    _ => 0,
                };
                std::thread::sleep(Duration::from_millis(delay));
                Ok(machine.name.clone())
            },
            &token(),
        )
        .unwrap();

        // --- Assert ---
        assert_eq!(records.len(), 3);
        assert_eq!(records.first().map(|r| r.member.as_str()), Some("core3"));
        let mut names: Vec<&str> = records.iter().map(|r| r.member.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["core1", "core2", "core3"]);
    }

    #[test]
    fn test_single_member_bypasses_pacing() {
        // --- Setup ---
        // Confirm pacing would block on a prompt; the single-member path
        // must never reach it.
        let pairs = pairs(&["core1"]);
        let mut reporter = Reporter::new("uptime");

        // --- Execute ---
        let records = fan_out_with(
            &pairs,
            false,
            Pacing::Confirm,
            &mut reporter,
            |_, _| Ok("up".to_string()),
            &token(),
        )
        .unwrap();

        // --- Assert ---
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_cancelled_serial_sweep_stops_between_members() {
        // --- Setup ---
        let pairs = pairs(&["core1", "core2", "core3"]);
        let mut reporter = Reporter::new("uptime");
        let cancel: CancellationToken = Arc::new(AtomicBool::new(false));
        let cancel_in_runner = cancel.clone();

        // --- Execute ---
        // The first member's runner requests cancellation; the sweep must
        // stop before dispatching to the second.
        let records = fan_out_with(
            &pairs,
            false,
            Pacing::None,
            &mut reporter,
            move |_, _| {
                cancel_in_runner.store(true, Ordering::SeqCst);
                Ok("up".to_string())
            },
            &cancel,
        )
        .unwrap();

        // --- Assert ---
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_fan_out_aborts_on_unknown_target_before_dispatch() {
        // --- Setup ---
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("Vagrantfile"), "$num_instances = 2\n").unwrap();
        let ctx = ProjectContext::open(dir.path().to_path_buf()).unwrap();
        let members = machines(&["core1", "core2"]);
        let options = FanoutOptions {
            parallel: false,
            wait: 0,
            timeout: Duration::from_secs(5),
        };

        // --- Execute ---
        let result = fan_out(
            &ctx,
            &members,
            &Target::Named("ghost".to_string()),
            "uptime",
            &options,
            &token(),
        );

        // --- Assert ---
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DispatchError>(),
            Some(DispatchError::UnknownMember { .. })
        ));
    }

    #[test]
    fn test_fan_out_with_no_members_is_a_no_op() {
        // --- Setup ---
        let dir = tempfile::TempDir::new().unwrap();
        let ctx = ProjectContext::open(dir.path().to_path_buf()).unwrap();
        let options = FanoutOptions {
            parallel: true,
            wait: 0,
            timeout: Duration::from_secs(5),
        };

        // --- Execute ---
        let records = fan_out(&ctx, &[], &Target::All, "uptime", &options, &token()).unwrap();

        // --- Assert ---
        assert!(records.is_empty());
    }
}
