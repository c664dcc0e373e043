// src/cli/args.rs
use crate::constants::DEFAULT_REMOTE_TIMEOUT_SECS;
use clap::Parser;

/// Arguments shared by commands that only need to locate the cluster project.
#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct ProjectArgs {
    /// Act on the cluster project in this directory instead of searching
    /// upward from the current one.
    #[arg(long, short = 'd')]
    pub workingdir: Option<String>,
}

/// Arguments for commands that sweep a remote command across the cluster.
#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
pub struct SweepArgs {
    /// The command to run remotely. Its first word may carry a `member:`
    /// prefix (name or 1-based index) to address one machine instead of the
    /// whole cluster.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub command: Vec<String>,

    /// Act on the cluster project in this directory.
    #[arg(long, short = 'd')]
    pub workingdir: Option<String>,

    /// Run on all selected members at once instead of one after another.
    #[arg(long, short)]
    pub parallel: bool,

    /// Seconds to pause between members; -1 asks before moving on.
    #[arg(long, short, default_value_t = 0, allow_hyphen_values = true)]
    pub wait: i64,

    /// Seconds a remote command may run before it is killed.
    #[arg(long, short, default_value_t = DEFAULT_REMOTE_TIMEOUT_SECS)]
    pub timeout: u64,
}

impl SweepArgs {
    /// The raw target prefix, if the first command word carries one, plus the
    /// command words joined back into the line to run remotely. Colons past
    /// the first word belong to the command itself.
    pub fn target_and_command(&self) -> (Option<String>, String) {
        let mut words: Vec<&str> = self.command.iter().map(String::as_str).collect();
        let mut target = None;
        if let Some(first) = words.first_mut() {
            let (prefix, rest) = split_target_prefix(*first);
            target = prefix.map(str::to_string);
            *first = rest;
        }
        words.retain(|word| !word.is_empty());
        (target, words.join(" "))
    }
}

/// Splits an optional `target:` prefix off one CLI word. A word without a
/// colon, or with nothing before it, addresses the whole cluster.
pub fn split_target_prefix(word: &str) -> (Option<&str>, &str) {
    match word.split_once(':') {
        Some((prefix, rest)) if !prefix.is_empty() => (Some(prefix), rest),
        Some((_, rest)) => (None, rest),
        None => (None, word),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_sweep(args: &[&str]) -> SweepArgs {
        SweepArgs::try_parse_from(args.iter().map(|s| s.to_string())).unwrap()
    }

    #[test]
    fn test_sweep_args_defaults_to_the_whole_cluster() {
        // --- Execute ---
        let args = parse_sweep(&["uptime"]);
        let (target, command) = args.target_and_command();

        // --- Assert ---
        assert_eq!(target, None);
        assert_eq!(command, "uptime");
        assert!(!args.parallel);
        assert_eq!(args.wait, 0);
        assert_eq!(args.timeout, DEFAULT_REMOTE_TIMEOUT_SECS);
    }

    #[test]
    fn test_sweep_args_member_prefix_on_a_multi_word_command() {
        // --- Execute ---
        let args = parse_sweep(&["-p", "core2:systemctl", "status", "docker"]);
        let (target, command) = args.target_and_command();

        // --- Assert ---
        assert!(args.parallel);
        assert_eq!(target.as_deref(), Some("core2"));
        assert_eq!(command, "systemctl status docker");
    }

    #[test]
    fn test_sweep_args_index_prefix() {
        let args = parse_sweep(&["2:uptime"]);
        let (target, command) = args.target_and_command();
        assert_eq!(target.as_deref(), Some("2"));
        assert_eq!(command, "uptime");
    }

    #[test]
    fn test_sweep_args_later_colons_stay_in_the_command() {
        let args = parse_sweep(&["cat", "/etc/systemd/system/etcd2.service:x"]);
        let (target, command) = args.target_and_command();
        assert_eq!(target, None);
        assert_eq!(command, "cat /etc/systemd/system/etcd2.service:x");
    }

    #[test]
    fn test_sweep_args_detached_prefix_word() {
        // `core2: uptime` splits the prefix and the command across two words.
        let args = parse_sweep(&["core2:", "uptime"]);
        let (target, command) = args.target_and_command();
        assert_eq!(target.as_deref(), Some("core2"));
        assert_eq!(command, "uptime");
    }

    #[test]
    fn test_sweep_args_negative_wait() {
        let args = parse_sweep(&["--wait", "-1", "all:date"]);
        assert_eq!(args.wait, -1);
        let (target, _) = args.target_and_command();
        assert_eq!(target.as_deref(), Some("all"));
    }

    #[test]
    fn test_sweep_args_require_a_command() {
        let result = SweepArgs::try_parse_from(Vec::<String>::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_split_target_prefix_forms() {
        assert_eq!(split_target_prefix("core1:date"), (Some("core1"), "date"));
        assert_eq!(split_target_prefix("date"), (None, "date"));
        assert_eq!(split_target_prefix(":date"), (None, "date"));
    }
}
