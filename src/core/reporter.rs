// src/core/reporter.rs

use crate::system::ssh::RemoteResult;
use colored::*;

/// Prints per-member results of a fan-out sweep and suppresses repeats.
///
/// Only the immediately preceding successful, non-empty output is remembered;
/// a member whose output matches it is reported as `same`. Failures and empty
/// outputs leave that memory untouched.
pub struct Reporter {
    command: String,
    previous: Option<String>,
}

impl Reporter {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            previous: None,
        }
    }

    pub fn report(&mut self, member: &str, outcome: &RemoteResult<String>) {
        let (line, advance) = render(member, &self.command, outcome, self.previous.as_deref());
        println!("{line}");
        if let Some(next) = advance {
            self.previous = Some(next);
        }
    }
}

/// Formats one outcome. Returns the display line plus the value the repeat
/// memory should advance to, if any.
fn render(
    member: &str,
    command: &str,
    outcome: &RemoteResult<String>,
    previous: Option<&str>,
) -> (String, Option<String>) {
    let raw = match outcome {
        Ok(raw) => raw,
        Err(e) => {
            let line = format!("{} {}", format!("results {member}:").red().bold(), e);
            return (line, None);
        }
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        log::debug!("'{command}' produced no output on {member}.");
        let line = format!(
            "{} {}",
            format!("{member}...").cyan().bold(),
            "done".dimmed()
        );
        return (line, None);
    }

    let header = format!("results {member}:").blue().bold();
    if previous == Some(trimmed) {
        return (
            format!("{} {}", header, "same".dimmed()),
            Some(trimmed.to_string()),
        );
    }

    let body = if trimmed.contains('\n') {
        format!("\n{trimmed}\n-")
    } else {
        trimmed.to_string()
    };
    (format!("{header} {body}"), Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::ssh::RemoteError;

    #[test]
    fn test_single_line_result_is_inlined() {
        // --- Execute ---
        let (line, advance) = render("core1", "uptime", &Ok("up 3 days".to_string()), None);

        // --- Assert ---
        assert!(line.contains("results core1:"));
        assert!(line.contains("up 3 days"));
        assert_eq!(advance.as_deref(), Some("up 3 days"));
    }

    #[test]
    fn test_repeat_of_previous_result_collapses_to_same() {
        // --- Execute ---
        let (line, advance) = render(
            "core2",
            "cat /etc/os-release",
            &Ok("VERSION_ID=766.3.0\n".to_string()),
            Some("VERSION_ID=766.3.0"),
        );

        // --- Assert ---
        assert!(line.contains("same"));
        assert!(!line.contains("VERSION_ID"));
        assert_eq!(advance.as_deref(), Some("VERSION_ID=766.3.0"));
    }

    #[test]
    fn test_repeat_memory_is_only_one_deep() {
        // --- Setup ---
        // core1 and core3 agree, but core2 sits between them.
        let (_, after_first) = render("core1", "date", &Ok("A".to_string()), None);
        let (_, after_second) =
            render("core2", "date", &Ok("B".to_string()), after_first.as_deref());

        // --- Execute ---
        let (line, _) = render("core3", "date", &Ok("A".to_string()), after_second.as_deref());

        // --- Assert ---
        assert!(line.contains('A'));
        assert!(!line.contains("same"));
    }

    #[test]
    fn test_empty_output_is_a_done_notice_and_keeps_memory() {
        // --- Execute ---
        let (line, advance) = render("node1", "sudo reboot", &Ok("  \n".to_string()), Some("A"));

        // --- Assert ---
        assert!(line.contains("node1..."));
        assert!(line.contains("done"));
        assert!(advance.is_none());
    }

    #[test]
    fn test_multi_line_output_is_wrapped() {
        // --- Execute ---
        let (line, _) = render(
            "core1",
            "systemctl list-units",
            &Ok("kube-apiserver loaded\nkube-scheduler loaded\n".to_string()),
            None,
        );

        // --- Assert ---
        assert!(line.contains("\nkube-apiserver loaded\nkube-scheduler loaded\n-"));
    }

    #[test]
    fn test_failure_is_reported_and_keeps_memory() {
        // --- Setup ---
        let outcome = Err(RemoteError::Timeout {
            member: "core2.a8.nl".to_string(),
            secs: 60,
        });

        // --- Execute ---
        let (line, advance) = render("core2", "uptime", &outcome, Some("A"));

        // --- Assert ---
        assert!(line.contains("results core2:"));
        assert!(line.contains("60 seconds"));
        assert!(advance.is_none());
    }
}
