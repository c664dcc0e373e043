// src/models.rs

use crate::constants;
use serde::{Deserialize, Serialize};

// --- CLUSTER MEMBERSHIP MODELS ---
// Primary structures shared between runtime use and the binary membership cache.

/// One virtual machine in the cluster.
///
/// The `ssh_config` blob is the raw `vagrant ssh-config` text captured during a
/// live membership query. Synthesized members carry `None`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    pub name: String,
    pub ssh_config: Option<String>,
}

impl Machine {
    /// A member with no captured ssh configuration.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ssh_config: None,
        }
    }

    /// The DNS address the cluster exposes for this member.
    pub fn address(&self, domain: &str) -> String {
        format!("{}.{}", self.name, domain)
    }
}

// --- SETTINGS MODELS (vckube.toml) ---

/// Per-project settings, read from an optional `vckube.toml` at the project
/// root. Every field has a default, so the file may be absent or partial.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ClusterSettings {
    /// Login user on the members.
    #[serde(default = "default_ssh_user")]
    pub ssh_user: String,

    /// DNS suffix appended to member names.
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Candidate private keys, tried in order. Relative paths resolve against
    /// the project root; `~` and environment variables are expanded.
    #[serde(default = "default_key_paths")]
    pub key_paths: Vec<String>,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            ssh_user: default_ssh_user(),
            domain: default_domain(),
            key_paths: default_key_paths(),
        }
    }
}

fn default_ssh_user() -> String {
    constants::DEFAULT_SSH_USER.to_string()
}

fn default_domain() -> String {
    constants::DEFAULT_DOMAIN.to_string()
}

fn default_key_paths() -> Vec<String> {
    constants::DEFAULT_KEY_PATHS
        .iter()
        .map(|p| (*p).to_string())
        .collect()
}

// --- HOST PLATFORM ---

/// The operating system of the machine running this tool. Decides the
/// synthetic member name prefix and a couple of cosmetic labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    MacOs,
    Linux,
}

impl HostPlatform {
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Linux
        }
    }

    /// Prefix for synthesized member names (`core1`, `node1`, ...).
    pub fn member_prefix(self) -> &'static str {
        match self {
            Self::MacOs => "core",
            Self::Linux => "node",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::MacOs => "OSX",
            Self::Linux => "Linux",
        }
    }
}
