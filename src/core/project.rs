// src/core/project.rs

use crate::{
    constants::{
        CLUSTER_DIR, INVENTORY_FILENAME, MEMBERS_CACHE_FILENAME, PROJECT_DESCRIPTOR,
        SETTINGS_FILENAME,
    },
    models::{ClusterSettings, HostPlatform},
};
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

lazy_static! {
    static ref INSTANCE_COUNT_RE: Regex =
        Regex::new(r"num_instances\s*=\s*(\d+)").expect("instance count pattern is valid");
}

#[derive(Error, Debug)]
pub enum ProjectError {
    /// No `Vagrantfile` was found in the start directory or any ancestor.
    #[error(
        "No cluster project found at '{start}' or above. Change to a directory with a '{PROJECT_DESCRIPTOR}' in it, or pass --workingdir."
    )]
    NotAProject { start: String },
    #[error("Working directory '{path}' is not accessible: {source}")]
    WorkingDirAccess {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Filesystem error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not parse settings file '{path}': {source}")]
    SettingsParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Could not expand key path '{template}': {reason}")]
    KeyPathExpansion { template: String, reason: String },
}

type ProjectResult<T> = Result<T, ProjectError>;

/// Everything an operation needs to know about the cluster project it acts on.
///
/// Replaces any reliance on the process working directory: the context is
/// resolved once at the start of a command and passed down explicitly.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    root: PathBuf,
    platform: HostPlatform,
    settings: ClusterSettings,
}

impl ProjectContext {
    /// Locates the project root by walking from `start` (default: the current
    /// directory) up the ancestor chain to the first directory containing a
    /// project descriptor, then loads its settings.
    pub fn discover(start: Option<PathBuf>) -> ProjectResult<Self> {
        let start = match start {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };
        let canonical =
            dunce::canonicalize(&start).map_err(|e| ProjectError::WorkingDirAccess {
                path: start.display().to_string(),
                source: e,
            })?;

        let mut dir = canonical.as_path();
        loop {
            if dir.join(PROJECT_DESCRIPTOR).is_file() {
                log::debug!("Cluster project root resolved to {}", dir.display());
                return Self::open(dir.to_path_buf());
            }
            match dir.parent() {
                Some(parent) => dir = parent,
                None => {
                    return Err(ProjectError::NotAProject {
                        start: canonical.display().to_string(),
                    });
                }
            }
        }
    }

    /// Builds a context for a directory already known to be a project root.
    pub fn open(root: PathBuf) -> ProjectResult<Self> {
        let settings = load_settings(&root)?;
        Ok(Self {
            root,
            platform: HostPlatform::detect(),
            settings,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn platform(&self) -> HostPlatform {
        self.platform
    }

    pub fn settings(&self) -> &ClusterSettings {
        &self.settings
    }

    pub fn descriptor_path(&self) -> PathBuf {
        self.root.join(PROJECT_DESCRIPTOR)
    }

    /// The hidden per-project working directory (`.cl/`).
    pub fn cluster_dir(&self) -> PathBuf {
        self.root.join(CLUSTER_DIR)
    }

    /// Creates the hidden working directory if it does not exist yet.
    pub fn ensure_cluster_dir(&self) -> ProjectResult<PathBuf> {
        let dir = self.cluster_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }

    pub fn members_cache_path(&self) -> PathBuf {
        self.cluster_dir().join(MEMBERS_CACHE_FILENAME)
    }

    pub fn inventory_path(&self) -> PathBuf {
        self.root.join(INVENTORY_FILENAME)
    }

    /// Reads the declared instance count from the project descriptor, if the
    /// descriptor states one (`$num_instances = N`).
    pub fn instance_count(&self) -> Option<u32> {
        let text = fs::read_to_string(self.descriptor_path()).ok()?;
        parse_instance_count(&text)
    }

    /// Expands the configured candidate key paths against the project root.
    /// Existence is not checked here; the remote transport skips missing keys.
    pub fn candidate_key_paths(&self) -> ProjectResult<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(self.settings.key_paths.len());
        for template in &self.settings.key_paths {
            let expanded = shellexpand::full(template).map_err(|e| {
                ProjectError::KeyPathExpansion {
                    template: template.clone(),
                    reason: e.to_string(),
                }
            })?;
            let path = PathBuf::from(expanded.into_owned());
            if path.is_absolute() {
                paths.push(path);
            } else {
                paths.push(self.root.join(path));
            }
        }
        Ok(paths)
    }
}

/// Extracts the declared instance count from descriptor text.
fn parse_instance_count(descriptor: &str) -> Option<u32> {
    INSTANCE_COUNT_RE
        .captures(descriptor)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn load_settings(root: &Path) -> ProjectResult<ClusterSettings> {
    let path = root.join(SETTINGS_FILENAME);
    if !path.exists() {
        return Ok(ClusterSettings::default());
    }
    let text = fs::read_to_string(&path)?;
    toml::from_str(&text).map_err(|e| ProjectError::SettingsParse {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn project_with_descriptor(descriptor: &str) -> TempDir {
        let dir = TempDir::new().unwrap();
        let mut f = fs::File::create(dir.path().join(PROJECT_DESCRIPTOR)).unwrap();
        f.write_all(descriptor.as_bytes()).unwrap();
        dir
    }

    #[test]
    fn test_discover_walks_up_to_descriptor() {
        // --- Setup ---
        let dir = project_with_descriptor("$num_instances = 3\n");
        let nested = dir.path().join("configscripts").join("deep");
        fs::create_dir_all(&nested).unwrap();

        // --- Execute ---
        let ctx = ProjectContext::discover(Some(nested)).unwrap();

        // --- Assert ---
        assert_eq!(ctx.root(), dunce::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn test_discover_fails_without_descriptor() {
        let dir = TempDir::new().unwrap();
        let result = ProjectContext::discover(Some(dir.path().to_path_buf()));
        assert!(matches!(result, Err(ProjectError::NotAProject { .. })));
    }

    #[test]
    fn test_parse_instance_count_from_realistic_descriptor() {
        let descriptor = r#"
# -*- mode: ruby -*-
$update_channel = 'alpha'
$num_instances = 3
$vm_memory = 2048

Vagrant.configure("2") do |config|
  (1..$num_instances).each do |i|
  end
end
"#;
        assert_eq!(parse_instance_count(descriptor), Some(3));
    }

    #[test]
    fn test_parse_instance_count_absent() {
        assert_eq!(parse_instance_count("Vagrant.configure(\"2\")"), None);
    }

    #[test]
    fn test_settings_default_when_file_absent() {
        let dir = project_with_descriptor("");
        let ctx = ProjectContext::open(dir.path().to_path_buf()).unwrap();
        assert_eq!(ctx.settings().ssh_user, "core");
        assert_eq!(ctx.settings().domain, "a8.nl");
        assert_eq!(ctx.settings().key_paths.len(), 2);
    }

    #[test]
    fn test_settings_partial_file_keeps_defaults() {
        // --- Setup ---
        let dir = project_with_descriptor("");
        fs::write(
            dir.path().join(SETTINGS_FILENAME),
            "domain = \"cluster.test\"\n",
        )
        .unwrap();

        // --- Execute ---
        let ctx = ProjectContext::open(dir.path().to_path_buf()).unwrap();

        // --- Assert ---
        assert_eq!(ctx.settings().domain, "cluster.test");
        assert_eq!(ctx.settings().ssh_user, "core");
    }

    #[test]
    fn test_candidate_key_paths_resolve_relative_to_root() {
        let dir = project_with_descriptor("");
        let ctx = ProjectContext::open(dir.path().to_path_buf()).unwrap();
        let paths = ctx.candidate_key_paths().unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.starts_with(dir.path())));
    }
}
