// src/constants.rs

/// The name of the hidden working directory inside a cluster project.
pub const CLUSTER_DIR: &str = ".cl";

/// The project descriptor file that marks a directory as a cluster project.
pub const PROJECT_DESCRIPTOR: &str = "Vagrantfile";

/// The name of the optional settings file at the project root.
pub const SETTINGS_FILENAME: &str = "vckube.toml";

/// The name of the membership cache file (inside .cl/).
pub const MEMBERS_CACHE_FILENAME: &str = "members.cache.bin";

/// Suffix for per-member ssh-config caches used by `status` (inside .cl/).
pub const SSH_CONFIG_CACHE_SUFFIX: &str = ".statuscluster";

/// The Ansible inventory file generated at the project root.
pub const INVENTORY_FILENAME: &str = "hosts";

/// Default login user on cluster members.
pub const DEFAULT_SSH_USER: &str = "core";

/// Default DNS suffix for member addresses.
pub const DEFAULT_DOMAIN: &str = "a8.nl";

/// Default candidate private keys, relative to the project root, tried in order.
pub const DEFAULT_KEY_PATHS: &[&str] = &["keys/secure/vagrantsecure", "keys/insecure/vagrant"];

/// Default per-command deadline for remote execution.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 60;

/// Deadline for `sudo reboot`; the connection drops long before a reply.
pub const REBOOT_TIMEOUT_SECS: u64 = 5;

/// Connect timeout handed to the ssh client itself.
pub const SSH_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Width of the bounded worker pool for parallel fan-out.
pub const FANOUT_POOL_WIDTH: usize = 8;

/// Port of the Kubernetes API server on the first cluster member.
pub const KUBE_API_PORT: u16 = 8080;

/// Where uploaded cloud-config lands on a member before being installed.
pub const USER_DATA_UPLOAD_PATH: &str = "/tmp/vagrantfile-user-data";

/// Final destination of the cloud-config on a member.
pub const USER_DATA_INSTALL_PATH: &str = "/var/lib/coreos-vagrant/vagrantfile-user-data";
