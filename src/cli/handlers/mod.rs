// src/cli/handlers/mod.rs

// One module per CLI command, plus the plumbing they share.

pub mod ansible;
pub mod cache;
pub mod commons;
pub mod destroy;
pub mod halt;
pub mod inventory;
pub mod kubectl;
pub mod reboot;
pub mod reload;
pub mod reset;
pub mod ssh;
pub mod sshcmd;
pub mod status;
pub mod up;
