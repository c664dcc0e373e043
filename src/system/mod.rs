//! # System Interaction Layer
//!
//! This module is the boundary between the core cluster logic and the
//! underlying operating system.
//!
//! ## Modules
//!
//! - **`executor`**: Spawns and supervises external processes. It handles
//!   graceful cancellation (`Ctrl+C`), output capturing, and deadline-bound
//!   execution for remote commands.
//! - **`ssh`**: Builds and runs `ssh`/`scp` invocations against cluster
//!   members, translating process-level failures into remote-command errors.

pub mod executor;
pub mod ssh;
