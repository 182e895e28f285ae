//! trun - a YAML task runner
//!
//! Tasks are declared in `tasks.yaml` with dependencies, shell commands,
//! template variables and interactive inputs. Dependencies run once per
//! invocation, in parallel where possible, and tasks can be left running in
//! the background and managed from later invocations.

// Public modules
pub mod cli;
pub mod config;
pub mod detach;
pub mod error;
pub mod logging;
pub mod runner;
pub mod ui;

// Re-export commonly used types
pub use error::{Result, TrunError};

/// Current version of trun
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
