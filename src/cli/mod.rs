//! CLI interface and argument parsing
//!
//! This module handles command-line parsing, dispatch to the runner and the
//! detached task manager, and shell completion.

pub mod app;

// Re-export main types
pub use app::*;
