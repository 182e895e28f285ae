//! Task execution engine
//!
//! This module handles running tasks: template expansion, interactive
//! input, shell commands and dependency resolution.

pub mod command;
pub mod context;
pub mod graph;
pub mod interpolate;
pub mod prompt;

// Re-export main types
pub use command::*;
pub use context::*;
pub use graph::*;
pub use interpolate::*;
pub use prompt::*;
