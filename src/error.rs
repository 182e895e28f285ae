//! Error types for trun

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for trun operations
pub type Result<T> = std::result::Result<T, TrunError>;

/// Main error type for trun
#[derive(Error, Debug)]
pub enum TrunError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Variable interpolation errors
    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    /// Detached process lifecycle errors
    #[error("Detached task error: {0}")]
    Detach(#[from] DetachError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Process record (de)serialization errors
    #[error("Process record error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Task '{0}' is not defined")]
    TaskNotFound(String),

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Config file '{}' already exists", .0.display())]
    AlreadyExists(PathBuf),
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    #[error("Failed to start shell for '{command}': {error}")]
    Spawn { command: String, error: io::Error },

    #[error("Dependency '{name}' failed: {source}")]
    DependencyFailed {
        name: String,
        #[source]
        source: Box<TrunError>,
    },

    #[error("Required input '{0}' not provided")]
    MissingInput(String),

    #[error("Input stream closed while reading '{0}'")]
    InputClosed(String),

    #[error("Prompt I/O failed for '{field}': {error}")]
    PromptIo { field: String, error: io::Error },

    #[error("Task '{0}' panicked while running")]
    Panicked(String),
}

/// Variable interpolation errors
#[derive(Error, Debug)]
pub enum InterpolationError {
    #[error("Invalid template syntax: {0}")]
    InvalidSyntax(String),

    #[error("Unclosed action starting at byte {0}")]
    Unclosed(usize),
}

/// Detached process errors
#[derive(Error, Debug)]
pub enum DetachError {
    #[error("No detached process found with identifier: {0}")]
    NotFound(String),

    #[error("Task '{0}' has no commands to run")]
    NoCommands(String),

    #[error("Log file not found: {}", .0.display())]
    LogMissing(PathBuf),

    #[error("Failed to terminate process tree {pid}: {error}")]
    Terminate { pid: u32, error: String },

    #[error("Failed to start detached process: {0}")]
    Spawn(io::Error),
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

/// Specialized result type for interpolation operations
pub type InterpolationResult<T> = std::result::Result<T, InterpolationError>;

/// Specialized result type for detached process operations
pub type DetachResult<T> = std::result::Result<T, DetachError>;

impl TrunError {
    /// The innermost error, following dependency failures down to the task
    /// that actually failed.
    pub fn root_cause(&self) -> &TrunError {
        match self {
            TrunError::Execution(ExecutionError::DependencyFailed { source, .. }) => {
                source.root_cause()
            }
            other => other,
        }
    }
}
