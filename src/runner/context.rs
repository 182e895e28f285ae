//! Execution context for task running
//!
//! The context holds the per-invocation settings shared by every task:
//! where commands run, which shell runs them, where detached state lives
//! and how chatty the output is. It is read-only during a run, so fan-out
//! threads share it by reference.

use crate::ui;
use std::env;
use std::path::PathBuf;

/// Directory (under the state dir) holding one record per detached process
pub const PROCESSES_DIR: &str = ".t-processes";

/// Directory (under the state dir) holding detached task logs
pub const LOGS_DIR: &str = ".t-logs";

/// Execution context shared by all tasks of one invocation
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory commands run in
    pub working_dir: PathBuf,

    /// Root for detached process records and logs
    pub state_dir: PathBuf,

    /// Shell program and arguments, the command string is appended
    pub shell: Vec<String>,

    /// Verbosity level
    pub verbosity: Verbosity,
}

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

/// The host's command shell
pub fn default_shell() -> Vec<String> {
    if cfg!(windows) {
        vec!["powershell".to_string(), "-Command".to_string()]
    } else {
        vec!["sh".to_string(), "-c".to_string()]
    }
}

impl Context {
    /// Create a new context rooted at the current directory
    pub fn new() -> Self {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Context {
            working_dir: cwd.clone(),
            state_dir: cwd,
            shell: default_shell(),
            verbosity: Verbosity::Normal,
        }
    }

    /// Run commands and keep detached state under `dir`
    pub fn rooted_at(dir: PathBuf) -> Self {
        Context::new().with_working_dir(dir.clone()).with_state_dir(dir)
    }

    /// Create a context with a specific working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    /// Set the root for detached process state
    pub fn with_state_dir(mut self, dir: PathBuf) -> Self {
        self.state_dir = dir;
        self
    }

    /// Set the shell
    pub fn with_shell(mut self, shell: Vec<String>) -> Self {
        self.shell = shell;
        self
    }

    /// Set verbosity level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn processes_dir(&self) -> PathBuf {
        self.state_dir.join(PROCESSES_DIR)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.state_dir.join(LOGS_DIR)
    }

    /// Print info message
    pub fn print_info(&self, message: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{}", message);
        }
    }

    /// Print warning message
    pub fn print_warning(&self, message: &str) {
        if self.verbosity >= Verbosity::Quiet {
            eprintln!("{}", ui::warning(message));
        }
    }

    /// Print debug message (only in verbose mode)
    pub fn print_debug(&self, message: &str) {
        if self.verbosity >= Verbosity::Verbose {
            eprintln!("{}", ui::hint(message));
        }
    }

    /// Print task start message
    pub fn print_task_start(&self, task_name: &str) {
        self.print_info(&ui::task_start(task_name));
    }

    /// Print the command about to run
    pub fn print_command(&self, command: &str) {
        self.print_info(&ui::command(command));
    }

    /// Print a command's success
    pub fn print_command_done(&self) {
        self.print_info(&ui::command_done());
    }

    /// Print task skip message
    pub fn print_task_skip(&self, task_name: &str, reason: &str) {
        self.print_debug(&format!("Skipping task '{}': {}", task_name, reason));
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_new() {
        let ctx = Context::new();
        assert_eq!(ctx.verbosity, Verbosity::Normal);
        assert_eq!(ctx.shell, default_shell());
        assert_eq!(ctx.working_dir, ctx.state_dir);
    }

    #[test]
    fn test_rooted_at() {
        let ctx = Context::rooted_at(PathBuf::from("/tmp/project"));
        assert_eq!(ctx.working_dir, PathBuf::from("/tmp/project"));
        assert_eq!(
            ctx.processes_dir(),
            PathBuf::from("/tmp/project").join(PROCESSES_DIR)
        );
        assert_eq!(ctx.logs_dir(), PathBuf::from("/tmp/project").join(LOGS_DIR));
    }

    #[test]
    fn test_verbosity_levels() {
        assert!(Verbosity::Verbose > Verbosity::Normal);
        assert!(Verbosity::Normal > Verbosity::Quiet);
        assert!(Verbosity::Quiet > Verbosity::Silent);
    }

    #[test]
    fn test_with_shell() {
        let ctx = Context::new().with_shell(vec!["bash".to_string(), "-c".to_string()]);
        assert_eq!(ctx.shell, vec!["bash", "-c"]);
    }

    #[test]
    fn test_with_verbosity() {
        let ctx = Context::new().with_verbosity(Verbosity::Verbose);
        assert_eq!(ctx.verbosity, Verbosity::Verbose);
    }
}
