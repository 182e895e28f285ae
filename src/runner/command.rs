//! Command execution
//!
//! This module runs rendered command strings through the host shell.

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::context::{default_shell, Context};
use std::process::{Command as StdCommand, Stdio};
use tracing::debug;

/// Build a shell invocation for `command` without spawning it
pub fn shell_command(shell: &[String], command: &str) -> StdCommand {
    let fallback;
    let shell = if shell.is_empty() {
        fallback = default_shell();
        &fallback[..]
    } else {
        shell
    };

    let mut cmd = StdCommand::new(&shell[0]);
    cmd.args(&shell[1..]);
    cmd.arg(command);
    cmd
}

/// Run one command with the invocation's stdio attached
pub fn execute_command(command: &str, ctx: &Context) -> ExecutionResult<()> {
    ctx.print_command(command);

    let mut cmd = shell_command(&ctx.shell, command);
    cmd.current_dir(&ctx.working_dir);
    cmd.stdin(Stdio::inherit());
    cmd.stdout(Stdio::inherit());
    cmd.stderr(Stdio::inherit());

    debug!(%command, dir = %ctx.working_dir.display(), "spawning command");
    let status = cmd.status().map_err(|error| ExecutionError::Spawn {
        command: command.to_string(),
        error,
    })?;

    if !status.success() {
        debug!(%command, code = ?status.code(), "command failed");
        return Err(ExecutionError::CommandFailed {
            command: command.to_string(),
            code: status.code(),
        });
    }

    ctx.print_command_done();
    Ok(())
}

/// Run commands in order, stopping at the first failure
pub fn execute_commands<S: AsRef<str>>(commands: &[S], ctx: &Context) -> ExecutionResult<()> {
    for command in commands {
        execute_command(command.as_ref(), ctx)?;
    }
    Ok(())
}
