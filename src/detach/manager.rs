//! Starting, finding and stopping detached tasks
//!
//! Nothing is kept in memory between invocations: every query goes back to
//! the record store and asks the platform whether the recorded pid is still
//! alive.

use crate::detach::logs;
use crate::detach::{DetachedProcess, PlatformControl, ProcessControl, RecordStore};
use crate::error::{DetachError, Result};
use crate::runner::{execute_commands, Context, Runner};
use chrono::Local;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::thread;
use tracing::{debug, warn};

/// Launches detached tasks and manages their records
pub struct DetachedManager<C: ProcessControl = PlatformControl> {
    store: RecordStore,
    logs_dir: PathBuf,
    control: C,
}

impl DetachedManager<PlatformControl> {
    /// Manager for the state directory of `ctx`, using the host's process control
    pub fn new(ctx: &Context) -> Self {
        Self::with_control(ctx, PlatformControl::default())
    }
}

impl<C: ProcessControl> DetachedManager<C> {
    pub fn with_control(ctx: &Context, control: C) -> Self {
        DetachedManager {
            store: RecordStore::new(ctx.processes_dir()),
            logs_dir: ctx.logs_dir(),
            control,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Start `name` in the background
    ///
    /// Dependencies and every command but the last run in the foreground
    /// first; the last command is the one left running. Returns as soon as it
    /// has been spawned.
    pub fn start(&self, runner: &Runner, name: &str) -> Result<DetachedProcess> {
        let task = runner.task(name)?;
        if task.cmds.is_empty() {
            return Err(DetachError::NoCommands(name.to_string()).into());
        }

        runner.run_dependencies(name)?;

        let inputs = runner.collect_inputs(name)?;
        let mut commands = runner.render_commands(name, &inputs)?;
        let Some(main) = commands.pop() else {
            return Err(DetachError::NoCommands(name.to_string()).into());
        };

        let ctx = runner.context();
        if !commands.is_empty() {
            ctx.print_task_start(name);
            execute_commands(&commands, ctx)?;
        }

        fs::create_dir_all(&self.logs_dir)?;
        let log_file = self.logs_dir.join(log_file_name(name, Local::now()));
        let log = File::create(&log_file)?;

        let mut child = self
            .control
            .spawn_detached(&ctx.shell, &main, &ctx.working_dir, &log)
            .map_err(DetachError::Spawn)?;
        let pid = child.id();
        debug!(pid, task = name, command = %main, "spawned detached process");

        let record = DetachedProcess {
            pid,
            task_name: name.to_string(),
            command: main,
            started_at: Local::now(),
            log_file,
        };

        if let Err(e) = self.store.save(&record) {
            warn!(pid, error = %e, "failed to save process record");
        }

        let store = self.store.clone();
        let reaper = thread::Builder::new()
            .name(format!("reaper-{}", pid))
            .spawn(move || {
                let status = child.wait();
                debug!(pid, ?status, "detached process exited");
                if let Err(e) = store.remove(pid) {
                    warn!(pid, error = %e, "failed to remove process record");
                }
                drop(log);
            });
        if let Err(e) = reaper {
            warn!(pid, error = %e, "failed to start reaper thread");
        }

        Ok(record)
    }

    /// Live detached processes, oldest first
    ///
    /// Records whose process has died are deleted on the way.
    pub fn list(&self) -> Result<Vec<DetachedProcess>> {
        let mut live = Vec::new();
        for record in self.store.load_all()? {
            if self.control.is_alive(record.pid) {
                live.push(record);
            } else {
                debug!(pid = record.pid, task = %record.task_name, "removing stale record");
                if let Err(e) = self.store.remove(record.pid) {
                    warn!(pid = record.pid, error = %e, "failed to remove stale record");
                }
            }
        }

        live.sort_by_key(|r| r.started_at);
        Ok(live)
    }

    /// Find a live process by pid, or else by task name
    pub fn resolve(&self, identifier: &str) -> Result<DetachedProcess> {
        let mut live = self.list()?;

        let by_pid = identifier
            .parse::<u32>()
            .ok()
            .and_then(|pid| live.iter().position(|r| r.pid == pid));
        let found = by_pid.or_else(|| live.iter().position(|r| r.task_name == identifier));

        match found {
            Some(index) => Ok(live.swap_remove(index)),
            None => Err(DetachError::NotFound(identifier.to_string()).into()),
        }
    }

    /// Terminate a detached process and everything it started
    ///
    /// The record is removed even when termination fails.
    pub fn stop(&self, identifier: &str) -> Result<DetachedProcess> {
        let record = self.resolve(identifier)?;
        let outcome = self.control.terminate_tree(record.pid);

        if let Err(e) = self.store.remove(record.pid) {
            warn!(pid = record.pid, error = %e, "failed to remove process record");
        }

        outcome?;
        Ok(record)
    }

    /// Log file of a live detached process
    pub fn log_file(&self, identifier: &str) -> Result<PathBuf> {
        Ok(self.resolve(identifier)?.log_file)
    }

    /// Last `lines` lines of a detached process's output
    pub fn logs(&self, identifier: &str, lines: usize) -> Result<Vec<String>> {
        logs::tail(&self.log_file(identifier)?, lines)
    }

    /// Write the last `lines` lines, then keep writing new output until
    /// `done` returns true
    pub fn follow_logs<W, F>(&self, identifier: &str, lines: usize, out: &mut W, done: F) -> Result<()>
    where
        W: Write,
        F: FnMut() -> bool,
    {
        logs::follow(&self.log_file(identifier)?, lines, out, done)
    }
}

/// `<task>-<YYYYmmdd-HHMMSS>.log`, with path-unfriendly characters replaced
fn log_file_name(task: &str, at: chrono::DateTime<Local>) -> String {
    let safe: String = task
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}-{}.log", safe, at.format("%Y%m%d-%H%M%S"))
}
