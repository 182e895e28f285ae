//! Dependency resolution and task execution
//!
//! A [`Runner`] owns one invocation's configuration and execution state.
//! `run(name)` makes sure `name` and everything it depends on have run
//! exactly once, fanning out to one thread per dependency when a task has
//! several.

use crate::config::{Config, Task};
use crate::error::{ConfigError, ExecutionError, Result, TrunError};
use crate::runner::{execute_commands, render, Context, PromptCollector};
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// Names of tasks that already ran during this invocation
#[derive(Debug, Default)]
pub struct ExecutionState {
    done: RwLock<HashSet<String>>,
}

impl ExecutionState {
    fn is_done(&self, name: &str) -> bool {
        self.done
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// Check and mark under one write lock. Returns false when another
    /// branch got there first.
    fn mark_done_if_new(&self, name: &str) -> bool {
        self.done
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string())
    }

    fn completed(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .done
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

/// Runs tasks from one configuration
pub struct Runner {
    config: Config,
    ctx: Context,
    state: ExecutionState,
    prompts: PromptCollector,
}

impl Runner {
    /// Create a runner that prompts on the terminal
    pub fn new(config: Config, ctx: Context) -> Self {
        Runner {
            config,
            ctx,
            state: ExecutionState::default(),
            prompts: PromptCollector::stdio(),
        }
    }

    /// Replace where interactive answers come from
    pub fn with_prompts(mut self, prompts: PromptCollector) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Look up a task by name
    pub fn task(&self, name: &str) -> Result<&Task> {
        self.config
            .task(name)
            .ok_or_else(|| ConfigError::TaskNotFound(name.to_string()).into())
    }

    /// Whether `name` has run (or is running) in this invocation
    pub fn is_done(&self, name: &str) -> bool {
        self.state.is_done(name)
    }

    /// Tasks that have run so far, sorted by name
    pub fn completed(&self) -> Vec<String> {
        self.state.completed()
    }

    /// Run `name` after all of its dependencies
    pub fn run(&self, name: &str) -> Result<()> {
        self.run_task(name, &[])
    }

    /// Like [`Runner::run`], also reporting the wall-clock time taken
    pub fn run_timed(&self, name: &str) -> Result<Duration> {
        let start = Instant::now();
        self.run(name)?;
        Ok(start.elapsed())
    }

    /// Run only the dependencies of `name`, not `name` itself
    pub fn run_dependencies(&self, name: &str) -> Result<()> {
        let task = self.task(name)?;
        self.run_all(&task.deps, &[name.to_string()])
    }

    /// Ask for the interactive fields declared by `name`
    pub fn collect_inputs(&self, name: &str) -> Result<HashMap<String, String>> {
        let task = self.task(name)?;
        Ok(self.prompts.collect(name, &task.interactive)?)
    }

    /// Render the command templates of `name` with static vars, then `inputs`
    pub fn render_commands(
        &self,
        name: &str,
        inputs: &HashMap<String, String>,
    ) -> Result<Vec<String>> {
        let task = self.task(name)?;
        task.cmds
            .iter()
            .map(|cmd| render(cmd, &self.config.vars, inputs).map_err(TrunError::from))
            .collect()
    }

    fn run_task(&self, name: &str, chain: &[String]) -> Result<()> {
        if chain.iter().any(|ancestor| ancestor == name) {
            let mut cycle = chain.to_vec();
            cycle.push(name.to_string());
            return Err(ConfigError::CircularDependency(cycle.join(" -> ")).into());
        }

        if self.state.is_done(name) {
            self.ctx.print_task_skip(name, "already ran");
            return Ok(());
        }

        let task = self.task(name)?;

        let mut path = chain.to_vec();
        path.push(name.to_string());
        self.run_all(&task.deps, &path)?;

        // The task is marked done before its commands run, not after. A
        // sibling branch that checks in the meantime skips it even though it
        // may still be running; in exchange its commands never run twice.
        if !self.state.mark_done_if_new(name) {
            debug!(task = name, "completed by another branch");
            return Ok(());
        }

        self.ctx.print_task_start(name);

        let inputs = self.prompts.collect(name, &task.interactive)?;
        let commands = self.render_commands(name, &inputs)?;
        execute_commands(&commands, &self.ctx)?;

        debug!(task = name, "task finished");
        Ok(())
    }

    /// Run every dependency; several run concurrently, none is cancelled
    fn run_all(&self, deps: &[String], path: &[String]) -> Result<()> {
        match deps {
            [] => Ok(()),
            [only] => self
                .run_task(only, path)
                .map_err(|e| dependency_failed(only, e)),
            many => {
                debug!(deps = ?many, "running dependencies in parallel");

                let results: Vec<Result<()>> = thread::scope(|scope| {
                    let handles: Vec<_> = many
                        .iter()
                        .map(|dep| scope.spawn(move || self.run_task(dep, path)))
                        .collect();

                    handles
                        .into_iter()
                        .zip(many)
                        .map(|(handle, dep)| {
                            handle
                                .join()
                                .unwrap_or_else(|_| Err(ExecutionError::Panicked(dep.clone()).into()))
                        })
                        .collect()
                });

                // First failure in declaration order
                for (dep, result) in many.iter().zip(results) {
                    result.map_err(|e| dependency_failed(dep, e))?;
                }
                Ok(())
            }
        }
    }
}

fn dependency_failed(name: &str, source: TrunError) -> TrunError {
    ExecutionError::DependencyFailed {
        name: name.to_string(),
        source: Box::new(source),
    }
    .into()
}
