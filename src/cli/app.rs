//! Main CLI application
//!
//! `t <task>` runs a task from `tasks.yaml`. Built-in commands start with
//! `:` so they can never clash with task names.

use crate::config::{
    dangling_dependencies, init_config, parse_config_auto, parse_config_file, validate_config,
    Config,
};
use crate::detach::{DetachedManager, DEFAULT_TAIL_LINES};
use crate::logging::{init_logging, LogLevel};
use crate::runner::{Context, Runner, Verbosity};
use crate::{ui, VERSION};
use anyhow::{bail, Context as _, Result};
use chrono::Local;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use colored::Colorize;
use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const ABOUT: &str = "A YAML task runner with parallel dependencies and background tasks";

const AFTER_HELP: &str = "\
Examples:
  t :init             Create a tasks.yaml in the current directory
  t :list             List the tasks in tasks.yaml
  t build             Run the build task and its dependencies
  t :detach serve     Run the serve task in the background
  t :ps               Show background tasks

Built-in commands start with ':' so they never clash with task names.";

/// A configuration file together with the context it implies
struct Loaded {
    config: Config,
    path: PathBuf,
    ctx: Context,
}

/// CLI application
pub struct App {
    /// Explicit `-f/--file`, otherwise discovered
    config_file: Option<PathBuf>,
    verbosity: Verbosity,
}

impl App {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        App {
            config_file: matches.get_one::<PathBuf>("file").cloned(),
            verbosity: get_verbosity(matches),
        }
    }

    /// Run the command selected by `matches`
    pub fn run(&self, matches: &ArgMatches) -> Result<()> {
        let Some((name, sub)) = matches.subcommand() else {
            build_command(None).print_help()?;
            println!();
            return Ok(());
        };

        match name {
            ":list" => self.list_tasks(),
            ":detach" => self.detach(required(sub, "task")?),
            ":ps" => self.ps(),
            ":stop" => self.stop(required(sub, "id")?),
            ":logs" => self.logs(
                required(sub, "id")?,
                sub.get_one::<usize>("lines").copied().unwrap_or(DEFAULT_TAIL_LINES),
                sub.get_flag("follow"),
            ),
            ":parallel" => self.parallel(required(sub, "task")?),
            ":init" => self.init(),
            ":completions" => match sub.get_one::<Shell>("shell") {
                Some(shell) => self.completions(*shell),
                None => bail!("missing shell name"),
            },
            ":version" => {
                println!("t {}", VERSION);
                Ok(())
            }
            tool if tool.starts_with(':') => {
                bail!("unknown command '{}' (run 't --help' for the list)", tool)
            }
            task => {
                let extra: Vec<&String> = sub.get_many::<String>("").into_iter().flatten().collect();
                if !extra.is_empty() {
                    bail!(
                        "task '{}' does not take arguments (got: {})",
                        task,
                        extra.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(" ")
                    );
                }
                self.run_task(task)
            }
        }
    }

    /// Load, validate and warn about the configuration
    fn load(&self) -> Result<Loaded> {
        let (config, path) = match &self.config_file {
            Some(path) => (parse_config_file(path)?, path.clone()),
            None => parse_config_auto().context("failed to load tasks.yaml (run 't :init' to create one)")?,
        };
        validate_config(&config).with_context(|| format!("invalid {}", path.display()))?;

        let mut ctx = Context::rooted_at(config_root(&path)).with_verbosity(self.verbosity);
        if let Some(shell) = &config.shell {
            ctx = ctx.with_shell(shell.clone());
        }

        for (task, dep) in dangling_dependencies(&config) {
            ctx.print_warning(&format!(
                "task '{}' depends on '{}', which is not defined",
                task, dep
            ));
        }

        debug!(path = %path.display(), tasks = config.tasks.len(), "loaded configuration");
        Ok(Loaded { config, path, ctx })
    }

    /// Context for commands that only touch detached state
    ///
    /// Falls back to the current directory when there is no usable config.
    fn state_context(&self) -> Context {
        match self.load() {
            Ok(loaded) => loaded.ctx,
            Err(e) => {
                debug!(error = %format!("{:#}", e), "using current directory for detached state");
                Context::new().with_verbosity(self.verbosity)
            }
        }
    }

    fn run_task(&self, name: &str) -> Result<()> {
        let Loaded { config, ctx, .. } = self.load()?;
        let runner = Runner::new(config, ctx.clone());

        runner
            .run(name)
            .with_context(|| format!("task '{}' failed", name))?;

        ctx.print_info(&ui::success(&format!("Task '{}' completed successfully", name)));
        Ok(())
    }

    fn parallel(&self, name: &str) -> Result<()> {
        let Loaded { config, ctx, .. } = self.load()?;
        ctx.print_info(&format!(
            "Starting task '{}' at {}",
            name,
            Local::now().format("%H:%M:%S%.3f")
        ));

        let runner = Runner::new(config, ctx.clone());
        let elapsed = runner
            .run_timed(name)
            .with_context(|| format!("task '{}' failed", name))?;

        ctx.print_info(&ui::success(&format!(
            "Task '{}' completed in {:.3}s ({} tasks ran)",
            name,
            elapsed.as_secs_f64(),
            runner.completed().len()
        )));
        Ok(())
    }

    fn list_tasks(&self) -> Result<()> {
        let Loaded { config, path, .. } = self.load()?;

        if config.tasks.is_empty() {
            println!("No tasks found in {}", path.display());
            return Ok(());
        }

        println!("Available tasks:");
        println!();
        for (name, task) in &config.tasks {
            let mut line = format!("  {}", name.bold());
            if let Some(desc) = task.desc.as_deref().filter(|d| !d.is_empty()) {
                line.push_str(&format!(" - {}", desc));
            }
            if !task.deps.is_empty() {
                line.push_str(&format!(" {}", ui::hint(&format!("(depends on: {})", task.deps.join(", ")))));
            }
            println!("{}", line);
        }
        println!();
        println!("{}", ui::hint("Run 't <task>' to execute a task"));
        Ok(())
    }

    fn detach(&self, name: &str) -> Result<()> {
        let Loaded { config, ctx, .. } = self.load()?;
        let runner = Runner::new(config, ctx.clone());
        let manager = DetachedManager::new(&ctx);

        let process = manager
            .start(&runner, name)
            .with_context(|| format!("failed to start task '{}' in the background", name))?;

        println!(
            "{}",
            ui::success(&format!(
                "Started task '{}' in the background (pid {})",
                process.task_name, process.pid
            ))
        );
        println!("  log: {}", process.log_file.display());
        println!(
            "{}",
            ui::hint(&format!("Follow it with 't :logs {} -f', stop it with 't :stop {}'", name, name))
        );
        Ok(())
    }

    fn ps(&self) -> Result<()> {
        let ctx = self.state_context();
        let manager = DetachedManager::new(&ctx);
        let processes = manager.list().context("failed to list background tasks")?;

        if processes.is_empty() {
            println!("No background tasks are running");
            println!("{}", ui::hint("Start one with 't :detach <task>'"));
            return Ok(());
        }

        println!("Background tasks ({}):", processes.len());
        println!();
        for process in &processes {
            println!("  {}", process.task_name.bold());
            println!("    pid:      {}", process.pid);
            println!("    running:  {}", ui::format_elapsed(process.running_for()));
            println!("    command:  {}", process.command);
            println!("    log:      {}", process.log_file.display());
        }
        println!();
        println!("{}", ui::hint("Stop one with 't :stop <task|pid>', view output with 't :logs <task|pid>'"));
        Ok(())
    }

    fn stop(&self, identifier: &str) -> Result<()> {
        let ctx = self.state_context();
        let manager = DetachedManager::new(&ctx);

        let process = manager
            .stop(identifier)
            .with_context(|| format!("failed to stop '{}' (see 't :ps')", identifier))?;

        println!(
            "{}",
            ui::success(&format!(
                "Stopped task '{}' (pid {})",
                process.task_name, process.pid
            ))
        );
        Ok(())
    }

    fn logs(&self, identifier: &str, lines: usize, follow: bool) -> Result<()> {
        let ctx = self.state_context();
        let manager = DetachedManager::new(&ctx);

        let log_file = manager
            .log_file(identifier)
            .with_context(|| format!("no background task matches '{}' (see 't :ps')", identifier))?;
        ctx.print_info(&ui::hint(&format!("==> {}", log_file.display())));

        let stdout = io::stdout();
        let mut out = stdout.lock();
        if follow {
            // Runs until interrupted
            manager.follow_logs(identifier, lines, &mut out, || false)?;
        } else {
            for line in manager.logs(identifier, lines)? {
                writeln!(out, "{}", line)?;
            }
        }
        Ok(())
    }

    fn init(&self) -> Result<()> {
        let dir = env::current_dir().context("failed to read the current directory")?;
        let path = init_config(&dir)?;

        println!("{}", ui::success(&format!("Created {}", path.display())));
        println!("{}", ui::hint("Run 't :list' to see the starter tasks"));
        Ok(())
    }

    fn completions(&self, shell: Shell) -> Result<()> {
        // Task names are included when a config can be found
        let config = self.load().ok().map(|loaded| loaded.config);
        let mut cmd = build_command(config.as_ref());
        clap_complete::generate(shell, &mut cmd, "t", &mut io::stdout());
        Ok(())
    }
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a str> {
    match matches.get_one::<String>(id) {
        Some(value) => Ok(value.as_str()),
        None => bail!("missing <{}>", id),
    }
}

/// Directory holding the config file, made absolute
fn config_root(config_path: &Path) -> PathBuf {
    let dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf())
}

/// Build the clap command
///
/// With a config, its tasks become subcommands so completions can offer
/// them; otherwise any task name is accepted as an external subcommand.
pub fn build_command(config: Option<&Config>) -> Command {
    let mut cmd = Command::new("t")
        .version(VERSION)
        .about(ABOUT)
        .after_help(AFTER_HELP)
        .allow_external_subcommands(true)
        .external_subcommand_value_parser(value_parser!(String))
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Path to tasks.yaml (default: search upwards from the current directory)"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print command output and errors")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .value_parser(value_parser!(LogLevel))
                .help("Diagnostic log level (default: $TRUN_LOG or warn)")
                .global(true),
        )
        .subcommand(
            Command::new(":list")
                .about("List all tasks")
                .visible_aliases([":ls", ":tasks"]),
        )
        .subcommand(
            Command::new(":detach")
                .about("Run a task in the background")
                .visible_aliases([":d", ":bg"])
                .arg(Arg::new("task").required(true).value_name("TASK")),
        )
        .subcommand(
            Command::new(":ps")
                .about("List running background tasks")
                .visible_aliases([":status"]),
        )
        .subcommand(
            Command::new(":stop")
                .about("Stop a background task and everything it started")
                .visible_aliases([":kill"])
                .arg(Arg::new("id").required(true).value_name("TASK|PID")),
        )
        .subcommand(
            Command::new(":logs")
                .about("Show the output of a background task")
                .visible_aliases([":log", ":tail"])
                .arg(Arg::new("id").required(true).value_name("TASK|PID"))
                .arg(
                    Arg::new("follow")
                        .short('f')
                        .long("follow")
                        .help("Keep printing new output")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("lines")
                        .short('n')
                        .long("lines")
                        .value_name("N")
                        .value_parser(value_parser!(usize))
                        .default_value(DEFAULT_TAIL_LINES.to_string())
                        .help("Number of lines to show"),
                ),
        )
        .subcommand(
            Command::new(":parallel")
                .about("Run a task and report how long it took")
                .arg(Arg::new("task").required(true).value_name("TASK")),
        )
        .subcommand(Command::new(":init").about("Create a starter tasks.yaml"))
        .subcommand(
            Command::new(":completions")
                .about("Print a shell completion script")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(value_parser!(Shell)),
                ),
        )
        .subcommand(Command::new(":version").about("Print version information"));

    if let Some(config) = config {
        for (name, task) in &config.tasks {
            cmd = cmd.subcommand(
                Command::new(name.clone()).about(task.desc.clone().unwrap_or_default()),
            );
        }
    }

    cmd
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Run the CLI application
pub fn run() -> Result<()> {
    let matches = build_command(None).get_matches();
    init_logging(matches.get_one::<LogLevel>("log-level").copied())?;

    App::from_matches(&matches).run(&matches)
}
