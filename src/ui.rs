//! Operator-facing output formatting
//!
//! These helpers only build strings; `runner::Context` decides whether they
//! are printed at the current verbosity.

use colored::Colorize;
use std::time::Duration;

pub fn task_start(name: &str) -> String {
    format!("{} {}", "==>".blue().bold(), format!("Running task: {}", name).bold())
}

pub fn command(cmd: &str) -> String {
    format!("{} {}", "  ->".cyan(), cmd)
}

pub fn command_done() -> String {
    format!("{}", "  ok".green())
}

pub fn success(message: &str) -> String {
    format!("{} {}", "✓".green().bold(), message)
}

pub fn warning(message: &str) -> String {
    format!("{} {}", "!".yellow().bold(), message)
}

pub fn failure(message: &str) -> String {
    format!("{} {}", "✗".red().bold(), message)
}

pub fn hint(message: &str) -> String {
    format!("{}", message.dimmed())
}

/// Human-readable elapsed time, e.g. `42s`, `3m 5s`, `2h 10m`, `1d 4h`
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(42)), "42s");
        assert_eq!(format_elapsed(Duration::from_secs(185)), "3m 5s");
        assert_eq!(format_elapsed(Duration::from_secs(7800)), "2h 10m");
        assert_eq!(format_elapsed(Duration::from_secs(100_800)), "1d 4h");
    }

    #[test]
    fn test_messages_carry_text() {
        colored::control::set_override(false);
        assert_eq!(task_start("build"), "==> Running task: build");
        assert_eq!(command("make"), "  -> make");
    }
}
