//! Configuration validation
//!
//! Load-time sanity checks. Dependency names are deliberately not resolved
//! here: a missing dependency only fails the run that reaches it.

use crate::config::types::{Config, Task};
use crate::error::{ConfigError, ConfigResult};

/// Prefix reserved for built-in commands such as `:list`
pub const TOOL_COMMAND_PREFIX: char = ':';

/// Validate a complete configuration
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    if let Some(shell) = &config.shell {
        if shell.is_empty() || shell[0].trim().is_empty() {
            return Err(ConfigError::Invalid(
                "shell must name a program, e.g. [\"bash\", \"-c\"]".to_string(),
            ));
        }
    }

    for (name, task) in &config.tasks {
        validate_task(name, task)?;
    }

    Ok(())
}

/// Validate a single task
pub fn validate_task(name: &str, task: &Task) -> ConfigResult<()> {
    if name.trim().is_empty() {
        return Err(ConfigError::Invalid("task names cannot be empty".to_string()));
    }
    if name.starts_with(TOOL_COMMAND_PREFIX) {
        return Err(ConfigError::Invalid(format!(
            "task '{}' cannot start with '{}' (reserved for tool commands)",
            name, TOOL_COMMAND_PREFIX
        )));
    }

    if task.deps.iter().any(|dep| dep.trim().is_empty()) {
        return Err(ConfigError::Invalid(format!(
            "task '{}' has an empty dependency name",
            name
        )));
    }

    for (index, (field, _)) in task.interactive.iter().enumerate() {
        validate_field_name(name, field)?;
        if task.interactive[..index].iter().any(|(seen, _)| seen == field) {
            return Err(ConfigError::Invalid(format!(
                "task '{}' declares interactive field '{}' twice",
                name, field
            )));
        }
    }

    Ok(())
}

/// Interactive fields are referenced as `$name`, so they must be identifiers
fn validate_field_name(task: &str, field: &str) -> ConfigResult<()> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "task '{}': interactive field '{}' must contain only letters, digits and '_'",
            task, field
        )))
    }
}

/// Dependencies that name no task, as `(task, dependency)` pairs
pub fn dangling_dependencies(config: &Config) -> Vec<(String, String)> {
    config
        .tasks
        .iter()
        .flat_map(|(name, task)| {
            task.deps
                .iter()
                .filter(|dep| !config.tasks.contains_key(*dep))
                .map(move |dep| (name.clone(), dep.clone()))
        })
        .collect()
}
