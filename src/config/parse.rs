//! Configuration file parsing and discovery

use crate::config::types::Config;
use crate::error::{ConfigError, ConfigResult, TrunError};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &["tasks.yaml", "tasks.yml"];

/// Starter configuration written by `t :init`
pub const DEFAULT_CONFIG: &str = r#"version: "1"

vars:
  APP_NAME: "myapp"
  BUILD_DIR: "bin"

tasks:
  build:
    desc: "Build the application"
    deps: [clean]
    cmds:
      - "mkdir -p {{.BUILD_DIR}}"
      - "echo building {{.APP_NAME}} into {{.BUILD_DIR}}"

  test:
    desc: "Run tests"
    cmds:
      - "echo running tests"

  clean:
    desc: "Clean build artifacts"
    cmds:
      - "rm -rf {{.BUILD_DIR}}"

  release:
    desc: "Tag a release"
    deps: [build, test]
    interactive:
      version:
        message: "Release version"
        required: true
    cmds:
      - "echo tagging {{.APP_NAME}} $version"
"#;

/// Find the configuration file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    find_config_file_from(env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?)
}

/// Find the configuration file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.is_file() {
                return Ok(config_path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// Parse a configuration file from a path
pub fn parse_config_file(path: &Path) -> Result<Config, TrunError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        ConfigError::Invalid(format!("Failed to read {}: {}", path.display(), e))
    })?;

    parse_config(&contents)
}

/// Parse configuration from a string
pub fn parse_config(yaml: &str) -> Result<Config, TrunError> {
    // An empty file is an empty configuration, not a YAML error
    if yaml.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

/// Parse configuration with automatic file discovery
pub fn parse_config_auto() -> Result<(Config, PathBuf), TrunError> {
    let config_path = find_config_file()?;
    let config = parse_config_file(&config_path)?;
    Ok((config, config_path))
}

/// Write the starter configuration into `dir`, refusing to overwrite
pub fn init_config(dir: &Path) -> ConfigResult<PathBuf> {
    for file_name in CONFIG_FILE_NAMES {
        let existing = dir.join(file_name);
        if existing.exists() {
            return Err(ConfigError::AlreadyExists(existing));
        }
    }

    let path = dir.join(CONFIG_FILE_NAMES[0]);
    fs::write(&path, DEFAULT_CONFIG)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write {}: {}", path.display(), e)))?;
    Ok(path)
}
