//! Common test utilities

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use trun::config::parse_config;
use trun::runner::{Context, PromptCollector, Runner, Verbosity};

/// Create a temporary directory with a tasks.yaml file
pub fn create_test_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("tasks.yaml");
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}

/// Create a test config with an empty subdirectory next to it
pub fn create_test_config_in_subdir(content: &str) -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("tasks.yaml");
    let sub_dir = temp_dir.path().join("subdir");

    fs::write(&config_path, content).unwrap();
    fs::create_dir(&sub_dir).unwrap();

    (temp_dir, config_path, sub_dir)
}

/// A silent runner rooted at `dir`, answering prompts from `answers`
pub fn runner_in(dir: &Path, yaml: &str, answers: &str) -> Runner {
    let config = parse_config(yaml).unwrap();
    let ctx = Context::rooted_at(dir.to_path_buf()).with_verbosity(Verbosity::Silent);
    Runner::new(config, ctx).with_prompts(PromptCollector::new(
        std::io::Cursor::new(answers.to_string()),
        std::io::sink(),
    ))
}

/// Lines of a file in `dir`, empty if it does not exist
pub fn read_lines(dir: &Path, file: &str) -> Vec<String> {
    fs::read_to_string(dir.join(file))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Poll `check` for up to five seconds
pub fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    check()
}
