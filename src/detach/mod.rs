//! Detached (background) tasks
//!
//! A detached task keeps running after `t` exits. Each one is tracked by a
//! JSON record under `.t-processes/` and writes its output to a log under
//! `.t-logs/`, so later invocations can list, tail and stop it.

pub mod logs;
pub mod manager;
pub mod process;
pub mod record;

pub use logs::{follow, tail, DEFAULT_TAIL_LINES};
pub use manager::DetachedManager;
pub use process::*;
pub use record::{DetachedProcess, RecordStore};
