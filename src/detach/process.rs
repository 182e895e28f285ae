//! Platform process control for detached tasks
//!
//! The manager only talks to [`ProcessControl`]; `PlatformControl` is the
//! implementation for the host this crate is built for.

use crate::error::DetachResult;
use std::fs::File;
use std::io;
use std::path::Path;
use std::process::Child;

/// Spawning, probing and killing detached process trees
pub trait ProcessControl: Send + Sync {
    /// Start `command` through `shell` in its own process group, with stdout
    /// and stderr going to `log`
    fn spawn_detached(
        &self,
        shell: &[String],
        command: &str,
        dir: &Path,
        log: &File,
    ) -> io::Result<Child>;

    /// Whether `pid` is a running process
    fn is_alive(&self, pid: u32) -> bool;

    /// Terminate `pid` and every process descended from it
    fn terminate_tree(&self, pid: u32) -> DetachResult<()>;
}

#[cfg(unix)]
pub use self::unix::UnixControl as PlatformControl;

#[cfg(windows)]
pub use self::windows::WindowsControl as PlatformControl;

#[cfg(unix)]
pub use self::unix::UnixControl;

#[cfg(windows)]
pub use self::windows::WindowsControl;

#[cfg(unix)]
mod unix {
    use super::ProcessControl;
    use crate::error::{DetachError, DetachResult};
    use crate::runner::shell_command;
    use nix::errno::Errno;
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;
    use std::fs::File;
    use std::io;
    use std::os::unix::process::CommandExt;
    use std::path::Path;
    use std::process::{Child, Stdio};
    use std::thread;
    use std::time::{Duration, Instant};
    use tracing::{debug, warn};

    const POLL_INTERVAL: Duration = Duration::from_millis(50);

    /// Process groups and signals
    #[derive(Debug, Clone)]
    pub struct UnixControl {
        /// How long SIGTERM gets before the group is sent SIGKILL
        pub grace: Duration,
    }

    impl Default for UnixControl {
        fn default() -> Self {
            UnixControl {
                grace: Duration::from_secs(3),
            }
        }
    }

    fn to_pid(pid: u32) -> Option<Pid> {
        i32::try_from(pid).ok().filter(|p| *p > 0).map(Pid::from_raw)
    }

    /// Zombies still answer signal 0 until reaped
    #[cfg(target_os = "linux")]
    fn is_zombie(pid: u32) -> bool {
        std::fs::read_to_string(format!("/proc/{}/stat", pid))
            .ok()
            .and_then(|stat| {
                let after_name = stat.rfind(')')?;
                stat[after_name + 1..].split_whitespace().next().map(|s| s == "Z")
            })
            .unwrap_or(false)
    }

    #[cfg(not(target_os = "linux"))]
    fn is_zombie(_pid: u32) -> bool {
        false
    }

    impl UnixControl {
        fn group_alive(&self, pgid: Pid) -> bool {
            killpg(pgid, None).is_ok()
        }
    }

    impl ProcessControl for UnixControl {
        fn spawn_detached(
            &self,
            shell: &[String],
            command: &str,
            dir: &Path,
            log: &File,
        ) -> io::Result<Child> {
            let mut cmd = shell_command(shell, command);
            cmd.current_dir(dir)
                .stdin(Stdio::null())
                .stdout(log.try_clone()?)
                .stderr(log.try_clone()?)
                .process_group(0);
            cmd.spawn()
        }

        fn is_alive(&self, pid: u32) -> bool {
            let Some(target) = to_pid(pid) else {
                return false;
            };
            match kill(target, None) {
                Ok(()) => !is_zombie(pid),
                // Exists but belongs to someone else
                Err(Errno::EPERM) => true,
                Err(_) => false,
            }
        }

        fn terminate_tree(&self, pid: u32) -> DetachResult<()> {
            let target = to_pid(pid).ok_or_else(|| DetachError::Terminate {
                pid,
                error: "invalid pid".to_string(),
            })?;

            // The detached process leads its own group, so its pid is the pgid
            let group = killpg(target, Signal::SIGTERM);
            let direct = kill(target, Signal::SIGTERM);
            debug!(pid, ?group, ?direct, "sent SIGTERM");

            if group.is_err() && direct.is_err() {
                return match kill(target, Signal::SIGKILL) {
                    Ok(()) | Err(Errno::ESRCH) => Ok(()),
                    Err(e) => Err(DetachError::Terminate {
                        pid,
                        error: e.to_string(),
                    }),
                };
            }

            let deadline = Instant::now() + self.grace;
            while Instant::now() < deadline {
                if !self.group_alive(target) && !self.is_alive(pid) {
                    return Ok(());
                }
                thread::sleep(POLL_INTERVAL);
            }

            warn!(pid, "process group still alive after SIGTERM, sending SIGKILL");
            let _ = killpg(target, Signal::SIGKILL);
            let _ = kill(target, Signal::SIGKILL);
            Ok(())
        }
    }
}

#[cfg(windows)]
mod windows {
    use super::ProcessControl;
    use crate::error::{DetachError, DetachResult};
    use crate::runner::shell_command;
    use std::fs::File;
    use std::io;
    use std::os::windows::process::CommandExt;
    use std::path::Path;
    use std::process::{Child, Command, Stdio};

    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;

    /// `tasklist` and `taskkill`
    #[derive(Debug, Clone, Default)]
    pub struct WindowsControl;

    impl ProcessControl for WindowsControl {
        fn spawn_detached(
            &self,
            shell: &[String],
            command: &str,
            dir: &Path,
            log: &File,
        ) -> io::Result<Child> {
            let mut cmd = shell_command(shell, command);
            cmd.current_dir(dir)
                .stdin(Stdio::null())
                .stdout(log.try_clone()?)
                .stderr(log.try_clone()?)
                .creation_flags(CREATE_NEW_PROCESS_GROUP);
            cmd.spawn()
        }

        fn is_alive(&self, pid: u32) -> bool {
            Command::new("tasklist")
                .args(["/FI", &format!("PID eq {}", pid), "/NH"])
                .output()
                .map(|out| {
                    String::from_utf8_lossy(&out.stdout)
                        .split_whitespace()
                        .any(|word| word == pid.to_string())
                })
                .unwrap_or(false)
        }

        fn terminate_tree(&self, pid: u32) -> DetachResult<()> {
            let status = Command::new("taskkill")
                .args(["/F", "/T", "/PID", &pid.to_string()])
                .status()
                .map_err(|e| DetachError::Terminate {
                    pid,
                    error: e.to_string(),
                })?;
            if status.success() {
                Ok(())
            } else {
                Err(DetachError::Terminate {
                    pid,
                    error: format!("taskkill exited with {:?}", status.code()),
                })
            }
        }
    }
}
