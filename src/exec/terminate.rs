// src/exec/terminate.rs

//! Whole process-tree termination.
//!
//! Interpreters may spawn their own children, so killing only the direct
//! child can leave orphans holding the output pipes open. The runner goes
//! through [`ProcessTreeTerminator`] for both halves of the job: configuring
//! the command before spawn, and terminating everything it started.

use std::fmt;
use std::io;
use std::sync::Arc;

use tokio::process::Command;

/// Platform capability for killing a spawned process and its descendants.
pub trait ProcessTreeTerminator: Send + Sync + fmt::Debug {
    /// Adjust the command before spawn so the tree can be found later.
    fn prepare(&self, cmd: &mut Command);

    /// Terminate `pid` and every process it started.
    ///
    /// Must succeed when the tree is already gone.
    fn terminate(&self, pid: u32) -> io::Result<()>;
}

/// The terminator for the host platform.
pub fn platform_terminator() -> Arc<dyn ProcessTreeTerminator> {
    #[cfg(unix)]
    {
        Arc::new(ProcessGroupTerminator)
    }

    #[cfg(windows)]
    {
        Arc::new(TaskkillTerminator)
    }

    #[cfg(not(any(unix, windows)))]
    {
        Arc::new(DirectChildTerminator)
    }
}

/// Unix: the child leads a fresh process group; the group gets SIGKILL.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessGroupTerminator;

#[cfg(unix)]
impl ProcessTreeTerminator for ProcessGroupTerminator {
    fn prepare(&self, cmd: &mut Command) {
        cmd.process_group(0);
    }

    fn terminate(&self, pid: u32) -> io::Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let pgid = i32::try_from(pid)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;

        match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(errno) => Err(io::Error::from(errno)),
        }
    }
}

/// Windows: `taskkill /T` walks the child tree from the root pid.
#[cfg(windows)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskkillTerminator;

#[cfg(windows)]
impl ProcessTreeTerminator for TaskkillTerminator {
    fn prepare(&self, _cmd: &mut Command) {}

    fn terminate(&self, pid: u32) -> io::Result<()> {
        // taskkill exits with 128 when the pid no longer exists.
        const NOT_FOUND: i32 = 128;

        let output = std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .output()?;

        match output.status.code() {
            Some(0) | Some(NOT_FOUND) => Ok(()),
            _ => Err(io::Error::other(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            )),
        }
    }
}

/// Fallback for platforms without a tree primitive: the runner's own
/// `Child::kill` handles the direct child.
#[cfg(not(any(unix, windows)))]
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectChildTerminator;

#[cfg(not(any(unix, windows)))]
impl ProcessTreeTerminator for DirectChildTerminator {
    fn prepare(&self, _cmd: &mut Command) {}

    fn terminate(&self, _pid: u32) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn terminating_a_finished_group_is_a_no_op() {
        let terminator = ProcessGroupTerminator;
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("exit 0");
        terminator.prepare(&mut cmd);

        let mut child = cmd.spawn().expect("spawn sh");
        let pid = child.id().expect("pid before exit");
        child.wait().await.expect("wait");

        terminator.terminate(pid).expect("first terminate");
        terminator.terminate(pid).expect("second terminate");
    }
}
