// src/engine/handle.rs

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tracing::debug;

/// The in-flight run owned by an orchestrator.
///
/// Local runs learn their pid through the shared slot once the runner has
/// spawned the child. Remote runs never get one.
#[derive(Debug)]
pub struct RunningProcessHandle {
    pid: Arc<OnceLock<u32>>,
    cancel: Option<oneshot::Sender<()>>,
    started_at: Instant,
}

impl RunningProcessHandle {
    /// Returns the handle, the receiver the run listens on, and the pid slot.
    pub fn start() -> (Self, oneshot::Receiver<()>, Arc<OnceLock<u32>>) {
        let (tx, rx) = oneshot::channel();
        let pid = Arc::new(OnceLock::new());
        let handle = Self {
            pid: Arc::clone(&pid),
            cancel: Some(tx),
            started_at: Instant::now(),
        };
        (handle, rx, pid)
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid.get().copied()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// True until a kill was sent or the run stopped listening.
    pub fn is_alive(&self) -> bool {
        self.cancel.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Ask the run to stop. Returns false if it already finished or was
    /// already killed.
    pub fn kill(&mut self) -> bool {
        let Some(tx) = self.cancel.take() else {
            debug!(pid = ?self.pid(), "kill ignored: already requested");
            return false;
        };
        match tx.send(()) {
            Ok(()) => {
                debug!(pid = ?self.pid(), "kill requested");
                true
            }
            Err(()) => {
                debug!(pid = ?self.pid(), "kill ignored: run already finished");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_kill_is_a_no_op() {
        let (mut handle, mut rx, _pid) = RunningProcessHandle::start();
        assert!(handle.is_alive());
        assert!(handle.kill());
        assert!(!handle.is_alive());
        assert!(!handle.kill());
        assert_eq!(rx.try_recv(), Ok(()));
    }

    #[test]
    fn kill_after_receiver_dropped_reports_false() {
        let (mut handle, rx, _pid) = RunningProcessHandle::start();
        drop(rx);
        assert!(!handle.is_alive());
        assert!(!handle.kill());
    }

    #[test]
    fn pid_is_visible_once_set() {
        let (handle, _rx, slot) = RunningProcessHandle::start();
        assert_eq!(handle.pid(), None);
        let _ = slot.set(4242);
        assert_eq!(handle.pid(), Some(4242));
    }
}
