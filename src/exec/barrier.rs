// src/exec/barrier.rs

//! Countdown barrier used to wait for both output streams to close.

use std::sync::Arc;

use tokio::sync::watch;

/// A countdown that opens once `permits` arrivals have been recorded.
///
/// Streaming runs create one with two permits: the stdout drain and the
/// stderr drain each call [`StreamBarrier::arrive`] when their stream hits
/// end-of-file, in whichever order that happens.
#[derive(Debug, Clone)]
pub struct StreamBarrier {
    remaining: Arc<watch::Sender<usize>>,
}

impl StreamBarrier {
    pub fn new(permits: usize) -> Self {
        let (remaining, _rx) = watch::channel(permits);
        Self {
            remaining: Arc::new(remaining),
        }
    }

    /// Two permits, one per output stream.
    pub fn for_stdio() -> Self {
        Self::new(2)
    }

    /// Record one arrival. Extra arrivals after the barrier opened are ignored.
    pub fn arrive(&self) {
        self.remaining.send_modify(|n| *n = n.saturating_sub(1));
    }

    pub fn remaining(&self) -> usize {
        *self.remaining.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.remaining() == 0
    }

    /// Resolve once every permit has arrived.
    pub async fn wait(&self) {
        let mut rx = self.remaining.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn opens_after_both_arrivals() {
        let barrier = StreamBarrier::for_stdio();
        barrier.arrive();
        assert!(!barrier.is_open());

        let pending = tokio::time::timeout(Duration::from_millis(50), barrier.wait()).await;
        assert!(pending.is_err(), "one arrival must not open the barrier");

        barrier.arrive();
        tokio::time::timeout(Duration::from_secs(1), barrier.wait())
            .await
            .expect("barrier should open after the second arrival");
    }

    #[tokio::test]
    async fn arrivals_from_other_tasks_wake_waiter() {
        let barrier = StreamBarrier::for_stdio();
        let a = barrier.clone();
        let b = barrier.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            a.arrive();
        });
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(40)).await;
            b.arrive();
        });

        tokio::time::timeout(Duration::from_secs(1), barrier.wait())
            .await
            .expect("barrier should open");
        assert_eq!(barrier.remaining(), 0);
    }

    #[test]
    fn extra_arrivals_saturate() {
        let barrier = StreamBarrier::new(1);
        barrier.arrive();
        barrier.arrive();
        assert_eq!(barrier.remaining(), 0);
    }
}
