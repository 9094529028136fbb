//! Cooperative cancellation for the long-running loops
//!
//! Loops only observe cancellation while waiting: every tick and backoff goes
//! through [`ShutdownSignal::sleep`], which returns early once the controller
//! is triggered. A call that is already in flight always completes.

use std::time::Duration;
use tokio::sync::watch;

/// Owner side: triggers and re-arms cancellation
#[derive(Debug)]
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

/// Observer side handed to loops
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// Get a signal that observes this controller
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }

    /// Request that all observing loops stop at their next wait
    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    /// Clear a previous trigger so the next job can run
    pub fn reset(&self) {
        self.sender.send_replace(false);
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (sender, receiver) = watch::channel(false);
        // Dropping the sender makes `wait_for` fail, which `sleep` treats as
        // "keep sleeping".
        drop(sender);
        Self { receiver }
    }

    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Sleep for `duration` unless cancellation is requested first
    ///
    /// Returns `true` when the sleep was interrupted.
    pub async fn sleep(&self, duration: Duration) -> bool {
        let mut receiver = self.receiver.clone();
        if *receiver.borrow_and_update() {
            return true;
        }

        let timer = tokio::time::sleep(duration);
        tokio::pin!(timer);

        let interrupted = tokio::select! {
            _ = &mut timer => return false,
            changed = receiver.wait_for(|triggered| *triggered) => changed.is_ok(),
        };

        if !interrupted {
            timer.await;
        }
        interrupted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_sleep_runs_to_completion() {
        let shutdown = Shutdown::new();
        let signal = shutdown.signal();

        let start = Instant::now();
        let interrupted = signal.sleep(Duration::from_secs(60)).await;

        assert!(!interrupted);
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_interrupts_sleep() {
        let shutdown = Shutdown::new();
        let signal = shutdown.signal();

        let handle = tokio::spawn(async move {
            let start = Instant::now();
            let interrupted = signal.sleep(Duration::from_secs(3600)).await;
            (interrupted, start.elapsed())
        });

        tokio::time::sleep(Duration::from_secs(5)).await;
        shutdown.trigger();

        let (interrupted, elapsed) = handle.await.unwrap();
        assert!(interrupted);
        assert!(elapsed < Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_already_triggered_returns_immediately() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let signal = shutdown.signal();
        assert!(signal.is_triggered());
        assert!(signal.sleep(Duration::from_secs(3600)).await);
    }

    #[tokio::test]
    async fn test_reset_rearms() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        assert!(shutdown.is_triggered());

        shutdown.reset();
        assert!(!shutdown.is_triggered());
        assert!(!shutdown.signal().is_triggered());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_signal_sleeps_full_duration() {
        let signal = ShutdownSignal::never();

        let start = Instant::now();
        assert!(!signal.sleep(Duration::from_secs(10)).await);
        assert!(start.elapsed() >= Duration::from_secs(10));
    }
}
