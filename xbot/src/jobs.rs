//! Foreground job control
//!
//! Only one long-running job (auto-like, auto-retweet, scheduled posting) runs
//! at a time. An interrupt while a job runs cancels that job and returns to
//! the caller; an interrupt while idle exits the process.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use libxbot::service::events::EventReceiver;
use libxbot::{Shutdown, ShutdownSignal};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{info, warn};

/// Exit status used when the user interrupts an idle session
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Default)]
pub struct JobControl {
    shutdown: Shutdown,
    running: AtomicBool,
}

impl JobControl {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mark a job as running and hand out a fresh cancellation signal
    pub fn start(&self) -> JobGuard<'_> {
        self.shutdown.reset();
        self.running.store(true, Ordering::SeqCst);
        JobGuard {
            control: self,
            signal: self.shutdown.signal(),
        }
    }

    /// Cancel the running job; returns `false` when no job is running
    pub fn interrupt(&self) -> bool {
        if self.running.load(Ordering::SeqCst) {
            self.shutdown.trigger();
            true
        } else {
            false
        }
    }
}

/// Clears the running flag when the job ends
pub struct JobGuard<'a> {
    control: &'a JobControl,
    signal: ShutdownSignal,
}

impl JobGuard<'_> {
    pub fn signal(&self) -> &ShutdownSignal {
        &self.signal
    }
}

impl Drop for JobGuard<'_> {
    fn drop(&mut self) {
        self.control.running.store(false, Ordering::SeqCst);
    }
}

fn on_interrupt(control: &JobControl) {
    if control.interrupt() {
        info!("Interrupt received, stopping the current job");
        println!("\nStopping...");
    } else {
        info!("Bot stopped by user");
        println!("\nBot stopped by user");
        std::process::exit(INTERRUPTED_EXIT_CODE);
    }
}

/// Route SIGINT/SIGTERM to [`JobControl`]
#[cfg(unix)]
pub fn install_signal_handlers(control: Arc<JobControl>) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    std::thread::spawn(move || {
        for sig in signals.forever() {
            if matches!(sig, SIGINT | SIGTERM) {
                on_interrupt(&control);
            }
        }
    });

    Ok(())
}

/// Route Ctrl+C to [`JobControl`]
#[cfg(not(unix))]
pub fn install_signal_handlers(control: Arc<JobControl>) -> anyhow::Result<()> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt(&control);
        }
    });
    Ok(())
}

/// Drive `job` to completion while printing its events in order
pub async fn with_events<F: Future>(mut events: EventReceiver, job: F) -> F::Output {
    tokio::pin!(job);
    loop {
        tokio::select! {
            output = &mut job => {
                loop {
                    match events.try_recv() {
                        Ok(event) => println!("{}", event),
                        Err(TryRecvError::Lagged(missed)) => println!("{}", missed_line(missed)),
                        Err(_) => break,
                    }
                }
                return output;
            }
            received = events.recv() => match received {
                Ok(event) => println!("{}", event),
                Err(RecvError::Lagged(missed)) => {
                    warn!("Console fell behind, {} event(s) dropped", missed);
                    println!("{}", missed_line(missed));
                }
                Err(RecvError::Closed) => return (&mut job).await,
            },
        }
    }
}

fn missed_line(missed: u64) -> String {
    format!("({} status update(s) missed)", missed)
}
