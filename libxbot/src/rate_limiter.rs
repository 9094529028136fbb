//! Admission control for automated actions
//!
//! Two independent checks guard every automated action:
//! - [`CooldownGate`]: minimum spacing between two gated cycles
//! - [`DailyLimiter`]: cap on successful actions per rolling day
//!
//! Both run on the monotonic tokio clock and hold no state across restarts.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Daily limiter shared between the poller and the dispatcher
pub type SharedLimiter = Arc<Mutex<DailyLimiter>>;

/// Last-action timestamp plus a fixed cooldown
#[derive(Debug, Clone)]
pub struct CooldownGate {
    cooldown: Duration,
    last_action: Option<Instant>,
}

impl CooldownGate {
    /// Create an unarmed gate; the first check is always permitted
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_action: None,
        }
    }

    /// Whether `now - last_action >= cooldown`
    pub fn is_open(&self, now: Instant) -> bool {
        match self.last_action {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.cooldown,
        }
    }

    /// Time left before the gate opens
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_action {
            None => Duration::ZERO,
            Some(last) => self
                .cooldown
                .saturating_sub(now.saturating_duration_since(last)),
        }
    }

    /// Restart the cooldown window at `now`
    pub fn mark(&mut self, now: Instant) {
        self.last_action = Some(now);
    }
}

/// Count of successful actions since the last reset
#[derive(Debug, Clone)]
pub struct DailyLimiter {
    limit: u32,
    reset_interval: Duration,
    count: u32,
    window_start: Instant,
}

impl DailyLimiter {
    pub fn new(limit: u32, reset_interval: Duration, now: Instant) -> Self {
        Self {
            limit,
            reset_interval,
            count: 0,
            window_start: now,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Actions recorded in the current window
    pub fn count(&self) -> u32 {
        self.count
    }

    fn roll_window(&mut self, now: Instant) {
        if now.saturating_duration_since(self.window_start) >= self.reset_interval {
            tracing::info!(
                "Daily action window reset ({} action(s) in previous window)",
                self.count
            );
            self.count = 0;
            self.window_start = now;
        }
    }

    /// Check the precondition for one more action
    pub fn has_capacity(&mut self, now: Instant) -> bool {
        self.roll_window(now);
        self.count < self.limit
    }

    /// Record a successful action
    pub fn record(&mut self, now: Instant) {
        self.roll_window(now);
        self.count = self.count.saturating_add(1);
    }

    pub fn into_shared(self) -> SharedLimiter {
        Arc::new(Mutex::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unarmed_gate_is_open() {
        let gate = CooldownGate::new(Duration::from_secs(900));
        let now = Instant::now();

        assert!(gate.is_open(now));
        assert_eq!(gate.remaining(now), Duration::ZERO);
    }

    #[test]
    fn test_gate_closed_until_cooldown_elapses() {
        let mut gate = CooldownGate::new(Duration::from_secs(900));
        let start = Instant::now();
        gate.mark(start);

        assert!(!gate.is_open(start));
        assert!(!gate.is_open(start + Duration::from_secs(899)));
        assert_eq!(
            gate.remaining(start + Duration::from_secs(600)),
            Duration::from_secs(300)
        );

        // Boundary is inclusive
        assert!(gate.is_open(start + Duration::from_secs(900)));
        assert!(gate.is_open(start + Duration::from_secs(5000)));
    }

    #[test]
    fn test_mark_restarts_window() {
        let mut gate = CooldownGate::new(Duration::from_secs(60));
        let start = Instant::now();
        gate.mark(start);
        gate.mark(start + Duration::from_secs(60));

        assert!(!gate.is_open(start + Duration::from_secs(90)));
        assert!(gate.is_open(start + Duration::from_secs(120)));
    }

    #[test]
    fn test_daily_limit_blocks_after_cap() {
        let start = Instant::now();
        let mut limiter = DailyLimiter::new(3, Duration::from_secs(86_400), start);

        for _ in 0..3 {
            assert!(limiter.has_capacity(start));
            limiter.record(start);
        }

        assert!(!limiter.has_capacity(start + Duration::from_secs(3600)));
        assert_eq!(limiter.count(), 3);
    }

    #[test]
    fn test_daily_limit_resets_after_interval() {
        let start = Instant::now();
        let mut limiter = DailyLimiter::new(1, Duration::from_secs(86_400), start);

        limiter.record(start);
        assert!(!limiter.has_capacity(start + Duration::from_secs(86_399)));
        assert!(limiter.has_capacity(start + Duration::from_secs(86_400)));
        assert_eq!(limiter.count(), 0);
    }

    #[test]
    fn test_zero_limit_never_admits() {
        let start = Instant::now();
        let mut limiter = DailyLimiter::new(0, Duration::from_secs(86_400), start);
        assert!(!limiter.has_capacity(start));
    }
}
