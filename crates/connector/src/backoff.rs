//! Exponential backoff with jitter.
//!
//! Shared by session reconnects (unbounded, jittered) and publish retries
//! (bounded by the caller, usually without jitter).

use std::time::Duration;

use rand::Rng;
use tickwire_metadata::{PublishConfig, ReconnectSettings};

#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Growth factor per attempt, at least 1.0
    pub multiplier: f64,
    /// Fraction of the delay randomized either way, 0.0 disables jitter
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::from_reconnect_settings(&ReconnectSettings::default())
    }
}

impl BackoffConfig {
    pub fn from_reconnect_settings(settings: &ReconnectSettings) -> Self {
        Self {
            initial_delay: settings.initial_delay(),
            max_delay: settings.max_delay(),
            multiplier: settings.multiplier,
            jitter: settings.jitter,
        }
    }

    /// Doubling retry delays without jitter, as used between publish attempts
    pub fn from_publish_config(config: &PublishConfig) -> Self {
        Self {
            initial_delay: config.retry_delay(),
            max_delay: config.max_retry_delay(),
            multiplier: 2.0,
            jitter: 0.0,
        }
    }

    /// No waiting at all; for tests and replay tooling
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter: 0.0,
        }
    }
}

#[derive(Debug)]
pub struct Backoff {
    config: BackoffConfig,
    current_delay: Duration,
    attempt_count: u32,
}

impl Backoff {
    pub fn new(config: BackoffConfig) -> Self {
        let current_delay = config.initial_delay.min(config.max_delay);
        Self {
            config,
            current_delay,
            attempt_count: 0,
        }
    }

    /// Delay to wait before the next attempt. Grows by the multiplier on
    /// every call until it reaches the cap.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt_count = self.attempt_count.saturating_add(1);
        let delay = self.apply_jitter(self.current_delay);

        let scaled = self.current_delay.as_secs_f64() * self.config.multiplier.max(1.0);
        let max = self.config.max_delay.as_secs_f64();
        self.current_delay = if scaled.is_finite() && scaled < max {
            Duration::from_secs_f64(scaled)
        } else {
            self.config.max_delay
        };

        delay
    }

    /// Back to the initial delay after a successful attempt
    pub fn reset(&mut self) {
        self.current_delay = self.config.initial_delay.min(self.config.max_delay);
        self.attempt_count = 0;
    }

    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.config.jitter <= 0.0 || delay.is_zero() {
            return delay;
        }
        let base = delay.as_secs_f64();
        let spread = base * self.config.jitter.min(1.0);
        let jitter = rand::rng().random_range(-spread..=spread);
        Duration::from_secs_f64((base + jitter).max(0.0))
    }
}
