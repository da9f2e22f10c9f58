//! Request pacing
//!
//! Tracks the adaptive delay applied before every request to the search
//! endpoint: multiplicative backoff on blocks, stepwise decay back to the
//! base delay after a streak of successes, plus random jitter.

use crate::config::CrawlerConfig;
use std::time::Duration;

/// Adaptive pacing state
///
/// Mutated only by [`RateController`]; read before every fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateState {
    /// Delay applied before the next request, jitter excluded
    pub current_delay: Duration,

    /// Blocked or failed requests since the last success
    pub consecutive_failures: u32,

    /// Successful requests since the last failure or decay step
    pub consecutive_successes: u32,
}

/// Gates every outbound request through an adaptive delay
///
/// The delay starts at the configured base. Each failure multiplies it by the
/// backoff factor, capped at the configured maximum. After `decay_after`
/// consecutive successes it is divided by the same factor, never dropping
/// below the base.
#[derive(Debug, Clone)]
pub struct RateController {
    state: RateState,
    base_delay: Duration,
    max_delay: Duration,
    backoff_factor: f64,
    decay_after: u32,
    jitter_ms: u64,
}

impl RateController {
    /// Creates a controller from the crawler configuration
    pub fn new(config: &CrawlerConfig) -> Self {
        let base_delay = config.base_delay();
        Self {
            state: RateState {
                current_delay: base_delay,
                consecutive_failures: 0,
                consecutive_successes: 0,
            },
            base_delay,
            max_delay: config.max_delay().max(base_delay),
            backoff_factor: config.backoff_factor.max(1.0),
            decay_after: config.decay_after.max(1),
            jitter_ms: config.jitter_ms,
        }
    }

    /// Returns how long to wait before the next request
    ///
    /// This is the current delay plus a random jitter in `0..=jitter_ms`.
    pub fn before_request(&self) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::random_range(0..=self.jitter_ms)
        };

        let wait = self.state.current_delay + Duration::from_millis(jitter);
        tracing::trace!(
            "Rate gate: delay {:?} + jitter {}ms (failures: {}, successes: {})",
            self.state.current_delay,
            jitter,
            self.state.consecutive_failures,
            self.state.consecutive_successes
        );
        wait
    }

    /// Records a successful request, decaying the delay after a streak
    pub fn on_success(&mut self) {
        self.state.consecutive_failures = 0;
        self.state.consecutive_successes += 1;

        if self.state.consecutive_successes >= self.decay_after
            && self.state.current_delay > self.base_delay
        {
            let decayed = self.state.current_delay.div_f64(self.backoff_factor);
            self.state.current_delay = decayed.max(self.base_delay);
            self.state.consecutive_successes = 0;
            tracing::debug!("Request delay decayed to {:?}", self.state.current_delay);
        }
    }

    /// Records a blocked or failed request, escalating the delay
    pub fn on_failure(&mut self) {
        self.state.consecutive_successes = 0;
        self.state.consecutive_failures += 1;

        let escalated = self.state.current_delay.as_secs_f64() * self.backoff_factor;
        let capped = escalated.min(self.max_delay.as_secs_f64());
        self.state.current_delay = Duration::from_secs_f64(capped).max(self.state.current_delay);

        tracing::debug!(
            "Request delay escalated to {:?} after {} consecutive failures",
            self.state.current_delay,
            self.state.consecutive_failures
        );
    }

    /// Current pacing state
    pub fn state(&self) -> &RateState {
        &self.state
    }

    /// The configured base delay
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }
}
