//! Coarse rate governor for upstream requests.
//!
//! The upstream allows a fixed number of requests per second. Rather than a
//! token bucket, the governor applies a fixed-delay heuristic:
//!
//! - [`RateGovernor::throttle`] pauses once when the burst about to be issued
//!   for one network exceeds the ceiling, and
//! - [`RateGovernor::space`] pauses once between networks, unconditionally.
//!
//! Request latency is not counted, so this is approximate rather than a hard
//! guarantee. A request the upstream still rejects for rate limiting comes
//! back as an ordinary `UpstreamError`.

use std::time::Duration;

use crate::config::GovernorConfig;

/// Blocks the calling thread for a while. Swapped out in tests.
pub trait Pause: Send + Sync {
    fn pause(&self, duration: Duration);
}

/// [`Pause`] implementation backed by [`std::thread::sleep`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleep;

impl Pause for ThreadSleep {
    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Fixed-delay rate governor.
pub struct RateGovernor<P = ThreadSleep> {
    cfg: GovernorConfig,
    pauser: P,
}

impl RateGovernor<ThreadSleep> {
    /// Governor that sleeps the current thread.
    pub fn new(cfg: GovernorConfig) -> Self {
        Self::with_pauser(cfg, ThreadSleep)
    }
}

impl<P: Pause> RateGovernor<P> {
    pub fn with_pauser(cfg: GovernorConfig, pauser: P) -> Self {
        Self { cfg, pauser }
    }

    /// Pauses once if `request_count` exceeds the per-second ceiling.
    ///
    /// Returns `true` if a pause was taken.
    pub fn throttle(&self, request_count: usize) -> bool {
        if request_count > self.cfg.max_requests_per_second {
            tracing::debug!(
                request_count,
                ceiling = self.cfg.max_requests_per_second,
                "burst exceeds rate ceiling, pausing"
            );
            self.pauser.pause(self.cfg.pause);
            true
        } else {
            false
        }
    }

    /// Unconditional pause between two networks.
    pub fn space(&self) {
        self.pauser.pause(self.cfg.pause);
    }

    pub fn pauser(&self) -> &P {
        &self.pauser
    }
}
