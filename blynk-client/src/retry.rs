//! Backoff policy for the reconnect ladder.

use std::num::NonZeroU32;
use std::ops::ControlFlow;
use std::time::Duration;

use crate::errors::Error;

/// Controls how the reconnect loop reacts to a failed connect/re-auth
/// attempt. The built-in exponential ladder (§4.7) is always applied
/// first; a `RetryPolicy` is an additional hook for callers who want to
/// veto it or substitute their own delay.
pub trait RetryPolicy: Send + Sync + 'static {
    fn should_retry(&self, ctx: &RetryContext) -> ControlFlow<(), Duration>;
}

/// Context passed to [`RetryPolicy::should_retry`] after each failed attempt.
pub struct RetryContext {
    pub attempt: NonZeroU32,
    pub elapsed: Duration,
    pub error: Error,
}

/// The default policy: always continue, deferring entirely to the
/// exponential ladder computed by the connector.
pub struct ExponentialLadder;

impl RetryPolicy for ExponentialLadder {
    fn should_retry(&self, _ctx: &RetryContext) -> ControlFlow<(), Duration> {
        ControlFlow::Continue(Duration::ZERO)
    }
}

/// Never retry; fail to `Disconnected` after the first failed attempt.
pub struct NoRetries;

impl RetryPolicy for NoRetries {
    fn should_retry(&self, _ctx: &RetryContext) -> ControlFlow<(), Duration> {
        ControlFlow::Break(())
    }
}

/// Compute the delay for reconnect attempt `n` (1-indexed): `base *
/// 1.5^(n-1)`, capped at `max_delay`.
pub fn ladder_delay(attempt: u32, base: Duration, max_delay: Duration) -> Duration {
    let factor = 1.5f64.powi(attempt.saturating_sub(1) as i32);
    let scaled = base.as_secs_f64() * factor;
    Duration::from_secs_f64(scaled.min(max_delay.as_secs_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_then_caps() {
        let base = Duration::from_secs(2);
        let max = Duration::from_secs(30);
        assert_eq!(ladder_delay(1, base, max), Duration::from_secs(2));
        assert!(ladder_delay(3, base, max) > ladder_delay(2, base, max));
        assert_eq!(ladder_delay(100, base, max), max);
    }
}
