//! Pacing and timeout policy
//!
//! The CDI module has no flow control and no resynchronization mechanism;
//! the only thing keeping host and module in step is time. Every delay the
//! protocol depends on lives here so the exchange code stays free of bare
//! numbers and tests can collapse the waits to zero.

use std::time::Duration;

/// Fixed delays and timeouts for one CDI link.
///
/// The defaults reproduce the cadence the module was reverse-engineered
/// with; it is known to tolerate them, and nothing faster has been proven
/// safe. Slowing them down is harmless.
#[derive(Debug, Clone)]
pub struct TimingPolicy {
    /// Serial read timeout; the module answers well inside this when it
    /// answers at all
    pub read_timeout: Duration,
    /// Wait after each init round before checking for an acknowledgment
    pub settle_after_init: Duration,
    /// Wait after a telemetry request before checking for the response frame
    pub response_wait: Duration,
    /// Pause between poll cycles, on top of `response_wait`
    pub cycle_pause: Duration,
    /// Gap between consecutive bytes of a map write
    pub map_byte_gap: Duration,
    /// Wait after the last map byte before draining any response
    pub post_write_wait: Duration,
    /// Delay before reopening the port after a transport failure
    pub reconnect_backoff: Duration,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(1),
            settle_after_init: Duration::from_millis(100),
            response_wait: Duration::from_millis(100),
            cycle_pause: Duration::from_millis(100),
            map_byte_gap: Duration::from_millis(1),
            post_write_wait: Duration::from_millis(100),
            reconnect_backoff: Duration::from_secs(1),
        }
    }
}

impl TimingPolicy {
    /// Policy with every delay and timeout zeroed. Only useful against a
    /// scripted transport, a real module will not keep up.
    pub fn immediate() -> Self {
        Self {
            read_timeout: Duration::ZERO,
            settle_after_init: Duration::ZERO,
            response_wait: Duration::ZERO,
            cycle_pause: Duration::ZERO,
            map_byte_gap: Duration::ZERO,
            post_write_wait: Duration::ZERO,
            reconnect_backoff: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cadence() {
        let timing = TimingPolicy::default();
        assert_eq!(timing.settle_after_init, Duration::from_millis(100));
        assert_eq!(timing.response_wait, Duration::from_millis(100));
        assert_eq!(timing.cycle_pause, Duration::from_millis(100));
        assert_eq!(timing.map_byte_gap, Duration::from_millis(1));
        assert_eq!(timing.post_write_wait, Duration::from_millis(100));
        assert_eq!(timing.read_timeout, Duration::from_secs(1));
        assert_eq!(timing.reconnect_backoff, Duration::from_secs(1));
    }

    #[test]
    fn test_immediate_policy() {
        let timing = TimingPolicy::immediate();
        assert_eq!(timing.settle_after_init, Duration::ZERO);
        assert_eq!(timing.map_byte_gap, Duration::ZERO);
    }
}
