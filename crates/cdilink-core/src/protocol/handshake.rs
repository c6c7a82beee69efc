//! Module initialization handshake
//!
//! The CDI wants the 4-byte init sequence twice before it starts serving
//! telemetry. It may send a few bytes back after a round, or nothing at
//! all; modules have been observed doing either while working fine. The
//! response content carries no known meaning, so any bytes count as an
//! acknowledgment and silence is recorded rather than treated as failure.

use std::thread;

use tracing::debug;

use super::transport::{drain_available, write_bytes, Transport};
use super::{ProtocolError, TimingPolicy, INIT_ROUNDS, INIT_SEQUENCE};

/// What a single init round observed
#[derive(Debug, Clone, Default)]
pub struct HandshakeAttempt {
    /// Bytes drained after the settle wait, empty when the module stayed silent
    pub response: Vec<u8>,
}

impl HandshakeAttempt {
    /// Whether the module sent anything back in this round
    pub fn acknowledged(&self) -> bool {
        !self.response.is_empty()
    }
}

/// Result of the full double-init handshake
#[derive(Debug, Clone, Default)]
pub struct HandshakeOutcome {
    /// One entry per init round, in send order
    pub attempts: Vec<HandshakeAttempt>,
}

impl HandshakeOutcome {
    /// Whether any round drew a response
    pub fn acknowledged(&self) -> bool {
        self.attempts.iter().any(HandshakeAttempt::acknowledged)
    }
}

/// Send the init sequence [`INIT_ROUNDS`] times and record what came back.
///
/// Silence is not a failure; only transport faults propagate as errors.
pub fn perform_handshake(
    transport: &mut dyn Transport,
    timing: &TimingPolicy,
) -> Result<HandshakeOutcome, ProtocolError> {
    let mut outcome = HandshakeOutcome::default();

    for round in 1..=INIT_ROUNDS {
        write_bytes(transport, &INIT_SEQUENCE)?;
        thread::sleep(timing.settle_after_init);

        let response = drain_available(transport)?;
        if response.is_empty() {
            debug!("init round {round}/{INIT_ROUNDS}: no response");
        } else {
            debug!(
                "init round {round}/{INIT_ROUNDS}: acknowledged with {} bytes",
                response.len()
            );
        }
        outcome.attempts.push(HandshakeAttempt { response });
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acknowledged_any_round() {
        let outcome = HandshakeOutcome {
            attempts: vec![
                HandshakeAttempt { response: vec![] },
                HandshakeAttempt {
                    response: vec![0x01],
                },
            ],
        };
        assert!(outcome.acknowledged());
    }

    #[test]
    fn test_silent_outcome() {
        let outcome = HandshakeOutcome {
            attempts: vec![HandshakeAttempt::default(), HandshakeAttempt::default()],
        };
        assert!(!outcome.acknowledged());
    }
}
