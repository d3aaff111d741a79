//! [`RobocoreError`] – the error taxonomy shared by every component.
//!
//! Mirrors the spec's error taxonomy (transport / schema / protocol /
//! timeout / safety-refusal / fatal) in one enum so that callers across
//! crate boundaries can match on a stable set of variants instead of each
//! component inventing its own ad-hoc string error.

use thiserror::Error;

/// Global error type spanning bus transport, UART I/O, HTTP handling, and
/// safety refusals.
#[derive(Error, Debug)]
pub enum RobocoreError {
    /// A publish/subscribe or TCP framing failure. Logged and discarded;
    /// never fatal after startup.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed JSON, a missing required field, or a UART line that failed
    /// to parse. The offending envelope/line is dropped.
    #[error("schema error: {0}")]
    Schema(String),

    /// An unknown topic, UART prefix, or intent symbol.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// A soft timeout expired (STT, LLM, TTS, ERROR, or serial read).
    #[error("timeout: {0}")]
    Timeout(String),

    /// The software safety layer refused a command.
    #[error("safety refusal: {reason}")]
    SafetyRefusal {
        /// Human-readable reason surfaced to `esp32.blocked` / TTS.
        reason: String,
    },

    /// A startup-time failure that cannot be recovered from (bus bind
    /// failure, missing required config). Callers should abort with a
    /// non-zero exit code.
    #[error("fatal startup error: {0}")]
    Fatal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safety_refusal_display_contains_reason() {
        let err = RobocoreError::SafetyRefusal {
            reason: "obstacle within stop distance".to_string(),
        };
        assert!(err.to_string().contains("obstacle within stop distance"));
    }

    #[test]
    fn transport_error_display() {
        let err = RobocoreError::Transport("connection reset".to_string());
        assert!(err.to_string().contains("transport error"));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn fatal_error_display() {
        let err = RobocoreError::Fatal("bus bind failed".to_string());
        assert!(err.to_string().contains("fatal startup error"));
    }
}
