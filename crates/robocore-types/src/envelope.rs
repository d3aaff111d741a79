//! [`Envelope`] – the `(topic, payload)` pair carried on the bus.

use crate::topic::Topic;

/// A single message carried on the bus.
///
/// Payload is either UTF-8 JSON (control messages) or raw bytes (MJPEG
/// frames on `visn.frame`). Envelopes are immutable once published; the
/// bus never mutates a payload in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    topic: Topic,
    payload: Vec<u8>,
}

impl Envelope {
    /// Builds an envelope from raw bytes, e.g. a decoded JPEG frame.
    pub fn new(topic: Topic, payload: Vec<u8>) -> Self {
        Self { topic, payload }
    }

    /// Builds an envelope from a JSON-serializable payload.
    pub fn json(topic: Topic, payload: &impl serde::Serialize) -> Result<Self, serde_json::Error> {
        Ok(Self {
            topic,
            payload: serde_json::to_vec(payload)?,
        })
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Parses the payload as JSON into `T`. Returns an error for binary
    /// payloads (e.g. `visn.frame`), which callers must read via
    /// [`Envelope::payload`] instead.
    pub fn parse<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }

    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct StopIntent {
        direction: String,
    }

    #[test]
    fn json_round_trips_through_parse() {
        let payload = StopIntent {
            direction: "stop".to_string(),
        };
        let env = Envelope::json(Topic::NavCommand, &payload).unwrap();
        let parsed: StopIntent = env.parse().unwrap();
        assert_eq!(parsed, payload);
    }

    #[test]
    fn binary_payload_is_opaque() {
        let frame = vec![0xFF, 0xD8, 0xFF, 0xE0];
        let env = Envelope::new(Topic::VisnFrame, frame.clone());
        assert_eq!(env.payload(), frame.as_slice());
    }
}
