//! Canonical JSON payload schemas for every bus topic in the external
//! contract (spec §6). Parsing happens once at the bus boundary (or in the
//! publishing component); everything downstream handles these typed
//! values, never raw `serde_json::Value`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::nav::Direction;
use crate::sensor::SensorFrame;

/// `ww.detected`: `{keyword, timestamp, source}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WakewordDetected {
    pub keyword: String,
    pub timestamp: i64,
    pub source: String,
}

/// `stt.transcription`: `{text, confidence, language, timestamp}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SttTranscription {
    pub text: String,
    pub confidence: f32,
    pub language: String,
    pub timestamp: i64,
}

/// `llm.request`: `{text, direction, world_context, context_note}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    pub text: String,
    pub direction: String,
    pub world_context: Value,
    pub context_note: String,
}

impl LlmRequest {
    /// The advisory note attached to every request: the world context is a
    /// best-effort last-known-state snapshot, not guaranteed current.
    pub const CONTEXT_NOTE: &'static str = "system_observation_only_last_known_state";
}

/// The `json` field of an `llm.response` envelope: the single-action
/// response schema (spec §9 open question: multi-action proposals are a
/// future extension, not part of the core).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmAction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speak: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
}

/// `llm.response`: `{json:{speak?, direction?, track?}, raw?}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub json: LlmAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// `tts.speak` downstream: `{text}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsSpeakRequest {
    pub text: String,
}

/// `tts.speak` upstream completion marker: `{done:true}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TtsSpeakDone {
    pub done: bool,
}

/// `esp32.raw`: `{data:{...SensorFrame}, ts}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Esp32Raw {
    pub data: SensorFrame,
    pub ts: i64,
}

/// `esp32.blocked`: a refused-command notice, from either the software
/// safety layer or the peripheral's own `ACK:CMD:BLOCKED`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Esp32Blocked {
    pub reason: String,
}

/// `remote.intent`: `{intent, extras?, source, timestamp}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteIntent {
    pub intent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extras: Option<Value>,
    pub source: String,
    pub timestamp: i64,
}

/// `system.health`: `{component, healthy, timestamp}`. Consumed by the
/// orchestrator's watchdog: `healthy:false` is an immediate `health_error`
/// event; `healthy:true` refreshes that component's heartbeat deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHealth {
    pub component: String,
    pub healthy: bool,
    pub timestamp: i64,
}

/// `remote.session`: `{active}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RemoteSession {
    pub active: bool,
}

/// `display.state`: `{state, phase, timestamp}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayState {
    pub state: String,
    pub phase: String,
    pub timestamp: i64,
}

/// `display.text`: a free-form notice string shown on the robot's display
/// (e.g. the safety-veto obstacle notice).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayText {
    pub text: String,
}

/// `cmd.pause.vision`: `{paused}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PauseVision {
    pub paused: bool,
}

/// `cmd.vision.mode`: `{mode}`, set by a `vision_mode` remote intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisionMode {
    pub mode: String,
}

/// `nav.command` restated here for payload-module symmetry; re-exported
/// from [`crate::nav`] as the canonical definition.
pub type NavCommandPayload = crate::nav::NavCommand;

/// The direction-as-string form used on `llm.response.json.direction`
/// before it is validated into a [`Direction`].
pub fn parse_direction(raw: &str) -> Option<Direction> {
    match raw {
        "forward" => Some(Direction::Forward),
        "backward" => Some(Direction::Backward),
        "left" => Some(Direction::Left),
        "right" => Some(Direction::Right),
        "stop" => Some(Direction::Stop),
        "scan" => Some(Direction::Scan),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wakeword_detected_round_trips() {
        let payload = WakewordDetected {
            keyword: "hey robo".to_string(),
            timestamp: 1_700_000_000,
            source: "porcupine".to_string(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        let back: WakewordDetected = serde_json::from_str(&json).unwrap();
        assert_eq!(payload, back);
    }

    #[test]
    fn llm_response_omits_absent_optional_fields() {
        let response = LlmResponse {
            json: LlmAction {
                speak: Some("Moving".to_string()),
                direction: Some("forward".to_string()),
                track: None,
            },
            raw: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("track"));
        assert!(!json.contains("raw"));
    }

    #[test]
    fn tts_speak_done_marker() {
        let json = serde_json::to_string(&TtsSpeakDone { done: true }).unwrap();
        assert_eq!(json, "{\"done\":true}");
    }

    #[test]
    fn parse_direction_rejects_unknown_tokens() {
        assert_eq!(parse_direction("forward"), Some(Direction::Forward));
        assert_eq!(parse_direction("sideways"), None);
    }

    #[test]
    fn system_health_round_trips() {
        let payload = SystemHealth {
            component: "stt".to_string(),
            healthy: false,
            timestamp: 1_700_000_000,
        };
        let json = serde_json::to_string(&payload).unwrap();
        let back: SystemHealth = serde_json::from_str(&json).unwrap();
        assert_eq!(payload, back);
    }

    #[test]
    fn context_note_matches_the_advisory_string() {
        assert_eq!(
            LlmRequest::CONTEXT_NOTE,
            "system_observation_only_last_known_state"
        );
    }
}
