//! Stable bus topic enumeration (spec §6, "stable contract").
//!
//! Topics are opaque byte strings matched by prefix at the transport layer
//! (see `robocore-bus`), but within the core's own components they are
//! referenced by this closed enum so that a typo in a topic name is a
//! compile error rather than a silently-dropped envelope.

use serde::{Deserialize, Serialize};

/// Which bus channel a topic belongs to.
///
/// The upstream channel carries sensor/event messages toward the hub; the
/// downstream channel carries commands away from the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Sensor/event traffic flowing toward the hub.
    Upstream,
    /// Command traffic flowing away from the hub.
    Downstream,
}

/// The full, closed set of bus topics in the external contract.
///
/// Unlisted byte strings arriving over the wire are protocol violations
/// (logged at debug, never surfaced as a crash).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    // ── Upstream (to orchestrator/remote) ──────────────────────────────
    WwDetected,
    SttTranscription,
    LlmResponse,
    TtsSpeakUpstream,
    VisnObject,
    VisnFrame,
    VisnCapture,
    Esp32Raw,
    Esp32Blocked,
    RemoteIntent,
    RemoteSession,
    SystemHealth,

    // ── Downstream (from orchestrator/remote) ──────────────────────────
    LlmRequest,
    TtsSpeakDownstream,
    NavCommand,
    CmdListenStart,
    CmdListenStop,
    CmdPauseVision,
    CmdVisionMode,
    CmdVisnCapture,
    DisplayState,
    DisplayText,
}

impl Topic {
    /// The byte-literal wire name for this topic, as enumerated in spec §6.
    pub const fn as_str(self) -> &'static str {
        match self {
            Topic::WwDetected => "ww.detected",
            Topic::SttTranscription => "stt.transcription",
            Topic::LlmResponse => "llm.response",
            Topic::TtsSpeakUpstream => "tts.speak",
            Topic::VisnObject => "visn.object",
            Topic::VisnFrame => "visn.frame",
            Topic::VisnCapture => "visn.capture",
            Topic::Esp32Raw => "esp32.raw",
            Topic::Esp32Blocked => "esp32.blocked",
            Topic::RemoteIntent => "remote.intent",
            Topic::RemoteSession => "remote.session",
            Topic::SystemHealth => "system.health",
            Topic::LlmRequest => "llm.request",
            Topic::TtsSpeakDownstream => "tts.speak",
            Topic::NavCommand => "nav.command",
            Topic::CmdListenStart => "cmd.listen.start",
            Topic::CmdListenStop => "cmd.listen.stop",
            Topic::CmdPauseVision => "cmd.pause.vision",
            Topic::CmdVisionMode => "cmd.vision.mode",
            Topic::CmdVisnCapture => "cmd.visn.capture",
            Topic::DisplayState => "display.state",
            Topic::DisplayText => "display.text",
        }
    }

    /// Which channel this topic is carried on.
    pub const fn channel(self) -> Channel {
        match self {
            Topic::WwDetected
            | Topic::SttTranscription
            | Topic::LlmResponse
            | Topic::TtsSpeakUpstream
            | Topic::VisnObject
            | Topic::VisnFrame
            | Topic::VisnCapture
            | Topic::Esp32Raw
            | Topic::Esp32Blocked
            | Topic::RemoteIntent
            | Topic::RemoteSession
            | Topic::SystemHealth => Channel::Upstream,

            Topic::LlmRequest
            | Topic::TtsSpeakDownstream
            | Topic::NavCommand
            | Topic::CmdListenStart
            | Topic::CmdListenStop
            | Topic::CmdPauseVision
            | Topic::CmdVisionMode
            | Topic::CmdVisnCapture
            | Topic::DisplayState
            | Topic::DisplayText => Channel::Downstream,
        }
    }
}

impl Topic {
    /// All topics in the closed enumeration, upstream first. Used by the
    /// bus hub to resolve a wire topic string back to a typed `Topic` and
    /// to validate prefix subscriptions.
    pub const ALL: &'static [Topic] = &[
        Topic::WwDetected,
        Topic::SttTranscription,
        Topic::LlmResponse,
        Topic::TtsSpeakUpstream,
        Topic::VisnObject,
        Topic::VisnFrame,
        Topic::VisnCapture,
        Topic::Esp32Raw,
        Topic::Esp32Blocked,
        Topic::RemoteIntent,
        Topic::RemoteSession,
        Topic::SystemHealth,
        Topic::LlmRequest,
        Topic::TtsSpeakDownstream,
        Topic::NavCommand,
        Topic::CmdListenStart,
        Topic::CmdListenStop,
        Topic::CmdPauseVision,
        Topic::CmdVisionMode,
        Topic::CmdVisnCapture,
        Topic::DisplayState,
        Topic::DisplayText,
    ];

    /// Resolves a wire topic string to the typed topic carrying that name
    /// on `channel`. `tts.speak` is carried on both channels with the same
    /// wire name, so the channel must be known to disambiguate it.
    pub fn from_wire(name: &str, channel: Channel) -> Option<Topic> {
        Topic::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == name && t.channel() == channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ww_detected_is_upstream() {
        assert_eq!(Topic::WwDetected.channel(), Channel::Upstream);
        assert_eq!(Topic::WwDetected.as_str(), "ww.detected");
    }

    #[test]
    fn nav_command_is_downstream() {
        assert_eq!(Topic::NavCommand.channel(), Channel::Downstream);
        assert_eq!(Topic::NavCommand.as_str(), "nav.command");
    }

    #[test]
    fn tts_speak_shares_wire_name_both_directions() {
        // tts.speak carries {text} downstream and {done:true} upstream —
        // same topic name, disambiguated by payload shape, not by topic.
        assert_eq!(Topic::TtsSpeakDownstream.as_str(), Topic::TtsSpeakUpstream.as_str());
        assert_eq!(Topic::TtsSpeakDownstream.channel(), Channel::Downstream);
        assert_eq!(Topic::TtsSpeakUpstream.channel(), Channel::Upstream);
    }

    #[test]
    fn from_wire_disambiguates_tts_speak_by_channel() {
        assert_eq!(
            Topic::from_wire("tts.speak", Channel::Upstream),
            Some(Topic::TtsSpeakUpstream)
        );
        assert_eq!(
            Topic::from_wire("tts.speak", Channel::Downstream),
            Some(Topic::TtsSpeakDownstream)
        );
    }

    #[test]
    fn from_wire_rejects_unknown_names() {
        assert_eq!(Topic::from_wire("nonexistent.topic", Channel::Upstream), None);
    }

    #[test]
    fn every_upstream_topic_round_trips_through_serde() {
        let topics = [
            Topic::WwDetected,
            Topic::SttTranscription,
            Topic::LlmResponse,
            Topic::Esp32Raw,
            Topic::Esp32Blocked,
            Topic::RemoteIntent,
            Topic::RemoteSession,
            Topic::SystemHealth,
        ];
        for t in topics {
            let json = serde_json::to_string(&t).unwrap();
            let back: Topic = serde_json::from_str(&json).unwrap();
            assert_eq!(t, back);
        }
    }
}
