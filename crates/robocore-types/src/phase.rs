//! [`Phase`] and [`OrchestratorEvent`] – the orchestrator's finite-state
//! machine and its complete, closed transition table.

use serde::{Deserialize, Serialize};

/// The orchestrator's global interaction state. Exactly one is active at
/// any instant; mutated only by the orchestrator's single-threaded event
/// loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Listening,
    Thinking,
    Speaking,
    Error,
}

impl Phase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Listening => "listening",
            Phase::Thinking => "thinking",
            Phase::Speaking => "speaking",
            Phase::Error => "error",
        }
    }
}

/// The set of named events the transition table dispatches on.
///
/// `HealthError` and `SafetyVeto` both apply from any phase (the "any"
/// rows of the table); every other variant is only matched from the
/// specific `From` phase listed in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrchestratorEvent {
    Wakeword,
    ManualTrigger,
    ManualText,
    SttValid,
    SttInvalid,
    SttTimeout,
    LlmWithSpeech,
    LlmNoSpeech,
    LlmTimeout,
    TtsDone,
    TtsTimeout,
    HealthError,
    HealthOk,
    ErrorTimeout,
    /// The mandatory forward-command safety veto fired (spec §4.2): a
    /// `nav.command{forward}` was refused and the phase returns to IDLE
    /// regardless of where it fired from.
    SafetyVeto,
}

impl Phase {
    /// Looks up the next phase for `(self, event)` per the closed
    /// transition table in spec §4.2. `None` means the pair is not in the
    /// table: the caller logs and leaves `self` unchanged.
    pub const fn transition(self, event: OrchestratorEvent) -> Option<Phase> {
        use OrchestratorEvent::*;
        use Phase::*;

        // The "any -> ERROR on health_error" row applies regardless of
        // current phase, and is checked before the per-phase match.
        if matches!(event, HealthError) {
            return Some(Error);
        }
        // Likewise "any -> IDLE on safety_veto": a refused forward command
        // returns to IDLE no matter which phase it fired from.
        if matches!(event, SafetyVeto) {
            return Some(Idle);
        }

        match (self, event) {
            (Idle, Wakeword) => Some(Listening),
            (Idle, ManualTrigger) => Some(Listening),
            (Idle, ManualText) => Some(Thinking),
            (Listening, SttValid) => Some(Thinking),
            (Listening, SttInvalid) => Some(Idle),
            (Listening, SttTimeout) => Some(Idle),
            (Thinking, LlmWithSpeech) => Some(Speaking),
            (Thinking, LlmNoSpeech) => Some(Idle),
            (Thinking, LlmTimeout) => Some(Idle),
            (Speaking, TtsDone) => Some(Idle),
            (Speaking, TtsTimeout) => Some(Idle),
            (Error, HealthOk) => Some(Idle),
            (Error, ErrorTimeout) => Some(Idle),
            _ => None,
        }
    }
}
