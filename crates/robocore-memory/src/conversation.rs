//! [`ConversationMemory`] – bounded FIFO of user/assistant turns.
//!
//! The orchestrator is the only core component that observes both
//! `stt.transcription` and `llm.response` — the two events that grow the
//! buffer — so it operationally drives this type even though spec §3 frames
//! conversation memory as "owned by the LLM collaborator" (a statement
//! about authority over content, not code location; see DESIGN.md).

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Default number of turns retained before the oldest is evicted into the
/// summary string (spec §3, default 10).
pub const DEFAULT_CAPACITY: usize = 10;

/// Default conversation-activity timeout: turns older than this clear the
/// buffer and summary before the next user turn is added (spec §3, 120 s).
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(120);

/// Who spoke a given turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// One user or assistant utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// A bounded FIFO of turns plus a summary of anything evicted to make room.
///
/// Invariant (I6): `turns.len() <= capacity` after processing any single
/// user turn. Turns older than `turn_timeout` cause the whole buffer and
/// summary to be cleared before the next user turn is added.
#[derive(Debug)]
pub struct ConversationMemory {
    capacity: usize,
    turn_timeout: Duration,
    turns: VecDeque<Turn>,
    summary: Option<String>,
    last_activity: Option<Instant>,
}

impl ConversationMemory {
    pub fn new(capacity: usize, turn_timeout: Duration) -> Self {
        Self {
            capacity,
            turn_timeout,
            turns: VecDeque::new(),
            summary: None,
            last_activity: None,
        }
    }

    /// Appends a user turn at `now`, first clearing the buffer if the
    /// conversation has gone stale, then evicting the oldest turn into the
    /// summary if the capacity would otherwise be exceeded.
    pub fn add_user_turn(&mut self, text: impl Into<String>, now: Instant) {
        self.clear_if_stale(now);
        self.push(Turn {
            role: Role::User,
            text: text.into(),
        });
        self.last_activity = Some(now);
    }

    /// Appends an assistant turn at `now`. Does not itself reset the
    /// staleness clock's clearing behavior for the *next* user turn — only
    /// a new user turn re-arms activity tracking for timeout purposes,
    /// matching spec §3's "before the next user turn is added" wording.
    pub fn add_assistant_turn(&mut self, text: impl Into<String>, now: Instant) {
        self.push(Turn {
            role: Role::Assistant,
            text: text.into(),
        });
        self.last_activity = Some(now);
    }

    fn push(&mut self, turn: Turn) {
        if self.turns.len() >= self.capacity {
            if let Some(evicted) = self.turns.pop_front() {
                self.summarize_eviction(&evicted);
            }
        }
        self.turns.push_back(turn);
    }

    fn summarize_eviction(&mut self, evicted: &Turn) {
        let role = match evicted.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        let entry = format!("{role}: {}", evicted.text);
        match &mut self.summary {
            Some(s) => {
                s.push_str("; ");
                s.push_str(&entry);
            }
            None => self.summary = Some(entry),
        }
    }

    /// Clears the buffer and summary if the conversation has been idle
    /// longer than `turn_timeout`. Called before adding a new user turn.
    pub fn clear_if_stale(&mut self, now: Instant) {
        if let Some(last) = self.last_activity
            && now.saturating_duration_since(last) > self.turn_timeout
        {
            self.turns.clear();
            self.summary = None;
        }
    }

    pub fn turns(&self) -> &VecDeque<Turn> {
        &self.turns
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TURN_TIMEOUT)
    }
}
