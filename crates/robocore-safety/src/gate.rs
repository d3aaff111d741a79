//! [`SafetyGate`] – rule engine guarding forward motion.
//!
//! Every registered [`Rule`] is evaluated in order against a candidate
//! [`NavCommand`] and the most recently observed [`SensorFrame`]; the first
//! violation returns a [`RobocoreError::SafetyRefusal`] and the command is
//! not forwarded.
//!
//! Two built-in rules are provided, grounded in the same two places the
//! spec applies a safety veto (§4.2, §4.3) — they deliberately differ in
//! how they treat a missing or stale frame:
//! - [`BridgeForwardSafetyRule`] is fail-closed: no fresh reading at all is
//!   itself a refusal. This is the motor bridge's final, authoritative
//!   layer before a command reaches the wire.
//! - [`OrchestratorForwardVetoRule`] is fail-open: it only refuses when a
//!   *fresh* frame actively reports an obstacle. A stale or missing frame
//!   does not block the orchestrator's pre-check, because the bridge will
//!   still apply the fail-closed rule downstream.

use std::time::Duration;

use robocore_types::{Direction, NavCommand, RobocoreError, SensorFrame};

/// A single safety invariant a candidate [`NavCommand`] must satisfy.
pub trait Rule: Send + Sync {
    /// Human-readable name used in refusal messages.
    fn name(&self) -> &str;

    /// Returns `Ok(())` when `command` is safe to forward given the most
    /// recent `frame` and its `age` (`None` age means no frame has ever
    /// been observed).
    fn check(
        &self,
        command: NavCommand,
        frame: Option<&SensorFrame>,
        age: Option<Duration>,
    ) -> Result<(), RobocoreError>;
}

/// Evaluates a list of [`Rule`]s against a candidate command, in
/// registration order, stopping at the first refusal.
#[derive(Default)]
pub struct SafetyGate {
    rules: Vec<Box<dyn Rule>>,
}

impl SafetyGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    /// Runs `command` through every registered rule. Returns the first
    /// [`RobocoreError::SafetyRefusal`] encountered, or `Ok(())` if all
    /// rules pass.
    pub fn check(
        &self,
        command: NavCommand,
        frame: Option<&SensorFrame>,
        age: Option<Duration>,
    ) -> Result<(), RobocoreError> {
        for rule in &self.rules {
            rule.check(command, frame, age)?;
        }
        Ok(())
    }
}

/// Fail-closed forward-motion rule for the motor bridge (spec §4.3).
///
/// Refuses `forward` when the frame reports `obstacle` or `warning`, when
/// `min_distance` is below `stop_threshold_cm`, or when no frame newer
/// than `freshness.` has ever been observed. All other directions always
/// pass — `stop`, `backward`, `left`, `right`, and `scan` are always
/// permitted (spec §4.3).
pub struct BridgeForwardSafetyRule {
    pub stop_threshold_cm: i32,
    pub freshness: Duration,
}

impl Rule for BridgeForwardSafetyRule {
    fn name(&self) -> &str {
        "bridge_forward_safety"
    }

    fn check(
        &self,
        command: NavCommand,
        frame: Option<&SensorFrame>,
        age: Option<Duration>,
    ) -> Result<(), RobocoreError> {
        if command.direction != Direction::Forward {
            return Ok(());
        }
        let (frame, age) = match (frame, age) {
            (Some(frame), Some(age)) => (frame, age),
            _ => {
                return Err(RobocoreError::SafetyRefusal {
                    reason: "no sensor frame observed yet".to_string(),
                })
            }
        };
        if age > self.freshness {
            return Err(RobocoreError::SafetyRefusal {
                reason: format!("sensor frame is stale ({age:?} old)"),
            });
        }
        if frame.obstacle || frame.warning {
            return Err(RobocoreError::SafetyRefusal {
                reason: "obstacle or warning reported by sensor frame".to_string(),
            });
        }
        if frame.min_distance >= 0 && frame.min_distance < self.stop_threshold_cm {
            return Err(RobocoreError::SafetyRefusal {
                reason: format!(
                    "min_distance {} below stop threshold {}",
                    frame.min_distance, self.stop_threshold_cm
                ),
            });
        }
        Ok(())
    }
}

/// Fail-open forward-motion pre-check for the orchestrator (spec §4.2).
///
/// Only refuses `forward` when a frame *younger than* `freshness` reports
/// `obstacle=true`. A missing or stale frame does not refuse here — the
/// motor bridge's [`BridgeForwardSafetyRule`] is the authoritative,
/// fail-closed layer.
pub struct OrchestratorForwardVetoRule {
    pub freshness: Duration,
}

impl Rule for OrchestratorForwardVetoRule {
    fn name(&self) -> &str {
        "orchestrator_forward_veto"
    }

    fn check(
        &self,
        command: NavCommand,
        frame: Option<&SensorFrame>,
        age: Option<Duration>,
    ) -> Result<(), RobocoreError> {
        if command.direction != Direction::Forward {
            return Ok(());
        }
        if let (Some(frame), Some(age)) = (frame, age) {
            if age < self.freshness && frame.obstacle {
                return Err(RobocoreError::SafetyRefusal {
                    reason: "obstacle within stop distance".to_string(),
                });
            }
        }
        Ok(())
    }
}
