//! [`WorldContextAggregator`] – last-known-value snapshot used to build
//! `llm.request.world_context` (spec §3 "WorldContext snapshot").
//!
//! Never cached across a request: [`WorldContextAggregator::snapshot`]
//! produces a fresh, point-in-time view every time it's called, annotating
//! each field with its age and whether it has gone stale.

use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;

use robocore_types::SensorFrame;

/// Default age beyond which a snapshot field is marked `stale` (spec §3
/// uses the same notion of freshness the safety veto does; this
/// aggregator's threshold is independently configurable).
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(2);

/// One aggregated field: a last-known value plus its age.
#[derive(Debug, Clone, Serialize)]
pub struct Aged<T> {
    pub value: T,
    pub age_ms: u64,
    pub stale: bool,
}

/// Point-in-time aggregation of the last-known values of vision
/// detections, sensor frame, display phase, navigation direction, and
/// vision mode.
#[derive(Debug, Clone, Serialize, Default)]
pub struct WorldContextSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_object: Option<Aged<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_frame: Option<Aged<SensorFrame>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_phase: Option<Aged<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nav_direction: Option<Aged<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_mode: Option<Aged<String>>,
}

#[derive(Debug, Clone)]
struct Observed<T> {
    value: T,
    at: Instant,
}

/// Holds the last-known value of each aggregated topic, updated by a bus
/// subscriber and read on demand by the orchestrator when it assembles an
/// `llm.request`.
#[derive(Debug, Default)]
pub struct WorldContextAggregator {
    stale_after: DurationOrDefault,
    vision_object: Option<Observed<Value>>,
    sensor_frame: Option<Observed<SensorFrame>>,
    display_phase: Option<Observed<String>>,
    nav_direction: Option<Observed<String>>,
    vision_mode: Option<Observed<String>>,
}

/// Wraps `Duration` so `#[derive(Default)]` can give the aggregator the
/// spec default without requiring callers to always name it explicitly.
#[derive(Debug, Clone, Copy)]
struct DurationOrDefault(Duration);

impl Default for DurationOrDefault {
    fn default() -> Self {
        Self(DEFAULT_STALE_AFTER)
    }
}

impl WorldContextAggregator {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            stale_after: DurationOrDefault(stale_after),
            ..Default::default()
        }
    }

    pub fn update_vision_object(&mut self, value: Value, now: Instant) {
        self.vision_object = Some(Observed { value, at: now });
    }

    pub fn update_sensor_frame(&mut self, frame: SensorFrame, now: Instant) {
        self.sensor_frame = Some(Observed { value: frame, at: now });
    }

    pub fn update_display_phase(&mut self, phase: impl Into<String>, now: Instant) {
        self.display_phase = Some(Observed {
            value: phase.into(),
            at: now,
        });
    }

    pub fn update_nav_direction(&mut self, direction: impl Into<String>, now: Instant) {
        self.nav_direction = Some(Observed {
            value: direction.into(),
            at: now,
        });
    }

    pub fn update_vision_mode(&mut self, mode: impl Into<String>, now: Instant) {
        self.vision_mode = Some(Observed {
            value: mode.into(),
            at: now,
        });
    }

    fn age(&self, at: Instant, now: Instant) -> Aged<()> {
        let age = now.saturating_duration_since(at);
        Aged {
            value: (),
            age_ms: age.as_millis() as u64,
            stale: age > self.stale_after.0,
        }
    }

    /// Produces a fresh snapshot at `now`. Never cached: call this once
    /// per `llm.request` assembly, never reused across requests.
    pub fn snapshot(&self, now: Instant) -> WorldContextSnapshot {
        WorldContextSnapshot {
            vision_object: self.vision_object.as_ref().map(|o| {
                let a = self.age(o.at, now);
                Aged {
                    value: o.value.clone(),
                    age_ms: a.age_ms,
                    stale: a.stale,
                }
            }),
            sensor_frame: self.sensor_frame.as_ref().map(|o| {
                let a = self.age(o.at, now);
                Aged {
                    value: o.value,
                    age_ms: a.age_ms,
                    stale: a.stale,
                }
            }),
            display_phase: self.display_phase.as_ref().map(|o| {
                let a = self.age(o.at, now);
                Aged {
                    value: o.value.clone(),
                    age_ms: a.age_ms,
                    stale: a.stale,
                }
            }),
            nav_direction: self.nav_direction.as_ref().map(|o| {
                let a = self.age(o.at, now);
                Aged {
                    value: o.value.clone(),
                    age_ms: a.age_ms,
                    stale: a.stale,
                }
            }),
            vision_mode: self.vision_mode.as_ref().map(|o| {
                let a = self.age(o.at, now);
                Aged {
                    value: o.value.clone(),
                    age_ms: a.age_ms,
                    stale: a.stale,
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unobserved_fields_are_absent_from_snapshot() {
        let agg = WorldContextAggregator::new(DEFAULT_STALE_AFTER);
        let snap = agg.snapshot(Instant::now());
        assert!(snap.vision_object.is_none());
        assert!(snap.sensor_frame.is_none());
    }

    #[test]
    fn fresh_field_is_not_stale() {
        let mut agg = WorldContextAggregator::new(Duration::from_secs(2));
        let t0 = Instant::now();
        agg.update_nav_direction("forward", t0);
        let snap = agg.snapshot(t0 + Duration::from_millis(100));
        assert!(!snap.nav_direction.unwrap().stale);
    }

    #[test]
    fn old_field_is_marked_stale() {
        let mut agg = WorldContextAggregator::new(Duration::from_millis(50));
        let t0 = Instant::now();
        agg.update_vision_mode("idle", t0);
        let snap = agg.snapshot(t0 + Duration::from_millis(200));
        assert!(snap.vision_mode.unwrap().stale);
    }

    #[test]
    fn snapshot_is_never_cached_across_calls() {
        let mut agg = WorldContextAggregator::new(Duration::from_secs(2));
        let t0 = Instant::now();
        agg.update_vision_object(json!({"label": "cup"}), t0);
        let first = agg.snapshot(t0);
        agg.update_vision_object(json!({"label": "box"}), t0 + Duration::from_millis(10));
        let second = agg.snapshot(t0 + Duration::from_millis(10));
        assert_ne!(
            first.vision_object.unwrap().value,
            second.vision_object.unwrap().value
        );
    }

    #[test]
    fn serializes_without_absent_fields() {
        let agg = WorldContextAggregator::new(DEFAULT_STALE_AFTER);
        let snap = agg.snapshot(Instant::now());
        let json = serde_json::to_string(&snap).unwrap();
        assert_eq!(json, "{}");
    }
}
