//! [`OrchestratorConfig`] – tunables sourced from the `stt.*` /
//! `orchestrator.*` / `safety.*` configuration surface (spec §6).

use std::time::Duration;

/// Default minimum STT confidence below which a transcription is treated
/// as invalid (spec §4.2 names the check but not a default; chosen here).
pub const DEFAULT_STT_MIN_CONFIDENCE: f32 = 0.5;

/// Default heartbeat deadline for a component newly seen on `system.health`.
pub const DEFAULT_COMPONENT_HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub stt_timeout: Duration,
    pub stt_min_confidence: f32,
    pub llm_timeout: Duration,
    pub speaking_timeout: Duration,
    pub error_timeout: Duration,
    pub stop_threshold_cm: i32,
    pub warning_threshold_cm: i32,
    pub sensor_freshness: Duration,
    pub conversation_capacity: usize,
    pub conversation_turn_timeout: Duration,
    pub component_health_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            stt_timeout: Duration::from_secs(15),
            stt_min_confidence: DEFAULT_STT_MIN_CONFIDENCE,
            llm_timeout: Duration::from_secs(10),
            speaking_timeout: Duration::from_secs(30),
            error_timeout: Duration::from_secs(30),
            stop_threshold_cm: 10,
            warning_threshold_cm: 20,
            sensor_freshness: Duration::from_millis(2000),
            conversation_capacity: robocore_memory::conversation::DEFAULT_CAPACITY,
            conversation_turn_timeout: robocore_memory::conversation::DEFAULT_TURN_TIMEOUT,
            component_health_timeout: DEFAULT_COMPONENT_HEALTH_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_timeouts() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.stt_timeout, Duration::from_secs(15));
        assert_eq!(config.llm_timeout, Duration::from_secs(10));
        assert_eq!(config.speaking_timeout, Duration::from_secs(30));
        assert_eq!(config.error_timeout, Duration::from_secs(30));
        assert_eq!(config.stop_threshold_cm, 10);
        assert_eq!(config.warning_threshold_cm, 20);
    }
}
