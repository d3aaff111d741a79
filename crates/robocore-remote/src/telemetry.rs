//! [`TelemetryAggregator`] – last-writer-wins snapshot of the bus topics a
//! polling operator cares about (spec §4.4 "telemetry aggregation").
//!
//! A single bus-subscriber task holds the only write access; `/status` and
//! `/telemetry` read a clone of the snapshot under the same mutex. Mirrors
//! [`robocore_memory::WorldContextAggregator`]'s last-known-value shape,
//! specialized here to the exact topic set spec §4.4 names rather than the
//! orchestrator's world-context fields.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, Mutex};

use robocore_bus::Channel;
use robocore_types::payload::{
    DisplayState, DisplayText, Esp32Raw, LlmResponse, PauseVision, TtsSpeakRequest, VisionMode,
};
use robocore_types::Topic;

/// The full set of last-known values exposed by `/status` and `/telemetry`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TelemetrySnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_state: Option<DisplayState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_text: Option<DisplayText>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_mode: Option<VisionMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pause_vision: Option<PauseVision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vision_object: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensor_frame: Option<Esp32Raw>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_response: Option<LlmResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_speak: Option<TtsSpeakRequest>,
}

/// Mutex-protected holder for the current [`TelemetrySnapshot`]. Reads copy
/// out under the lock (spec §4.4 "O(1)"); writes replace one field at a
/// time under the same lock.
#[derive(Default)]
pub struct TelemetryAggregator {
    inner: Mutex<TelemetrySnapshot>,
}

impl TelemetryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> TelemetrySnapshot {
        self.inner.lock().await.clone()
    }

    async fn update(&self, f: impl FnOnce(&mut TelemetrySnapshot)) {
        let mut snapshot = self.inner.lock().await;
        f(&mut snapshot);
    }
}

/// Subscribes to every aggregated topic and applies last-writer-wins
/// updates until `shutdown` reports `true`. `upstream` carries
/// `visn.object`/`esp32.raw`/`llm.response`; `downstream` carries
/// `display.state`/`display.text`/`cmd.vision.mode`/`cmd.pause.vision`/
/// `tts.speak`.
pub async fn run_aggregator(
    upstream: Channel,
    downstream: Channel,
    aggregator: Arc<TelemetryAggregator>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut vision_object = upstream.subscribe_topic(Topic::VisnObject);
    let mut sensor_frame = upstream.subscribe_topic(Topic::Esp32Raw);
    let mut llm_response = upstream.subscribe_topic(Topic::LlmResponse);
    let mut display_state = downstream.subscribe_topic(Topic::DisplayState);
    let mut display_text = downstream.subscribe_topic(Topic::DisplayText);
    let mut vision_mode = downstream.subscribe_topic(Topic::CmdVisionMode);
    let mut pause_vision = downstream.subscribe_topic(Topic::CmdPauseVision);
    let mut tts_speak = downstream.subscribe_topic(Topic::TtsSpeakDownstream);

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
            Some(env) = vision_object.recv() => {
                if let Ok(value) = env.parse() {
                    aggregator.update(|s| s.vision_object = Some(value)).await;
                }
            }
            Some(env) = sensor_frame.recv() => {
                if let Ok(value) = env.parse::<Esp32Raw>() {
                    aggregator.update(|s| s.sensor_frame = Some(value)).await;
                }
            }
            Some(env) = llm_response.recv() => {
                if let Ok(value) = env.parse::<LlmResponse>() {
                    aggregator.update(|s| s.llm_response = Some(value)).await;
                }
            }
            Some(env) = display_state.recv() => {
                if let Ok(value) = env.parse::<DisplayState>() {
                    aggregator.update(|s| s.display_state = Some(value)).await;
                }
            }
            Some(env) = display_text.recv() => {
                if let Ok(value) = env.parse::<DisplayText>() {
                    aggregator.update(|s| s.display_text = Some(value)).await;
                }
            }
            Some(env) = vision_mode.recv() => {
                if let Ok(value) = env.parse::<VisionMode>() {
                    aggregator.update(|s| s.vision_mode = Some(value)).await;
                }
            }
            Some(env) = pause_vision.recv() => {
                if let Ok(value) = env.parse::<PauseVision>() {
                    aggregator.update(|s| s.pause_vision = Some(value)).await;
                }
            }
            Some(env) = tts_speak.recv() => {
                if let Ok(value) = env.parse::<TtsSpeakRequest>() {
                    aggregator.update(|s| s.tts_speak = Some(value)).await;
                }
            }
        }
    }
}
