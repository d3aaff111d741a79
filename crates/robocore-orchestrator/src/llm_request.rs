//! Assembly of the `llm.request` payload from a transcription/manual-text
//! and the orchestrator's current world-context snapshot (spec §4.2.1).

use robocore_memory::WorldContextSnapshot;
use robocore_types::payload::LlmRequest;
use robocore_types::Direction;

/// Builds the request sent on `llm.request`. `world_context` is taken from
/// a single, fresh [`WorldContextAggregator::snapshot`][robocore_memory::WorldContextAggregator::snapshot]
/// call — never cached across requests (spec §4.2.1).
pub fn build_llm_request(
    text: &str,
    last_direction: Direction,
    world_context: &WorldContextSnapshot,
) -> LlmRequest {
    LlmRequest {
        text: text.to_string(),
        direction: direction_str(last_direction).to_string(),
        world_context: serde_json::to_value(world_context).unwrap_or(serde_json::Value::Null),
        context_note: LlmRequest::CONTEXT_NOTE.to_string(),
    }
}

fn direction_str(direction: Direction) -> &'static str {
    match direction {
        Direction::Forward => "forward",
        Direction::Backward => "backward",
        Direction::Left => "left",
        Direction::Right => "right",
        Direction::Stop => "stop",
        Direction::Scan => "scan",
    }
}
