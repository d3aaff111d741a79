//! `robocore-orchestrator` – The Phase FSM Engine
//!
//! The execution engine where the "thinking" happens: a single-threaded
//! event loop that drives the robot's global interaction [`Phase`] through
//! its closed transition table, fed by the upstream bus and acting by
//! publishing to the downstream bus.
//!
//! # Modules
//!
//! - [`orchestrator`] – [`Orchestrator`][orchestrator::Orchestrator]: owns
//!   the current phase, the safety pre-check, the component watchdog, and
//!   the conversation/world-context memory; `run` drives the event loop.
//! - [`config`] – [`OrchestratorConfig`][config::OrchestratorConfig]: the
//!   timeouts and thresholds sourced from the configuration surface.
//! - [`llm_request`] – assembly of the `llm.request` payload from a
//!   transcription (or manual text) plus a fresh world-context snapshot.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: initialises
//!   the global `tracing` subscriber with an optional OTLP span exporter.
//!   Set `OTEL_EXPORTER_OTLP_ENDPOINT` to enable live trace export to
//!   Jaeger, Grafana Tempo, or any OTLP-compatible collector.
//!
//! # Safety veto
//!
//! Every forward [`NavCommand`][robocore_types::NavCommand] the orchestrator
//! dispatches passes through [`SafetyGate`][robocore_safety::SafetyGate]'s
//! fail-open pre-check before publishing `nav.command`; the motor bridge's
//! fail-closed rule is the authoritative layer downstream of this one.

pub mod config;
pub mod llm_request;
pub mod orchestrator;
pub mod telemetry;

pub use config::OrchestratorConfig;
pub use llm_request::build_llm_request;
pub use orchestrator::Orchestrator;
pub use telemetry::{init_tracing, TracerProviderGuard};
