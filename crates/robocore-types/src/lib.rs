//! `robocore-types` – Shared Wire Types
//!
//! Every value that crosses a component boundary in the robocore
//! coordination core — the event bus, the UART motor bridge, the
//! orchestrator, and the supervision HTTP surface — is defined exactly once
//! here. Parsing happens at the boundary; everything inward passes typed
//! values, never raw JSON.
//!
//! # Modules
//!
//! - [`error`] – [`RobocoreError`]: the single error type threaded through
//!   every component's public API.
//! - [`topic`] – [`Topic`] and [`Channel`]: the stable topic enumeration and
//!   the upstream/downstream direction it belongs to.
//! - [`envelope`] – [`Envelope`]: the `(topic, payload)` pair carried on the
//!   bus.
//! - [`phase`] – [`Phase`] and [`OrchestratorEvent`]: the orchestrator's
//!   finite-state machine and its complete, closed transition table.
//! - [`sensor`] – [`SensorFrame`]: the parsed view of one UART `DATA:` line.
//! - [`nav`] – [`Direction`] and [`NavCommand`]: normalized movement intents.
//! - [`payload`] – the JSON payload schema for every bus topic in the
//!   external contract.
//! - [`build_info`] – [`BuildInfo`]: the version banner served by `/health`.

pub mod build_info;
pub mod envelope;
pub mod error;
pub mod nav;
pub mod payload;
pub mod phase;
pub mod sensor;
pub mod topic;

pub use build_info::BuildInfo;
pub use envelope::Envelope;
pub use error::RobocoreError;
pub use nav::{Direction, NavCommand};
pub use phase::{OrchestratorEvent, Phase};
pub use sensor::SensorFrame;
pub use topic::{Channel, Topic};
