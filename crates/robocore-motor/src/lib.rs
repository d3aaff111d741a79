//! `robocore-motor` – UART Motor Bridge
//!
//! Bidirectional translator between the bus and the line-oriented UART
//! peripheral (spec §4.3): serializes `nav.command` envelopes to ASCII
//! tokens, parses telemetry lines back into [`SensorFrame`][robocore_types::SensorFrame]
//! values, and layers a software safety veto on top of the peripheral's own
//! safety firmware.
//!
//! # Modules
//!
//! - [`bridge`] – [`run`][bridge::run] and [`BridgeConfig`][bridge::BridgeConfig]:
//!   the top-level supervised session (reader, writer, bus-subscriber tasks)
//!   that reconnects on port I/O error without ever exiting the process.
//! - [`protocol`] – line parsing/encoding for the UART wire protocol (§6):
//!   `DATA:`, `ACK:`, `ALERT:`, and `SCAN:` prefixes.
//! - [`serial_port`] – the [`SerialPort`][serial_port::SerialPort] trait and
//!   its `tokio-serial`-backed implementation, kept as a trait so tests can
//!   substitute an in-memory duplex stream.

pub mod bridge;
pub mod protocol;
pub mod serial_port;

pub use bridge::{run, BridgeConfig};
pub use protocol::TelemetryLine;
pub use serial_port::SerialPort;
