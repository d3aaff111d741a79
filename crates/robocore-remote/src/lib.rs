//! `robocore-remote` – Supervision HTTP Surface
//!
//! Exposes the minimal REST + streaming surface spec §4.4 names for a
//! single polling operator:
//!
//! 1. **`/health`**, **`/status`** / **`/telemetry`** — build info and a
//!    last-writer-wins aggregation of the bus topics an operator cares
//!    about, refreshed by a dedicated aggregator task.
//! 2. **`/intent`** — translates a POSTed operator intent into an upstream
//!    `remote.intent` envelope; `202 Accepted` on success, `503` if the bus
//!    publish fails.
//! 3. **`/stream/mjpeg`** — a `multipart/x-mixed-replace` stream served
//!    from the single most-recent `visn.frame` buffer, one sender task per
//!    connected client.
//!
//! Every request first passes the configured CIDR allow-list; rejected
//! sources get `403` before the request is even parsed.
//!
//! # Usage
//!
//! ```rust,no_run
//! use robocore_bus::Channel;
//! use robocore_remote::{RemoteConfig, RemoteServer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (_tx, rx) = tokio::sync::watch::channel(false);
//!     RemoteServer::new(Channel::default(), Channel::default(), RemoteConfig::default())
//!         .run(rx)
//!         .await
//!         .expect("remote supervision server failed");
//! }
//! ```

pub mod config;
pub mod http;
pub mod mjpeg;
pub mod server;
pub mod session;
pub mod telemetry;

pub use config::RemoteConfig;
pub use server::RemoteServer;
