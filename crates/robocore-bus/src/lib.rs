//! `robocore-bus` – The Event Fabric
//!
//! A two-channel publish/subscribe transport: the upstream channel carries
//! sensor/event messages toward the hub, the downstream channel carries
//! commands away from it. Exactly one process binds both endpoints (the
//! hub); all other collaborators connect, in-process or over TCP loopback.
//!
//! # Modules
//!
//! - [`channel`] – [`Channel`] and [`TopicSubscriber`]: the in-process
//!   broadcast-backed publish/subscribe primitive backing one direction of
//!   the bus.
//! - [`framing`] – the length-prefixed wire codec shared by both TCP
//!   endpoints.
//! - [`hub`] – [`Hub`]: binds both endpoints and bridges external,
//!   out-of-process collaborators onto the in-process channels.

pub mod channel;
pub mod framing;
pub mod hub;

pub use channel::{Channel, TopicSubscriber};
pub use framing::WireFrame;
pub use hub::{Hub, HubHandles};
