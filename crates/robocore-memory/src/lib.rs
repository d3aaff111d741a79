//! `robocore-memory` – Conversation and World-Context State
//!
//! Two independent pieces of orchestrator-adjacent state live here, both
//! pure in-memory structures with no persistence substrate (spec §3: no
//! on-disk state is required by the core beyond a rolling log directory):
//!
//! - [`conversation`] – [`ConversationMemory`][conversation::ConversationMemory]:
//!   the bounded FIFO of user/assistant turns plus eviction summary.
//! - [`world_context`] – [`WorldContextAggregator`][world_context::WorldContextAggregator]:
//!   the last-known-value aggregator the orchestrator reads from when it
//!   assembles an `llm.request`'s `world_context` field.

pub mod conversation;
pub mod world_context;

pub use conversation::{ConversationMemory, Role, Turn};
pub use world_context::{Aged, WorldContextAggregator, WorldContextSnapshot};
