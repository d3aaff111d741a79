//! [`Direction`] and [`NavCommand`] – normalized movement intents.

use serde::{Deserialize, Serialize};

/// A normalized movement intent. Always lowercase at the bus level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
    Scan,
}

impl Direction {
    /// The uppercase UART token this direction maps to (spec §4.3, §6).
    pub const fn uart_token(self) -> &'static str {
        match self {
            Direction::Forward => "FORWARD",
            Direction::Backward => "BACKWARD",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
            Direction::Stop => "STOP",
            Direction::Scan => "SCAN",
        }
    }
}

/// The `nav.command` payload: `{direction: "forward"|...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavCommand {
    pub direction: Direction,
}

impl NavCommand {
    pub const fn new(direction: Direction) -> Self {
        Self { direction }
    }
}
