//! The serial transport abstraction the bridge reads and writes through.
//!
//! Mirrors the teacher's `Actuator` trait shape: the rest of the bridge
//! only ever talks to [`SerialPort`], so the physical `tokio-serial` port
//! can be swapped for an in-memory duplex in tests without touching the
//! reader/writer logic.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::SerialPortBuilderExt;

use robocore_types::RobocoreError;

/// Anything that can stand in for the physical UART connection: an
/// async byte stream, readable and writable independently.
pub trait SerialPort: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> SerialPort for T {}

/// Opens the physical serial device at `device` and `baud_rate` (115200
/// 8N1 per spec §6). Fails fast if the device cannot be opened — the
/// caller is expected to retry with a backoff, not treat this as fatal.
pub fn open(device: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream, RobocoreError> {
    tokio_serial::new(device, baud_rate)
        .open_native_async()
        .map_err(|e| RobocoreError::Transport(format!("open {device}: {e}")))
}

/// An in-memory [`SerialPort`] for tests: a duplex pipe whose "firmware
/// end" a test can drive directly, without a physical device.
pub fn sim_pair() -> (tokio::io::DuplexStream, tokio::io::DuplexStream) {
    tokio::io::duplex(4096)
}
