//! Wire framing for the hub's TCP endpoints.
//!
//! Every frame on the wire is a topic-prefixed byte frame:
//! `u32 topic_len | topic bytes (UTF-8) | u32 payload_len | payload bytes`.
//! All integers are big-endian. This carries both JSON control messages and
//! raw binary payloads (MJPEG frames on `visn.frame`) over the same codec.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use robocore_types::RobocoreError;

/// Maximum topic length accepted from the wire. Guards against a corrupt
/// or malicious length prefix forcing an unbounded allocation.
const MAX_TOPIC_LEN: u32 = 256;

/// Maximum payload length accepted from the wire (16 MiB — comfortably
/// larger than one JPEG frame).
const MAX_PAYLOAD_LEN: u32 = 16 * 1024 * 1024;

/// A raw, not-yet-resolved wire frame: a topic name and its payload bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Writes one frame to `writer`, flushing after the write completes so
/// that two frames are never observed partially interleaved (spec I4's
/// "never writes two commands without flushing between them" is a UART
/// bridge invariant, but the same discipline applies here).
pub async fn write_frame<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    frame: &WireFrame,
) -> Result<(), RobocoreError> {
    let topic_bytes = frame.topic.as_bytes();
    writer
        .write_u32(topic_bytes.len() as u32)
        .await
        .map_err(|e| RobocoreError::Transport(e.to_string()))?;
    writer
        .write_all(topic_bytes)
        .await
        .map_err(|e| RobocoreError::Transport(e.to_string()))?;
    writer
        .write_u32(frame.payload.len() as u32)
        .await
        .map_err(|e| RobocoreError::Transport(e.to_string()))?;
    writer
        .write_all(&frame.payload)
        .await
        .map_err(|e| RobocoreError::Transport(e.to_string()))?;
    writer
        .flush()
        .await
        .map_err(|e| RobocoreError::Transport(e.to_string()))?;
    Ok(())
}

/// Reads one frame from `reader`. Returns `Ok(None)` on a clean EOF at a
/// frame boundary (the peer closed the connection); any other I/O failure
/// or an over-limit length prefix is a [`RobocoreError::Transport`] /
/// [`RobocoreError::Schema`].
pub async fn read_frame<R: AsyncReadExt + Unpin>(
    reader: &mut R,
) -> Result<Option<WireFrame>, RobocoreError> {
    let topic_len = match reader.read_u32().await {
        Ok(len) => len,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(RobocoreError::Transport(e.to_string())),
    };
    if topic_len > MAX_TOPIC_LEN {
        return Err(RobocoreError::Schema(format!(
            "topic length {topic_len} exceeds max {MAX_TOPIC_LEN}"
        )));
    }
    let mut topic_buf = vec![0u8; topic_len as usize];
    reader
        .read_exact(&mut topic_buf)
        .await
        .map_err(|e| RobocoreError::Transport(e.to_string()))?;
    let topic = String::from_utf8(topic_buf)
        .map_err(|e| RobocoreError::Schema(format!("topic is not UTF-8: {e}")))?;

    let payload_len = reader
        .read_u32()
        .await
        .map_err(|e| RobocoreError::Transport(e.to_string()))?;
    if payload_len > MAX_PAYLOAD_LEN {
        return Err(RobocoreError::Schema(format!(
            "payload length {payload_len} exceeds max {MAX_PAYLOAD_LEN}"
        )));
    }
    let mut payload = vec![0u8; payload_len as usize];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| RobocoreError::Transport(e.to_string()))?;

    Ok(Some(WireFrame { topic, payload }))
}
