//! MJPEG frame buffer and per-client streaming (spec §4.4 "MJPEG stream").
//!
//! A single subscriber task holds at most one most-recent JPEG under a
//! mutex (single-writer, many-reader — spec §5 "shared resources"); each
//! connected client runs its own sender loop at the configured frame rate,
//! repeating the previous frame when nothing new has arrived.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::sync::{watch, Mutex};

use robocore_bus::Channel;
use robocore_types::Topic;

pub const MULTIPART_BOUNDARY: &str = "frame";

/// Holds the single most-recently observed JPEG frame.
#[derive(Default)]
pub struct FrameBuffer {
    inner: Mutex<Option<Vec<u8>>>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, frame: Vec<u8>) {
        *self.inner.lock().await = Some(frame);
    }

    pub async fn get(&self) -> Option<Vec<u8>> {
        self.inner.lock().await.clone()
    }
}

/// Subscribes to `visn.frame` and replaces `buffer`'s contents with every
/// new JPEG until `shutdown` reports `true`.
pub async fn run_frame_subscriber(
    upstream: Channel,
    buffer: Arc<FrameBuffer>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut frames = upstream.subscribe_topic(Topic::VisnFrame);
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
            frame = frames.recv() => {
                match frame {
                    Some(env) => buffer.set(env.into_payload()).await,
                    None => break,
                }
            }
        }
    }
}

/// Streams `multipart/x-mixed-replace` chunks to `writer` at `fps` until
/// the buffer has never held a frame, `shutdown` fires, or the write fails
/// (the caller interprets a write error as "that client disconnected").
pub async fn stream_to_client<W: AsyncWrite + Unpin>(
    writer: &mut W,
    buffer: Arc<FrameBuffer>,
    fps: u32,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let period = Duration::from_secs_f64(1.0 / fps.max(1) as f64);
    let mut last_frame: Option<Vec<u8>> = None;

    loop {
        if *shutdown.borrow() {
            return Ok(());
        }
        if let Some(frame) = buffer.get().await {
            last_frame = Some(frame);
        }
        if let Some(frame) = &last_frame {
            write_chunk(writer, frame).await?;
        }
        tokio::select! {
            _ = tokio::time::sleep(period) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return Ok(());
                }
            }
        }
    }
}

async fn write_chunk<W: AsyncWrite + Unpin>(writer: &mut W, frame: &[u8]) -> std::io::Result<()> {
    let header = format!(
        "--{MULTIPART_BOUNDARY}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        frame.len()
    );
    writer.write_all(header.as_bytes()).await?;
    writer.write_all(frame).await?;
    writer.write_all(b"\r\n").await?;
    writer.flush().await
}

/// The response headers sent once at the start of an MJPEG stream.
pub fn stream_headers() -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: multipart/x-mixed-replace; boundary={MULTIPART_BOUNDARY}\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn buffer_starts_empty() {
        let buffer = FrameBuffer::new();
        assert!(buffer.get().await.is_none());
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let buffer = FrameBuffer::new();
        buffer.set(vec![0xFF, 0xD8, 0xFF, 0xE0]).await;
        assert_eq!(buffer.get().await, Some(vec![0xFF, 0xD8, 0xFF, 0xE0]));
    }

    #[tokio::test]
    async fn stream_to_client_repeats_last_frame_when_no_new_one_arrives() {
        use tokio::io::AsyncReadExt;

        let buffer = Arc::new(FrameBuffer::new());
        buffer.set(vec![1, 2, 3]).await;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (mut client_side, mut server_side) = tokio::io::duplex(4096);

        let fps = 1000; // fast enough to produce several chunks quickly
        let task = tokio::spawn(async move {
            let _ = stream_to_client(&mut server_side, buffer, fps, shutdown_rx).await;
        });

        let mut out = vec![0u8; 512];
        let mut total = Vec::new();
        for _ in 0..3 {
            if let Ok(Ok(n)) =
                tokio::time::timeout(Duration::from_millis(100), client_side.read(&mut out)).await
            {
                total.extend_from_slice(&out[..n]);
            }
        }
        shutdown_tx.send(true).unwrap();
        let _ = task.await;

        let text = String::from_utf8_lossy(&total);
        assert!(text.contains("Content-Type: image/jpeg"));
        assert!(text.matches("--frame").count() >= 2, "expected repeated chunks");
    }

    #[test]
    fn stream_headers_names_the_boundary() {
        let headers = stream_headers();
        assert!(headers.contains("multipart/x-mixed-replace"));
        assert!(headers.contains("boundary=frame"));
    }
}
