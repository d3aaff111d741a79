//! The central hub: binds both bus endpoints so external, out-of-process
//! collaborators (wakeword, STT, TTS, LLM, vision) can join the bus over
//! TCP loopback, while in-process components (orchestrator, motor bridge,
//! remote) talk to the same channels directly without a network hop.
//!
//! Topology (spec §4.1): the hub's upstream socket is the *subscriber*
//! endpoint — external publishers connect and send envelopes inward. The
//! hub's downstream socket is the *publisher* endpoint — external
//! subscribers connect and receive envelopes outward. Connect/bind errors
//! at startup are fatal; everything after that is logged and discarded.

use tokio::net::{TcpListener, TcpStream};

use robocore_types::{Channel as Direction, Envelope, RobocoreError, Topic};

use crate::channel::Channel;
use crate::framing::{read_frame, write_frame, WireFrame};

/// Owns both bus channels and, once [`Hub::listen`] is called, the TCP
/// listeners that bridge them to external collaborators.
#[derive(Clone, Debug)]
pub struct Hub {
    upstream: Channel,
    downstream: Channel,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            upstream: Channel::default(),
            downstream: Channel::default(),
        }
    }

    /// The upstream channel, for in-process publishers (motor bridge,
    /// remote) and subscribers (orchestrator, remote).
    pub fn upstream(&self) -> &Channel {
        &self.upstream
    }

    /// The downstream channel, for in-process publishers (orchestrator,
    /// remote) and subscribers (motor bridge).
    pub fn downstream(&self) -> &Channel {
        &self.downstream
    }

    /// Binds both TCP endpoints and spawns their accept loops. Returns
    /// once both sockets are bound; the accept loops run until the
    /// process exits or the returned handles are aborted.
    pub async fn listen(
        &self,
        upstream_addr: &str,
        downstream_addr: &str,
    ) -> Result<HubHandles, RobocoreError> {
        let upstream_listener = TcpListener::bind(upstream_addr)
            .await
            .map_err(|e| RobocoreError::Fatal(format!("bind {upstream_addr}: {e}")))?;
        let downstream_listener = TcpListener::bind(downstream_addr)
            .await
            .map_err(|e| RobocoreError::Fatal(format!("bind {downstream_addr}: {e}")))?;

        tracing::info!(addr = upstream_addr, "bus upstream socket bound");
        tracing::info!(addr = downstream_addr, "bus downstream socket bound");

        let upstream_channel = self.upstream.clone();
        let upstream_task = tokio::spawn(async move {
            accept_publishers(upstream_listener, upstream_channel).await;
        });

        let downstream_channel = self.downstream.clone();
        let downstream_task = tokio::spawn(async move {
            accept_subscribers(downstream_listener, downstream_channel).await;
        });

        Ok(HubHandles {
            upstream_task,
            downstream_task,
        })
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

/// Join handles for the hub's two accept loops, returned so the caller can
/// fold them into a coordinated shutdown.
pub struct HubHandles {
    pub upstream_task: tokio::task::JoinHandle<()>,
    pub downstream_task: tokio::task::JoinHandle<()>,
}

/// Accepts external publisher connections and forwards every well-formed
/// frame into `channel`. One task per connection; a malformed frame or a
/// disconnect ends only that connection's task.
async fn accept_publishers(listener: TcpListener, channel: Channel) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "upstream accept failed");
                continue;
            }
        };
        tracing::debug!(%peer, "upstream publisher connected");
        let channel = channel.clone();
        tokio::spawn(async move {
            ingest_publisher(stream, channel).await;
        });
    }
}

async fn ingest_publisher(mut stream: TcpStream, channel: Channel) {
    loop {
        match read_frame(&mut stream).await {
            Ok(Some(frame)) => match Topic::from_wire(&frame.topic, Direction::Upstream) {
                Some(topic) => {
                    let envelope = Envelope::new(topic, frame.payload);
                    if let Err(e) = channel.publish(envelope) {
                        tracing::debug!(error = %e, "upstream publish had no subscribers");
                    }
                }
                None => {
                    tracing::debug!(topic = %frame.topic, "unknown upstream topic, dropping frame");
                }
            },
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(error = %e, "upstream publisher connection error");
                return;
            }
        }
    }
}

/// Accepts external subscriber connections and streams every envelope
/// published on `channel` out to each one. One task per connection; a
/// write error (the client disconnected) ends only that connection's task.
async fn accept_subscribers(listener: TcpListener, channel: Channel) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(error = %e, "downstream accept failed");
                continue;
            }
        };
        tracing::debug!(%peer, "downstream subscriber connected");
        let mut rx = channel.subscribe();
        tokio::spawn(async move {
            serve_subscriber(stream, &mut rx).await;
        });
    }
}

async fn serve_subscriber(
    mut stream: TcpStream,
    rx: &mut tokio::sync::broadcast::Receiver<Envelope>,
) {
    loop {
        let envelope = match rx.recv().await {
            Ok(envelope) => envelope,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "downstream subscriber lagged");
                continue;
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
        };
        let frame = WireFrame {
            topic: envelope.topic().as_str().to_string(),
            payload: envelope.into_payload(),
        };
        if let Err(e) = write_frame(&mut stream, &frame).await {
            tracing::debug!(error = %e, "downstream subscriber disconnected");
            return;
        }
    }
}
