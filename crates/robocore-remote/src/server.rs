//! [`RemoteServer`] – the supervision HTTP server (spec §4.4).
//!
//! One listener task, one task per client connection, one telemetry
//! aggregator task, one MJPEG frame subscriber task, and one session-expiry
//! task — exactly the task shape spec §5 names for this component.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use robocore_bus::Channel;
use robocore_types::payload::RemoteIntent;
use robocore_types::{BuildInfo, Envelope, RobocoreError, Topic};

use crate::config::{RemoteConfig, SESSION_CHECK_INTERVAL};
use crate::http::{error_response, json_response, HttpRequest};
use crate::mjpeg::{run_frame_subscriber, stream_headers, stream_to_client, FrameBuffer};
use crate::session::Session;
use crate::telemetry::{run_aggregator, TelemetryAggregator};

const RECOGNIZED_INTENTS: &[&str] = &[
    "start",
    "stop",
    "left",
    "right",
    "listen",
    "text",
    "capture",
    "vision_mode",
    "pause_vision",
];

struct Shared {
    upstream: Channel,
    downstream: Channel,
    config: RemoteConfig,
    session: Session,
    telemetry: Arc<TelemetryAggregator>,
    frame_buffer: Arc<FrameBuffer>,
    build_info: BuildInfo,
}

/// The supervision HTTP server. One instance owns the bus handles, the
/// access-control list, and the session/telemetry/MJPEG state for the
/// single operator this component is designed to serve (spec §4.4
/// "for one operator").
pub struct RemoteServer {
    shared: Arc<Shared>,
}

impl RemoteServer {
    pub fn new(upstream: Channel, downstream: Channel, config: RemoteConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                upstream,
                downstream,
                config,
                session: Session::new(),
                telemetry: Arc::new(TelemetryAggregator::new()),
                frame_buffer: Arc::new(FrameBuffer::new()),
                build_info: BuildInfo::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            }),
        }
    }

    /// Binds the listener and runs until `shutdown` reports `true`.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<(), RobocoreError> {
        let addr: SocketAddr = format!("{}:{}", self.shared.config.host, self.shared.config.port)
            .parse()
            .map_err(|e| RobocoreError::Fatal(format!("invalid listen address: {e}")))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RobocoreError::Fatal(format!("bind error on {addr}: {e}")))?;

        tracing::info!(%addr, "remote supervision server listening");

        tokio::spawn(run_aggregator(
            self.shared.upstream.clone(),
            self.shared.downstream.clone(),
            Arc::clone(&self.shared.telemetry),
            shutdown.clone(),
        ));
        tokio::spawn(run_frame_subscriber(
            self.shared.upstream.clone(),
            Arc::clone(&self.shared.frame_buffer),
            shutdown.clone(),
        ));
        tokio::spawn(run_session_expiry(Arc::clone(&self.shared), shutdown.clone()));

        let mut shutdown_accept = shutdown.clone();
        loop {
            tokio::select! {
                _ = shutdown_accept.changed() => {
                    if *shutdown_accept.borrow() {
                        break;
                    }
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let shared = Arc::clone(&self.shared);
                            let client_shutdown = shutdown.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_client(stream, peer, shared, client_shutdown).await {
                                    tracing::debug!(%peer, error = %e, "client connection ended with error");
                                }
                            });
                        }
                        Err(e) => tracing::warn!(error = %e, "accept error"),
                    }
                }
            }
        }
        Ok(())
    }
}

async fn run_session_expiry(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(SESSION_CHECK_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                if shared.session.expire_if_idle(shared.config.session_timeout).await {
                    let envelope = Envelope::json(
                        Topic::RemoteSession,
                        &robocore_types::payload::RemoteSession { active: false },
                    );
                    if let Ok(envelope) = envelope {
                        let _ = shared.upstream.publish(envelope);
                    }
                }
            }
        }
    }
}

async fn handle_client(
    mut stream: TcpStream,
    peer: SocketAddr,
    shared: Arc<Shared>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), RobocoreError> {
    if !shared.config.permits(peer.ip()) {
        let body = error_response(403, "Forbidden", "source address not in allow-list");
        write_all(&mut stream, &body).await?;
        return Ok(());
    }

    let request = HttpRequest::read(&mut stream).await?;

    if request.method == "GET" && request.path == "/stream/mjpeg" {
        let headers = stream_headers();
        write_all(&mut stream, headers.as_bytes()).await?;
        let _ = stream_to_client(
            &mut stream,
            Arc::clone(&shared.frame_buffer),
            shared.config.mjpeg_fps,
            shutdown,
        )
        .await;
        return Ok(());
    }

    let response = route(&request, peer, &shared).await;
    write_all(&mut stream, &response).await
}

async fn route(request: &HttpRequest, peer: SocketAddr, shared: &Shared) -> Vec<u8> {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/health") => json_response(
            200,
            "OK",
            &serde_json::json!({ "ok": true, "build": shared.build_info }),
        ),
        ("GET", "/status") | ("GET", "/telemetry") => {
            shared.session.touch().await;
            json_response(200, "OK", &shared.telemetry.snapshot().await)
        }
        ("POST", "/intent") => handle_intent(request, peer, shared).await,
        _ => error_response(404, "Not Found", "no such endpoint"),
    }
}

async fn handle_intent(request: &HttpRequest, peer: SocketAddr, shared: &Shared) -> Vec<u8> {
    let payload: serde_json::Value = match serde_json::from_slice(&request.body) {
        Ok(v) => v,
        Err(_) => return error_response(400, "Bad Request", "malformed JSON body"),
    };
    let Some(intent) = payload.get("intent").and_then(|v| v.as_str()) else {
        return error_response(400, "Bad Request", "missing intent field");
    };
    if !RECOGNIZED_INTENTS.contains(&intent) {
        return error_response(400, "Bad Request", "unrecognized intent");
    }

    let envelope = Envelope::json(
        Topic::RemoteIntent,
        &RemoteIntent {
            intent: intent.to_string(),
            extras: payload.get("extras").cloned(),
            source: peer.ip().to_string(),
            timestamp: now_ts(),
        },
    );
    let envelope = match envelope {
        Ok(e) => e,
        Err(e) => return error_response(500, "Internal Server Error", &e.to_string()),
    };

    match shared.upstream.publish(envelope) {
        Ok(_) => {
            shared.session.touch().await;
            json_response(202, "Accepted", &serde_json::json!({ "accepted": true }))
        }
        Err(e) => error_response(503, "Service Unavailable", &e.to_string()),
    }
}

async fn write_all(stream: &mut TcpStream, body: &[u8]) -> Result<(), RobocoreError> {
    use tokio::io::AsyncWriteExt;
    stream
        .write_all(body)
        .await
        .map_err(|e| RobocoreError::Transport(format!("response write error: {e}")))
}

fn now_ts() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared_for_test() -> Arc<Shared> {
        Arc::new(Shared {
            upstream: Channel::default(),
            downstream: Channel::default(),
            config: RemoteConfig::default(),
            session: Session::new(),
            telemetry: Arc::new(TelemetryAggregator::new()),
            frame_buffer: Arc::new(FrameBuffer::new()),
            build_info: BuildInfo::new("robocore-remote", "0.1.0"),
        })
    }

    fn request(method: &str, path: &str, body: &[u8]) -> HttpRequest {
        HttpRequest {
            method: method.to_string(),
            path: path.to_string(),
            headers: Default::default(),
            body: body.to_vec(),
        }
    }

    #[tokio::test]
    async fn health_reports_ok_and_build_info() {
        let shared = shared_for_test();
        let response = route(&request("GET", "/health", b""), "127.0.0.1:1".parse().unwrap(), &shared).await;
        let text = String::from_utf8(response).unwrap();
        assert!(text.contains("200 OK"));
        assert!(text.contains("\"ok\":true"));
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let shared = shared_for_test();
        let response = route(&request("GET", "/nope", b""), "127.0.0.1:1".parse().unwrap(), &shared).await;
        assert!(String::from_utf8(response).unwrap().starts_with("HTTP/1.1 404"));
    }

    #[tokio::test]
    async fn recognized_intent_publishes_and_returns_202() {
        let shared = shared_for_test();
        let mut sub = shared.upstream.subscribe_topic(Topic::RemoteIntent);
        let response = route(
            &request("POST", "/intent", br#"{"intent":"stop"}"#),
            "127.0.0.1:1".parse().unwrap(),
            &shared,
        )
        .await;
        assert!(String::from_utf8(response).unwrap().starts_with("HTTP/1.1 202"));
        let env = tokio::time::timeout(std::time::Duration::from_millis(100), sub.recv())
            .await
            .unwrap()
            .unwrap();
        let intent: RemoteIntent = env.parse().unwrap();
        assert_eq!(intent.intent, "stop");
    }

    #[tokio::test]
    async fn unrecognized_intent_is_400_and_publishes_nothing() {
        let shared = shared_for_test();
        let mut sub = shared.upstream.subscribe_topic(Topic::RemoteIntent);
        let response = route(
            &request("POST", "/intent", br#"{"intent":"dance"}"#),
            "127.0.0.1:1".parse().unwrap(),
            &shared,
        )
        .await;
        assert!(String::from_utf8(response).unwrap().starts_with("HTTP/1.1 400"));
        assert!(tokio::time::timeout(std::time::Duration::from_millis(30), sub.recv())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn malformed_intent_body_is_400() {
        let shared = shared_for_test();
        let response = route(
            &request("POST", "/intent", b"not json"),
            "127.0.0.1:1".parse().unwrap(),
            &shared,
        )
        .await;
        assert!(String::from_utf8(response).unwrap().starts_with("HTTP/1.1 400"));
    }

    #[tokio::test]
    async fn status_touches_the_session() {
        let shared = shared_for_test();
        assert!(!shared.session.is_active().await);
        let _ = route(&request("GET", "/status", b""), "127.0.0.1:1".parse().unwrap(), &shared).await;
        assert!(shared.session.is_active().await);
    }
}
