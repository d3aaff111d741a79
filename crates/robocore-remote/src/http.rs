//! Minimal HTTP/1.1 request parsing and response framing.
//!
//! Generalizes the teacher's `cockpit::server::handle_connection` peek-based
//! WebSocket-upgrade sniff into a full method/path/header/body parser —
//! still no framework, matching the teacher's choice to hand-roll the wire
//! format rather than reach for `axum`/`hyper`.

use std::collections::HashMap;

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt};

use robocore_types::RobocoreError;

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Reads and parses one request from `reader`. Only `Content-Length`
    /// bodies are supported — this server never receives chunked requests
    /// from its one operator client.
    pub async fn read<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Self, RobocoreError> {
        let mut buf = Vec::with_capacity(1024);
        let header_end = loop {
            if let Some(pos) = find_header_end(&buf) {
                break pos;
            }
            let mut chunk = [0u8; 512];
            let n = reader
                .read(&mut chunk)
                .await
                .map_err(|e| RobocoreError::Transport(format!("request read error: {e}")))?;
            if n == 0 {
                return Err(RobocoreError::Protocol("connection closed mid-request".to_string()));
            }
            buf.extend_from_slice(&chunk[..n]);
            if buf.len() > 64 * 1024 {
                return Err(RobocoreError::Protocol("request headers too large".to_string()));
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let mut lines = head.split("\r\n");
        let request_line = lines
            .next()
            .ok_or_else(|| RobocoreError::Schema("empty request line".to_string()))?;
        let mut parts = request_line.split_whitespace();
        let method = parts
            .next()
            .ok_or_else(|| RobocoreError::Schema("missing HTTP method".to_string()))?
            .to_string();
        let path = parts
            .next()
            .ok_or_else(|| RobocoreError::Schema("missing HTTP path".to_string()))?
            .to_string();

        let mut headers = HashMap::new();
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_lowercase(), value.trim().to_string());
            }
        }

        let content_length: usize = headers
            .get("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let mut body = buf[header_end + 4..].to_vec();
        while body.len() < content_length {
            let mut chunk = [0u8; 512];
            let n = reader
                .read(&mut chunk)
                .await
                .map_err(|e| RobocoreError::Transport(format!("body read error: {e}")))?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        body.truncate(content_length);

        Ok(Self {
            method,
            path,
            headers,
            body,
        })
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Builds a raw HTTP/1.1 response with a JSON body.
pub fn json_response(status: u16, reason: &str, body: &impl Serialize) -> Vec<u8> {
    let body = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    raw_response(status, reason, "application/json", &body)
}

/// Builds a `{"error": message}` response for a given status code.
pub fn error_response(status: u16, reason: &str, message: &str) -> Vec<u8> {
    json_response(status, reason, &serde_json::json!({ "error": message }))
}

fn raw_response(status: u16, reason: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
    let header = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let mut out = header.into_bytes();
    out.extend_from_slice(body);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn parsed_request(raw: &[u8]) -> HttpRequest {
        use tokio::io::AsyncWriteExt;

        let (mut client, mut server) = tokio::io::duplex(4096);
        client.write_all(raw).await.unwrap();
        drop(client);
        HttpRequest::read(&mut server).await.unwrap()
    }

    #[tokio::test]
    async fn parses_method_path_and_header() {
        let req = parsed_request(b"GET /status HTTP/1.1\r\nHost: x\r\nX-Forwarded-For: 10.0.0.5\r\n\r\n").await;
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/status");
        assert_eq!(req.headers.get("host").unwrap(), "x");
        assert!(req.body.is_empty());
    }

    #[tokio::test]
    async fn parses_content_length_body() {
        let req =
            parsed_request(b"POST /intent HTTP/1.1\r\nContent-Length: 17\r\n\r\n{\"intent\":\"stop\"}").await;
        assert_eq!(req.method, "POST");
        assert_eq!(req.body, b"{\"intent\":\"stop\"}");
    }

    #[test]
    fn json_response_includes_status_and_content_length() {
        let out = json_response(202, "Accepted", &serde_json::json!({"ok": true}));
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 202 Accepted"));
        assert!(text.contains("Content-Type: application/json"));
        assert!(text.contains("{\"ok\":true}"));
    }

    #[test]
    fn error_response_wraps_message() {
        let out = error_response(400, "Bad Request", "unknown intent");
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("unknown intent"));
    }
}
