//! [`run`] – the motor bridge's top-level supervised loop.
//!
//! Three cooperating tasks per session: a bus-subscriber task that feeds
//! the latest `nav.command` into a bounded, depth-1 write queue (newest
//! wins: a pending command not yet picked up by the writer is dropped
//! with a warning when a newer one arrives), a writer task that
//! safety-checks and writes the current command to the port, and a
//! reader task that parses telemetry lines and republishes them
//! upstream. On any port I/O error the whole session ends, is logged,
//! and is retried after a backoff — the process itself never exits
//! (spec §4.3).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Notify;

use robocore_bus::Channel;
use robocore_safety::{BridgeForwardSafetyRule, SafetyGate};
use robocore_types::{Direction, Envelope, NavCommand, RobocoreError, SensorFrame, Topic};

use crate::protocol::{self, TelemetryLine};
use crate::serial_port::SerialPort;

/// Tunables for the bridge, sourced from the `nav.*` / `safety.*`
/// configuration surface (spec §6).
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub device: String,
    pub baud_rate: u32,
    pub stop_threshold_cm: i32,
    pub warning_threshold_cm: i32,
    pub sensor_freshness: Duration,
    pub reconnect_backoff: Duration,
    /// Overrides of `direction.uart_token()` (spec §6 `nav.commands`). A
    /// direction absent from this map is encoded with its built-in token.
    pub command_tokens: HashMap<Direction, String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            stop_threshold_cm: 10,
            warning_threshold_cm: 20,
            sensor_freshness: Duration::from_secs(2),
            reconnect_backoff: Duration::from_secs(2),
            command_tokens: HashMap::new(),
        }
    }
}

type SensorCache = Arc<Mutex<Option<(SensorFrame, Instant)>>>;

/// A bounded, depth-1 write queue for pending `nav.command`s (spec §4.3
/// "concurrency"). Pushing a new command while one is already pending
/// drops the pending one — the newest direction is always the correct
/// one to act on — and logs a warning.
#[derive(Default)]
struct CommandQueue {
    pending: Mutex<Option<NavCommand>>,
    closed: Mutex<bool>,
    notify: Notify,
}

impl CommandQueue {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, cmd: NavCommand) {
        let dropped = self.pending.lock().unwrap().replace(cmd).is_some();
        if dropped {
            tracing::warn!("write queue full, dropping oldest pending nav.command (newest wins)");
        }
        self.notify.notify_one();
    }

    /// Signals the feeding side is done; a pending pop with nothing left
    /// queued resolves to `None` instead of blocking forever.
    fn close(&self) {
        *self.closed.lock().unwrap() = true;
        self.notify.notify_one();
    }

    /// Waits for and removes the pending command. Returns `None` once
    /// the queue has been closed with nothing left pending.
    async fn pop(&self) -> Option<NavCommand> {
        loop {
            let notified = self.notify.notified();
            if let Some(cmd) = self.pending.lock().unwrap().take() {
                return Some(cmd);
            }
            if *self.closed.lock().unwrap() {
                return None;
            }
            notified.await;
        }
    }
}

/// Opens the physical port and runs the bridge forever, reconnecting on
/// failure. Never returns under normal operation.
pub async fn run(config: BridgeConfig, upstream: Channel, downstream: Channel) {
    loop {
        match crate::serial_port::open(&config.device, config.baud_rate) {
            Ok(port) => {
                tracing::info!(device = %config.device, "motor bridge serial port opened");
                run_session(port, &config, upstream.clone(), downstream.clone()).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, device = %config.device, "failed to open serial port");
            }
        }
        tokio::time::sleep(config.reconnect_backoff).await;
    }
}

/// Runs one session against an already-open port until it errors out.
async fn run_session(
    port: impl SerialPort + 'static,
    config: &BridgeConfig,
    upstream: Channel,
    downstream: Channel,
) {
    let (read_half, write_half) = tokio::io::split(port);
    let cache: SensorCache = Arc::new(Mutex::new(None));
    let queue = CommandQueue::new();

    let mut gate = SafetyGate::new();
    gate.add_rule(Box::new(BridgeForwardSafetyRule {
        stop_threshold_cm: config.stop_threshold_cm,
        freshness: config.sensor_freshness,
    }));

    let subscriber_task = {
        let downstream = downstream.clone();
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { feed_commands(downstream, queue).await })
    };

    let writer_task = {
        let upstream = upstream.clone();
        let cache = Arc::clone(&cache);
        let command_tokens = config.command_tokens.clone();
        tokio::spawn(async move {
            write_commands(write_half, queue, gate, upstream, cache, command_tokens).await
        })
    };

    let reader_result = read_telemetry(
        read_half,
        Arc::clone(&cache),
        upstream,
        config.stop_threshold_cm,
        config.warning_threshold_cm,
    )
    .await;

    subscriber_task.abort();
    writer_task.abort();

    if let Err(e) = reader_result {
        tracing::warn!(error = %e, "motor bridge session ended on read error");
    }
}

/// Forwards every `nav.command` envelope into the bounded write queue
/// (spec §4.3 "concurrency"): a command not yet picked up by the writer
/// is dropped in favor of the newest one, with a warning.
async fn feed_commands(downstream: Channel, queue: Arc<CommandQueue>) {
    let mut sub = downstream.subscribe_topic(Topic::NavCommand);
    while let Some(envelope) = sub.recv().await {
        match envelope.parse::<NavCommand>() {
            Ok(cmd) => queue.push(cmd),
            Err(e) => tracing::warn!(error = %e, "malformed nav.command envelope"),
        }
    }
    queue.close();
}

/// Consumes the latest pending command, safety-checks it against the
/// sensor cache, and writes it to the port. Writes are flushed
/// individually so two commands never interleave on the wire (spec I4).
async fn write_commands(
    mut write_half: impl tokio::io::AsyncWrite + Unpin,
    queue: Arc<CommandQueue>,
    gate: SafetyGate,
    upstream: Channel,
    cache: SensorCache,
    command_tokens: HashMap<Direction, String>,
) {
    loop {
        let Some(cmd) = queue.pop().await else {
            return;
        };

        let cached = *cache.lock().unwrap();
        let (frame, age) = match cached {
            Some((frame, at)) => (Some(frame), Some(at.elapsed())),
            None => (None, None),
        };
        if let Err(RobocoreError::SafetyRefusal { reason }) = gate.check(cmd, frame.as_ref(), age) {
            tracing::warn!(reason = %reason, "motor bridge refused command");
            let envelope = Envelope::json(
                Topic::Esp32Blocked,
                &robocore_types::payload::Esp32Blocked { reason },
            );
            if let Ok(envelope) = envelope {
                let _ = upstream.publish(envelope);
            }
            continue;
        }

        let token = command_tokens
            .get(&cmd.direction)
            .map(String::as_str)
            .unwrap_or_else(|| cmd.direction.uart_token());
        let line = protocol::encode_command_token(token);
        if let Err(e) = write_half.write_all(line.as_bytes()).await {
            tracing::warn!(error = %e, "serial write failed");
            return;
        }
        if let Err(e) = write_half.flush().await {
            tracing::warn!(error = %e, "serial flush failed");
            return;
        }
    }
}

/// Reads newline-terminated lines from the port, classifies each one, and
/// republishes telemetry upstream. Returns when the port hits EOF or an
/// I/O error — the caller treats that as the end of the session.
async fn read_telemetry(
    read_half: impl tokio::io::AsyncRead + Unpin,
    cache: SensorCache,
    upstream: Channel,
    stop_threshold_cm: i32,
    warning_threshold_cm: i32,
) -> Result<(), RobocoreError> {
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader
            .read_line(&mut line)
            .await
            .map_err(|e| RobocoreError::Transport(e.to_string()))?;
        if n == 0 {
            return Ok(());
        }
        if line.len() > protocol::MAX_LINE_LEN {
            tracing::warn!(len = line.len(), "discarding oversized telemetry line");
            continue;
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            continue;
        }
        match protocol::parse_line(trimmed) {
            Ok(event) => handle_event(event, &cache, &upstream, stop_threshold_cm, warning_threshold_cm),
            // Schema errors (malformed DATA: fields) are noteworthy and
            // warned on; protocol violations (unknown line prefix) are
            // expected background noise and only logged at debug (spec §7).
            Err(e @ RobocoreError::Schema(_)) => {
                tracing::warn!(error = %e, line = %trimmed, "discarding malformed telemetry line")
            }
            Err(e) => tracing::debug!(error = %e, line = %trimmed, "discarding unparseable line"),
        }
    }
}

fn handle_event(
    event: TelemetryLine,
    cache: &SensorCache,
    upstream: &Channel,
    stop_threshold_cm: i32,
    warning_threshold_cm: i32,
) {
    match event {
        TelemetryLine::Data(raw) => {
            let frame = raw.to_sensor_frame(stop_threshold_cm, warning_threshold_cm);
            *cache.lock().unwrap() = Some((frame, Instant::now()));
            if let Ok(envelope) = Envelope::json(
                Topic::Esp32Raw,
                &robocore_types::payload::Esp32Raw {
                    data: frame,
                    ts: now_ts(),
                },
            ) {
                let _ = upstream.publish(envelope);
            }
        }
        TelemetryLine::AckBlocked { command, reason } => {
            tracing::info!(%command, %reason, "peripheral blocked command");
            if let Ok(envelope) = Envelope::json(
                Topic::Esp32Blocked,
                &robocore_types::payload::Esp32Blocked {
                    reason: format!("{command}: {reason}"),
                },
            ) {
                let _ = upstream.publish(envelope);
            }
        }
        TelemetryLine::AlertCollision { detail } => {
            tracing::warn!(%detail, "collision alert from peripheral");
        }
        TelemetryLine::AckOk { .. }
        | TelemetryLine::ScanStart
        | TelemetryLine::ScanPos { .. }
        | TelemetryLine::ScanBest { .. }
        | TelemetryLine::ScanComplete => {
            tracing::debug!(?event, "telemetry marker received");
        }
    }
}

fn now_ts() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use robocore_types::Direction;
    use tokio::time::{timeout, Duration as TokioDuration};

    #[tokio::test]
    async fn write_commands_refuses_forward_with_no_cached_frame() {
        let upstream = Channel::default();
        let mut blocked = upstream.subscribe_topic(Topic::Esp32Blocked);

        let (mut client, server) = tokio::io::duplex(256);
        let (_read_half, write_half) = tokio::io::split(server);

        let mut gate = SafetyGate::new();
        gate.add_rule(Box::new(BridgeForwardSafetyRule {
            stop_threshold_cm: 10,
            freshness: Duration::from_secs(2),
        }));

        let queue = CommandQueue::new();
        let cache: SensorCache = Arc::new(Mutex::new(None));
        let writer = tokio::spawn(write_commands(
            write_half,
            Arc::clone(&queue),
            gate,
            upstream,
            cache,
            HashMap::new(),
        ));

        queue.push(NavCommand::new(Direction::Forward));

        let got = timeout(TokioDuration::from_millis(200), blocked.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.topic(), Topic::Esp32Blocked);

        queue.close();
        let _ = writer.await;
        drop(client);
    }

    #[tokio::test]
    async fn write_commands_writes_stop_directly() {
        let upstream = Channel::default();
        let (mut client, server) = tokio::io::duplex(256);
        let (_read_half, write_half) = tokio::io::split(server);

        let mut gate = SafetyGate::new();
        gate.add_rule(Box::new(BridgeForwardSafetyRule {
            stop_threshold_cm: 10,
            freshness: Duration::from_secs(2),
        }));

        let queue = CommandQueue::new();
        let cache: SensorCache = Arc::new(Mutex::new(None));
        let writer = tokio::spawn(write_commands(
            write_half,
            Arc::clone(&queue),
            gate,
            upstream,
            cache,
            HashMap::new(),
        ));

        queue.push(NavCommand::new(Direction::Stop));

        let mut buf = [0u8; 16];
        let n = timeout(TokioDuration::from_millis(200), tokio::io::AsyncReadExt::read(&mut client, &mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], b"STOP\n");

        queue.close();
        let _ = writer.await;
    }

    #[tokio::test]
    async fn write_commands_honors_command_token_override() {
        let upstream = Channel::default();
        let (mut client, server) = tokio::io::duplex(256);
        let (_read_half, write_half) = tokio::io::split(server);

        let gate = SafetyGate::new();
        let queue = CommandQueue::new();
        let cache: SensorCache = Arc::new(Mutex::new(None));
        let mut overrides = HashMap::new();
        overrides.insert(Direction::Scan, "SWEEP".to_string());
        let writer = tokio::spawn(write_commands(
            write_half,
            Arc::clone(&queue),
            gate,
            upstream,
            cache,
            overrides,
        ));

        queue.push(NavCommand::new(Direction::Scan));

        let mut buf = [0u8; 16];
        let n = timeout(TokioDuration::from_millis(200), tokio::io::AsyncReadExt::read(&mut client, &mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], b"SWEEP\n");

        queue.close();
        let _ = writer.await;
    }

    #[tokio::test]
    async fn pushing_a_second_command_before_consumption_drops_the_first() {
        let queue = CommandQueue::new();
        queue.push(NavCommand::new(Direction::Forward));
        queue.push(NavCommand::new(Direction::Stop));

        let popped = queue.pop().await.unwrap();
        assert_eq!(popped.direction, Direction::Stop, "newest pending command wins");

        queue.close();
        assert!(queue.pop().await.is_none());
    }
}
