//! The UART wire protocol: command encoding and telemetry line parsing
//! (spec §4.3, §6).

use robocore_types::{Direction, RobocoreError, SensorFrame};

/// Maximum accepted line length. A line exceeding this is discarded with a
/// warning rather than grown without bound (spec §4.3 "partial reads").
pub const MAX_LINE_LEN: usize = 512;

/// Encodes a direction as the `TOKEN\n` line written to the port, using
/// `direction`'s built-in UART token.
pub fn encode_command(direction: Direction) -> String {
    format!("{}\n", direction.uart_token())
}

/// Encodes a direction as `TOKEN\n` using an explicit `token`, for
/// deployments that override the default `direction -> token` table via
/// `nav.commands` (spec §6).
pub fn encode_command_token(token: &str) -> String {
    format!("{token}\n")
}

/// The raw fields of one `DATA:` telemetry line, preserved verbatim so
/// that [`encode_data_line`] can reproduce the original line (spec L1).
/// `servo`, `obstacle`, and `warning` are the peripheral's own readings;
/// the bridge's [`SensorFrame`] recomputes `obstacle`/`warning` from the
/// distance readings against its own configured thresholds rather than
/// trusting the peripheral's assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTelemetry {
    pub s1: i32,
    pub s2: i32,
    pub s3: i32,
    pub mq2: i32,
    pub servo: i32,
    pub lmotor: i32,
    pub rmotor: i32,
    pub obstacle: i32,
    pub warning: i32,
}

impl RawTelemetry {
    /// Projects the raw wire fields down to a [`SensorFrame`], recomputing
    /// the derived `obstacle`/`warning`/`min_distance` fields locally.
    pub fn to_sensor_frame(self, stop_threshold_cm: i32, warning_threshold_cm: i32) -> SensorFrame {
        SensorFrame::new(
            self.s1,
            self.s2,
            self.s3,
            self.mq2,
            self.lmotor,
            self.rmotor,
            stop_threshold_cm,
            warning_threshold_cm,
        )
    }
}

/// One classified line from the peripheral (spec §4.3's prefix table).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryLine {
    Data(RawTelemetry),
    AckOk { command: String },
    AckBlocked { command: String, reason: String },
    AlertCollision { detail: String },
    ScanStart,
    ScanPos { raw: String },
    ScanBest { raw: String },
    ScanComplete,
}

/// Reconstructs the original `DATA:` line from its parsed fields.
pub fn encode_data_line(raw: &RawTelemetry) -> String {
    format!(
        "DATA:S1:{},S2:{},S3:{},MQ2:{},SERVO:{},LMOTOR:{},RMOTOR:{},OBSTACLE:{},WARNING:{}",
        raw.s1, raw.s2, raw.s3, raw.mq2, raw.servo, raw.lmotor, raw.rmotor, raw.obstacle, raw.warning
    )
}

/// Classifies and parses one line (without its trailing newline or `\r`).
/// Unknown prefixes and malformed `DATA:` lines are
/// [`RobocoreError::Protocol`] / [`RobocoreError::Schema`] respectively —
/// both are logged and discarded by the caller, never propagated.
pub fn parse_line(line: &str) -> Result<TelemetryLine, RobocoreError> {
    if let Some(rest) = line.strip_prefix("DATA:") {
        return parse_data_fields(rest).map(TelemetryLine::Data);
    }
    if let Some(rest) = line.strip_prefix("ACK:") {
        return parse_ack(rest);
    }
    if let Some(detail) = line.strip_prefix("ALERT:COLLISION:") {
        return Ok(TelemetryLine::AlertCollision {
            detail: detail.to_string(),
        });
    }
    if line == "SCAN:START" {
        return Ok(TelemetryLine::ScanStart);
    }
    if let Some(raw) = line.strip_prefix("SCAN:POS:") {
        return Ok(TelemetryLine::ScanPos {
            raw: raw.to_string(),
        });
    }
    if let Some(raw) = line.strip_prefix("SCAN:BEST:") {
        return Ok(TelemetryLine::ScanBest {
            raw: raw.to_string(),
        });
    }
    if line == "SCAN:COMPLETE" {
        return Ok(TelemetryLine::ScanComplete);
    }
    Err(RobocoreError::Protocol(format!("unknown line prefix: {line}")))
}

fn parse_ack(rest: &str) -> Result<TelemetryLine, RobocoreError> {
    if let Some(command) = rest.strip_suffix(":OK") {
        return Ok(TelemetryLine::AckOk {
            command: command.to_string(),
        });
    }
    if let Some(idx) = rest.find(":BLOCKED:") {
        let command = &rest[..idx];
        let reason = &rest[idx + ":BLOCKED:".len()..];
        return Ok(TelemetryLine::AckBlocked {
            command: command.to_string(),
            reason: reason.to_string(),
        });
    }
    Err(RobocoreError::Protocol(format!("malformed ACK line: ACK:{rest}")))
}

fn parse_data_fields(rest: &str) -> Result<RawTelemetry, RobocoreError> {
    let mut s1 = None;
    let mut s2 = None;
    let mut s3 = None;
    let mut mq2 = None;
    let mut servo = None;
    let mut lmotor = None;
    let mut rmotor = None;
    let mut obstacle = None;
    let mut warning = None;

    for field in rest.split(',') {
        let (key, value) = field
            .split_once(':')
            .ok_or_else(|| RobocoreError::Schema(format!("malformed DATA field: {field}")))?;
        let parsed: i32 = value
            .parse()
            .map_err(|_| RobocoreError::Schema(format!("non-integer value in field: {field}")))?;
        match key {
            "S1" => s1 = Some(parsed),
            "S2" => s2 = Some(parsed),
            "S3" => s3 = Some(parsed),
            "MQ2" => mq2 = Some(parsed),
            "SERVO" => servo = Some(parsed),
            "LMOTOR" => lmotor = Some(parsed),
            "RMOTOR" => rmotor = Some(parsed),
            "OBSTACLE" => obstacle = Some(parsed),
            "WARNING" => warning = Some(parsed),
            other => {
                return Err(RobocoreError::Schema(format!("unknown DATA key: {other}")));
            }
        }
    }

    Ok(RawTelemetry {
        s1: s1.ok_or_else(|| RobocoreError::Schema("DATA line missing S1".to_string()))?,
        s2: s2.ok_or_else(|| RobocoreError::Schema("DATA line missing S2".to_string()))?,
        s3: s3.ok_or_else(|| RobocoreError::Schema("DATA line missing S3".to_string()))?,
        mq2: mq2.ok_or_else(|| RobocoreError::Schema("DATA line missing MQ2".to_string()))?,
        servo: servo.ok_or_else(|| RobocoreError::Schema("DATA line missing SERVO".to_string()))?,
        lmotor: lmotor
            .ok_or_else(|| RobocoreError::Schema("DATA line missing LMOTOR".to_string()))?,
        rmotor: rmotor
            .ok_or_else(|| RobocoreError::Schema("DATA line missing RMOTOR".to_string()))?,
        obstacle: obstacle
            .ok_or_else(|| RobocoreError::Schema("DATA line missing OBSTACLE".to_string()))?,
        warning: warning
            .ok_or_else(|| RobocoreError::Schema("DATA line missing WARNING".to_string()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str =
        "DATA:S1:30,S2:45,S3:-1,MQ2:120,SERVO:90,LMOTOR:80,RMOTOR:80,OBSTACLE:0,WARNING:0";

    #[test]
    fn encode_command_appends_newline() {
        assert_eq!(encode_command(Direction::Forward), "FORWARD\n");
        assert_eq!(encode_command(Direction::Scan), "SCAN\n");
    }

    #[test]
    fn data_line_round_trips_through_encode() {
        let parsed = parse_line(WELL_FORMED).unwrap();
        let TelemetryLine::Data(raw) = parsed else {
            panic!("expected Data variant");
        };
        assert_eq!(encode_data_line(&raw), WELL_FORMED);
    }

    #[test]
    fn data_line_projects_to_sensor_frame_with_local_thresholds() {
        let TelemetryLine::Data(raw) = parse_line(WELL_FORMED).unwrap() else {
            panic!("expected Data variant");
        };
        let frame = raw.to_sensor_frame(10, 20);
        assert_eq!(frame.min_distance, 30);
        assert!(!frame.obstacle);
    }

    #[test]
    fn non_integer_distance_is_a_schema_error() {
        let line = "DATA:S1:NaN,S2:12,S3:30,MQ2:0,SERVO:0,LMOTOR:0,RMOTOR:0,OBSTACLE:0,WARNING:0";
        let result = parse_line(line);
        assert!(matches!(result, Err(RobocoreError::Schema(_))));
    }

    #[test]
    fn missing_required_field_is_a_schema_error() {
        let line = "DATA:S1:10,S2:20,S3:30";
        let result = parse_line(line);
        assert!(matches!(result, Err(RobocoreError::Schema(_))));
    }

    #[test]
    fn ack_ok_is_parsed() {
        let result = parse_line("ACK:FORWARD:OK").unwrap();
        assert_eq!(
            result,
            TelemetryLine::AckOk {
                command: "FORWARD".to_string()
            }
        );
    }

    #[test]
    fn ack_blocked_carries_reason() {
        let result = parse_line("ACK:FORWARD:BLOCKED:OBSTACLE_DETECTED").unwrap();
        assert_eq!(
            result,
            TelemetryLine::AckBlocked {
                command: "FORWARD".to_string(),
                reason: "OBSTACLE_DETECTED".to_string(),
            }
        );
    }

    #[test]
    fn collision_alert_carries_detail() {
        let result = parse_line("ALERT:COLLISION:FRONT_BUMPER").unwrap();
        assert_eq!(
            result,
            TelemetryLine::AlertCollision {
                detail: "FRONT_BUMPER".to_string()
            }
        );
    }

    #[test]
    fn scan_sequence_markers_are_recognized() {
        assert_eq!(parse_line("SCAN:START").unwrap(), TelemetryLine::ScanStart);
        assert_eq!(parse_line("SCAN:COMPLETE").unwrap(), TelemetryLine::ScanComplete);
        assert!(matches!(
            parse_line("SCAN:POS:45,S1:30,S2:40,S3:50").unwrap(),
            TelemetryLine::ScanPos { .. }
        ));
        assert!(matches!(
            parse_line("SCAN:BEST:90,DIST:120").unwrap(),
            TelemetryLine::ScanBest { .. }
        ));
    }

    #[test]
    fn unknown_prefix_is_a_protocol_violation() {
        let result = parse_line("FOOBAR:1,2,3");
        assert!(matches!(result, Err(RobocoreError::Protocol(_))));
    }
}
