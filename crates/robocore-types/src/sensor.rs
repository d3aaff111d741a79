//! [`SensorFrame`] – the parsed view of one UART `DATA:` telemetry line.

use serde::{Deserialize, Serialize};

/// A parsed telemetry record from the peripheral.
///
/// `-1` in any distance field denotes "no echo". `min_distance`,
/// `obstacle`, and `warning` are derived fields recomputed on construction,
/// never trusted from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorFrame {
    pub s1: i32,
    pub s2: i32,
    pub s3: i32,
    pub mq2: i32,
    pub lmotor: i32,
    pub rmotor: i32,
    pub obstacle: bool,
    pub warning: bool,
    pub min_distance: i32,
    pub is_safe: bool,
}

impl SensorFrame {
    /// Builds a frame from the three raw distance readings and the gas/motor
    /// fields, deriving `min_distance`, `obstacle`, and `warning` per the
    /// configured thresholds (spec §3, §4.3).
    ///
    /// `stop_threshold_cm` and `warning_threshold_cm` are centimeters;
    /// `obstacle` is true at or below the stop threshold, `warning` at or
    /// below the warning threshold.
    pub fn new(
        s1: i32,
        s2: i32,
        s3: i32,
        mq2: i32,
        lmotor: i32,
        rmotor: i32,
        stop_threshold_cm: i32,
        warning_threshold_cm: i32,
    ) -> Self {
        let min_distance = [s1, s2, s3]
            .into_iter()
            .filter(|d| *d >= 0)
            .min()
            .unwrap_or(-1);

        let obstacle = min_distance >= 0 && min_distance <= stop_threshold_cm;
        let warning = min_distance >= 0 && min_distance <= warning_threshold_cm;

        Self {
            s1,
            s2,
            s3,
            mq2,
            lmotor,
            rmotor,
            obstacle,
            warning,
            min_distance,
            is_safe: !obstacle,
        }
    }
}
