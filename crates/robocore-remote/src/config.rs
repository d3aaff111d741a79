//! [`RemoteConfig`] – tunables sourced from the `remote_interface.*`
//! configuration surface (spec §6).

use std::net::IpAddr;
use std::time::Duration;

use ipnet::IpNet;

/// Default MJPEG sender frame rate (spec §4.4 "default 10 fps").
pub const DEFAULT_MJPEG_FPS: u32 = 10;

/// Default idle-session timeout before `remote.session{active:false}` is
/// published (spec §4.4 names the mechanism but not a default; chosen here).
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(300);

/// Interval on which the session-expiry background task wakes (spec §4.4
/// "a background task checks every 10 s").
pub const SESSION_CHECK_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    pub mjpeg_fps: u32,
    pub session_timeout: Duration,
    pub allowed_cidrs: Vec<IpNet>,
}

impl RemoteConfig {
    /// `true` when `addr` falls inside any configured CIDR block.
    pub fn permits(&self, addr: IpAddr) -> bool {
        self.allowed_cidrs.iter().any(|net| net.contains(&addr))
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            mjpeg_fps: DEFAULT_MJPEG_FPS,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            // Loopback plus a private VPN-style range (spec §4.4 "default
            // includes loopback and a private VPN range"); an operator
            // deploying behind a real VPN overrides this in config.
            allowed_cidrs: vec![
                "127.0.0.1/8".parse().unwrap(),
                "::1/128".parse().unwrap(),
                "10.0.0.0/8".parse().unwrap(),
            ],
        }
    }
}
