//! Configuration Vault – reads/writes `~/.robocore/config.toml`.
//!
//! Field names and nesting mirror the configuration surface enumerated in
//! spec §6 (`ipc.*`, `nav.*`, `stt.*`, `orchestrator.*`, `safety.*`,
//! `remote_interface.*`) so the on-disk TOML reads the same as the spec's
//! own option list.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use robocore_motor::BridgeConfig;
use robocore_orchestrator::config::OrchestratorConfig;
use robocore_remote::RemoteConfig;

/// `ipc.*` — the two TCP endpoints the hub binds (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcSection {
    #[serde(default = "default_upstream")]
    pub upstream: String,
    #[serde(default = "default_downstream")]
    pub downstream: String,
}

impl Default for IpcSection {
    fn default() -> Self {
        Self {
            upstream: default_upstream(),
            downstream: default_downstream(),
        }
    }
}

/// `nav.*` — the UART device and its tunables (spec §4.3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavSection {
    #[serde(default = "default_uart_device")]
    pub uart_device: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_reconnect_backoff_secs")]
    pub reconnect_backoff_secs: u64,
    /// `nav.commands` — direction -> UART token overrides (spec §6). Keys
    /// are lowercase direction names (`"forward"`, `"scan"`, ...); a
    /// direction absent here keeps its built-in token.
    #[serde(default)]
    pub commands: std::collections::HashMap<String, String>,
}

impl Default for NavSection {
    fn default() -> Self {
        Self {
            uart_device: default_uart_device(),
            baud_rate: default_baud_rate(),
            reconnect_backoff_secs: default_reconnect_backoff_secs(),
            commands: std::collections::HashMap::new(),
        }
    }
}

/// `stt.*` — speech-transcription acceptance tunables (spec §4.2, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttSection {
    #[serde(default = "default_stt_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_stt_min_confidence")]
    pub min_confidence: f32,
}

impl Default for SttSection {
    fn default() -> Self {
        Self {
            timeout_seconds: default_stt_timeout_seconds(),
            min_confidence: default_stt_min_confidence(),
        }
    }
}

/// `orchestrator.*` — the remaining phase timeouts (spec §4.2, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorSection {
    #[serde(default = "default_llm_timeout_seconds")]
    pub llm_timeout_seconds: u64,
    #[serde(default = "default_speaking_timeout_seconds")]
    pub speaking_timeout_seconds: u64,
    #[serde(default = "default_error_timeout_seconds")]
    pub error_timeout_seconds: u64,
    #[serde(default = "default_conversation_capacity")]
    pub conversation_capacity: usize,
    #[serde(default = "default_conversation_turn_timeout_secs")]
    pub conversation_turn_timeout_secs: u64,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            llm_timeout_seconds: default_llm_timeout_seconds(),
            speaking_timeout_seconds: default_speaking_timeout_seconds(),
            error_timeout_seconds: default_error_timeout_seconds(),
            conversation_capacity: default_conversation_capacity(),
            conversation_turn_timeout_secs: default_conversation_turn_timeout_secs(),
        }
    }
}

/// `safety.*` — obstacle thresholds shared by the bridge and the
/// orchestrator's pre-check veto (spec §4.2, §4.3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetySection {
    #[serde(default = "default_stop_distance_cm")]
    pub stop_distance_cm: i32,
    #[serde(default = "default_warning_distance_cm")]
    pub warning_distance_cm: i32,
    #[serde(default = "default_sensor_freshness_ms")]
    pub sensor_freshness_ms: u64,
}

impl Default for SafetySection {
    fn default() -> Self {
        Self {
            stop_distance_cm: default_stop_distance_cm(),
            warning_distance_cm: default_warning_distance_cm(),
            sensor_freshness_ms: default_sensor_freshness_ms(),
        }
    }
}

/// `remote_interface.*` — the supervision HTTP surface (spec §4.4, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteInterfaceSection {
    #[serde(default = "default_remote_host")]
    pub host: String,
    #[serde(default = "default_remote_port")]
    pub port: u16,
    #[serde(default = "default_mjpeg_fps")]
    pub mjpeg_fps: u32,
    #[serde(default = "default_session_timeout_sec")]
    pub session_timeout_sec: u64,
    #[serde(default = "default_allowed_cidrs")]
    pub allowed_cidrs: Vec<String>,
}

impl Default for RemoteInterfaceSection {
    fn default() -> Self {
        Self {
            host: default_remote_host(),
            port: default_remote_port(),
            mjpeg_fps: default_mjpeg_fps(),
            session_timeout_sec: default_session_timeout_sec(),
            allowed_cidrs: default_allowed_cidrs(),
        }
    }
}

/// Persisted user configuration stored in `~/.robocore/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ipc: IpcSection,
    #[serde(default)]
    pub nav: NavSection,
    #[serde(default)]
    pub stt: SttSection,
    #[serde(default)]
    pub orchestrator: OrchestratorSection,
    #[serde(default)]
    pub safety: SafetySection,
    #[serde(default)]
    pub remote_interface: RemoteInterfaceSection,
}

impl Config {
    /// Builds the motor bridge's config from the `nav.*` / `safety.*`
    /// sections. Entries in `nav.commands` that don't name a recognized
    /// direction are logged and skipped rather than failing startup.
    pub fn bridge_config(&self) -> BridgeConfig {
        let command_tokens = self
            .nav
            .commands
            .iter()
            .filter_map(|(direction, token)| match robocore_types::payload::parse_direction(direction) {
                Some(d) => Some((d, token.clone())),
                None => {
                    tracing::warn!(direction = %direction, "ignoring unrecognized nav.commands entry");
                    None
                }
            })
            .collect();

        BridgeConfig {
            device: self.nav.uart_device.clone(),
            baud_rate: self.nav.baud_rate,
            stop_threshold_cm: self.safety.stop_distance_cm,
            warning_threshold_cm: self.safety.warning_distance_cm,
            sensor_freshness: Duration::from_millis(self.safety.sensor_freshness_ms),
            reconnect_backoff: Duration::from_secs(self.nav.reconnect_backoff_secs),
            command_tokens,
        }
    }

    /// Builds the orchestrator's config from the `stt.*` / `orchestrator.*`
    /// / `safety.*` sections.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            stt_timeout: Duration::from_secs(self.stt.timeout_seconds),
            stt_min_confidence: self.stt.min_confidence,
            llm_timeout: Duration::from_secs(self.orchestrator.llm_timeout_seconds),
            speaking_timeout: Duration::from_secs(self.orchestrator.speaking_timeout_seconds),
            error_timeout: Duration::from_secs(self.orchestrator.error_timeout_seconds),
            stop_threshold_cm: self.safety.stop_distance_cm,
            warning_threshold_cm: self.safety.warning_distance_cm,
            sensor_freshness: Duration::from_millis(self.safety.sensor_freshness_ms),
            conversation_capacity: self.orchestrator.conversation_capacity,
            conversation_turn_timeout: Duration::from_secs(
                self.orchestrator.conversation_turn_timeout_secs,
            ),
            ..OrchestratorConfig::default()
        }
    }

    /// Builds the supervision HTTP server's config from the
    /// `remote_interface.*` section. Unparsable CIDR entries are logged and
    /// skipped rather than failing startup outright.
    pub fn remote_config(&self) -> RemoteConfig {
        let allowed_cidrs = self
            .remote_interface
            .allowed_cidrs
            .iter()
            .filter_map(|raw| match raw.parse() {
                Ok(net) => Some(net),
                Err(e) => {
                    tracing::warn!(cidr = %raw, error = %e, "ignoring unparsable allowed_cidrs entry");
                    None
                }
            })
            .collect::<Vec<_>>();

        RemoteConfig {
            host: self.remote_interface.host.clone(),
            port: self.remote_interface.port,
            mjpeg_fps: self.remote_interface.mjpeg_fps,
            session_timeout: Duration::from_secs(self.remote_interface.session_timeout_sec),
            allowed_cidrs: if allowed_cidrs.is_empty() {
                RemoteConfig::default().allowed_cidrs
            } else {
                allowed_cidrs
            },
        }
    }
}

fn default_upstream() -> String {
    "127.0.0.1:7401".to_string()
}
fn default_downstream() -> String {
    "127.0.0.1:7402".to_string()
}
fn default_uart_device() -> String {
    "/dev/ttyUSB0".to_string()
}
fn default_baud_rate() -> u32 {
    115_200
}
fn default_reconnect_backoff_secs() -> u64 {
    2
}
fn default_stt_timeout_seconds() -> u64 {
    15
}
fn default_stt_min_confidence() -> f32 {
    0.5
}
fn default_llm_timeout_seconds() -> u64 {
    10
}
fn default_speaking_timeout_seconds() -> u64 {
    30
}
fn default_error_timeout_seconds() -> u64 {
    30
}
fn default_conversation_capacity() -> usize {
    10
}
fn default_conversation_turn_timeout_secs() -> u64 {
    120
}
fn default_stop_distance_cm() -> i32 {
    10
}
fn default_warning_distance_cm() -> i32 {
    20
}
fn default_sensor_freshness_ms() -> u64 {
    2000
}
fn default_remote_host() -> String {
    "0.0.0.0".to_string()
}
fn default_remote_port() -> u16 {
    8080
}
fn default_mjpeg_fps() -> u32 {
    10
}
fn default_session_timeout_sec() -> u64 {
    300
}
fn default_allowed_cidrs() -> Vec<String> {
    vec![
        "127.0.0.1/8".to_string(),
        "::1/128".to_string(),
        "10.0.0.0/8".to_string(),
    ]
}

/// Return the path to `~/.robocore/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
/// Extracted for testability without mutating environment variables.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".robocore").join("config.toml")
}

/// Load the config from disk. Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &PathBuf) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config = toml::from_str(&raw)
        .map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `ROBOCORE_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `ROBOCORE_UART_DEVICE` | `nav.uart_device` |
/// | `ROBOCORE_BAUD_RATE` | `nav.baud_rate` |
/// | `ROBOCORE_UPSTREAM_ADDR` | `ipc.upstream` |
/// | `ROBOCORE_DOWNSTREAM_ADDR` | `ipc.downstream` |
/// | `ROBOCORE_REMOTE_PORT` | `remote_interface.port` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("ROBOCORE_UART_DEVICE") {
        cfg.nav.uart_device = v;
    }
    if let Ok(v) = std::env::var("ROBOCORE_BAUD_RATE")
        && let Ok(baud) = v.parse::<u32>()
    {
        cfg.nav.baud_rate = baud;
    }
    if let Ok(v) = std::env::var("ROBOCORE_UPSTREAM_ADDR") {
        cfg.ipc.upstream = v;
    }
    if let Ok(v) = std::env::var("ROBOCORE_DOWNSTREAM_ADDR") {
        cfg.ipc.downstream = v;
    }
    if let Ok(v) = std::env::var("ROBOCORE_REMOTE_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.remote_interface.port = port;
    }
}

/// Save the config to disk, creating `~/.robocore/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &PathBuf) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        // Restrict the config directory to the owner only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    // Write the file with owner-only read/write (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
