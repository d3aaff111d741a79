//! [`BuildInfo`] – the version banner served by `GET /health`.

use serde::{Deserialize, Serialize};

/// Static build metadata, baked in at compile time from `CARGO_PKG_*` and
/// reported verbatim on every `/health` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub version: String,
    pub name: String,
}

impl BuildInfo {
    /// Reads the calling crate's own package metadata. Intended to be
    /// called from `robocore-cli`/`robocore-remote` with their own
    /// `env!(...)` values, since `CARGO_PKG_*` resolves per-crate.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_name_and_version_verbatim() {
        let info = BuildInfo::new("robocore", "0.1.0");
        assert_eq!(info.name, "robocore");
        assert_eq!(info.version, "0.1.0");
    }

    #[test]
    fn serializes_as_flat_json_object() {
        let info = BuildInfo::new("robocore", "0.1.0");
        let json = serde_json::to_string(&info).unwrap();
        assert_eq!(json, "{\"version\":\"0.1.0\",\"name\":\"robocore\"}");
    }
}
