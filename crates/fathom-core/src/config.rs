//! Configuration loading: a TOML file with every key optional, merged onto
//! built-in defaults. Mirrors the input/merged-default split used for
//! layered configuration elsewhere in this codebase.

use serde::Deserialize;

use crate::error::FathomError;

/// Fully-populated configuration consumed by every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bitrate_initial_kbps: i32,
    pub probe_channel_port: u16,
    pub control_addr: String,
    pub trace_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bitrate_initial_kbps: 1000,
            probe_channel_port: 8556,
            control_addr: "127.0.0.1:7878".to_string(),
            trace_path: None,
        }
    }
}

/// Raw deserialization target: every field optional, absent keys simply
/// leave the corresponding [`Config`] field at its default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ConfigInput {
    pub bitrate_initial: Option<i32>,
    pub probe_channel_port: Option<u16>,
    pub control_addr: Option<String>,
    pub trace_path: Option<String>,
}

impl ConfigInput {
    pub fn merge_onto(self, mut base: Config) -> Config {
        if let Some(v) = self.bitrate_initial {
            base.bitrate_initial_kbps = v;
        }
        if let Some(v) = self.probe_channel_port {
            base.probe_channel_port = v;
        }
        if let Some(v) = self.control_addr {
            base.control_addr = v;
        }
        if self.trace_path.is_some() {
            base.trace_path = self.trace_path;
        }
        base
    }
}

impl Config {
    /// Load configuration from a TOML file, merged onto defaults. A missing
    /// file is not an error — callers that want an explicit `--config` path
    /// to be mandatory should check existence before calling this.
    pub fn load_from_str(raw: &str) -> Result<Config, FathomError> {
        let input: ConfigInput = toml::from_str(raw)?;
        Ok(input.merge_onto(Config::default()))
    }

    pub fn load_from_path(path: &std::path::Path) -> Result<Config, FathomError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| FathomError::ConfigRead(format!("{}: {e}", path.display())))?;
        Self::load_from_str(&raw)
    }
}
