//! Configuration loading and validation.
//!
//! The dispatcher reads a single human-owned `config.toml`. A legacy
//! `config.json` with flat uppercase keys is also accepted so existing
//! deployments keep working.
//!
//! Precedence: env vars > config file > defaults.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "MESH_COMMANDER_CONFIG";

/// Environment variable that overrides `transport.host`.
pub const HOST_ENV: &str = "MESH_COMMANDER_HOST";

/// Environment variable that overrides `transport.port`.
pub const PORT_ENV: &str = "MESH_COMMANDER_PORT";

/// Environment variable that overrides `dispatch.channel_slot`.
pub const CHANNEL_SLOT_ENV: &str = "MESH_COMMANDER_CHANNEL_SLOT";

/// Commented starter config written by `mesh-commander init`.
pub const EXAMPLE_CONFIG: &str = r#"# mesh-commander configuration

[transport]
# Address of the mesh bridge.
host = "192.168.1.50"
port = 4403

[dispatch]
# Only messages on this channel slot are considered.
channel_slot = 0
# Messages older than this are dropped.
max_msg_age_secs = 300
# Everything received this soon after startup is ignored.
startup_grace_secs = 10
# Replies are split into chunks of at most this many bytes.
chunk_size = 200

[actions]
# keyword = "/path/to/executable"
# weather = "/opt/mesh/weather.sh"
"#;

/// Errors produced while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config at {path}: {source}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The config file is not valid TOML or JSON for the expected layout.
    #[error("failed to parse config: {0}")]
    Parse(String),
    /// An environment override holds a value of the wrong type.
    #[error("invalid value {value:?} for {key}")]
    InvalidOverride {
        /// Environment variable name.
        key: &'static str,
        /// Raw value found in the environment.
        value: String,
    },
    /// The config parsed but violates a constraint.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// On-disk format of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// Sectioned TOML layout.
    Toml,
    /// Legacy flat JSON layout with uppercase keys.
    LegacyJson,
}

impl ConfigFormat {
    /// Pick the format from a file extension. Anything but `.json` is TOML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::LegacyJson,
            _ => Self::Toml,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Mesh bridge connection settings.
    pub transport: TransportConfig,

    /// Admission and reply settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Keyword to executable mapping.
    #[serde(default)]
    pub actions: BTreeMap<String, PathBuf>,
}

/// Mesh bridge connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Hostname or IP address of the bridge.
    pub host: String,

    /// TCP port of the bridge.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Admission and reply settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Channel slot that commands are accepted on and replies are sent to.
    #[serde(default)]
    pub channel_slot: u32,

    /// Maximum tolerated message age in seconds.
    #[serde(default = "default_max_msg_age_secs")]
    pub max_msg_age_secs: u64,

    /// Startup grace period in seconds.
    #[serde(default = "default_startup_grace_secs")]
    pub startup_grace_secs: u64,

    /// Maximum outbound chunk size in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            channel_slot: 0,
            max_msg_age_secs: default_max_msg_age_secs(),
            startup_grace_secs: default_startup_grace_secs(),
            chunk_size: default_chunk_size(),
        }
    }
}

// Default value functions for serde

fn default_port() -> u16 {
    4403
}
fn default_max_msg_age_secs() -> u64 {
    300
}
fn default_startup_grace_secs() -> u64 {
    10
}
fn default_chunk_size() -> usize {
    200
}

/// Legacy flat JSON layout.
#[derive(Debug, Deserialize)]
struct LegacyConfig {
    #[serde(rename = "MESH_NODE_IP")]
    mesh_node_ip: String,
    #[serde(rename = "CHANNEL_SLOT", default)]
    channel_slot: u32,
    #[serde(rename = "KEYWORDS_TO_SCRIPTS", default)]
    keywords_to_scripts: BTreeMap<String, PathBuf>,
    #[serde(rename = "MAX_MSG_AGE_SEC", default = "default_max_msg_age_secs")]
    max_msg_age_sec: u64,
    #[serde(rename = "STARTUP_GRACE_SEC", default = "default_startup_grace_secs")]
    startup_grace_sec: u64,
    #[serde(rename = "CHUNK_SIZE", default = "default_chunk_size")]
    chunk_size: usize,
}

impl From<LegacyConfig> for Config {
    fn from(legacy: LegacyConfig) -> Self {
        Self {
            transport: TransportConfig {
                host: legacy.mesh_node_ip,
                port: default_port(),
            },
            dispatch: DispatchConfig {
                channel_slot: legacy.channel_slot,
                max_msg_age_secs: legacy.max_msg_age_sec,
                startup_grace_secs: legacy.startup_grace_sec,
                chunk_size: legacy.chunk_size,
            },
            actions: legacy.keywords_to_scripts,
        }
    }
}

impl Config {
    /// Apply environment variable overrides (env > config > defaults).
    ///
    /// Takes a resolver function for testability.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] when a numeric override does not parse.
    pub fn apply_overrides(
        &mut self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = env(HOST_ENV) {
            self.transport.host = host;
        }
        if let Some(port) = env(PORT_ENV) {
            self.transport.port = port.trim().parse().map_err(|_| ConfigError::InvalidOverride {
                key: PORT_ENV,
                value: port.clone(),
            })?;
        }
        if let Some(slot) = env(CHANNEL_SLOT_ENV) {
            self.dispatch.channel_slot =
                slot.trim().parse().map_err(|_| ConfigError::InvalidOverride {
                    key: CHANNEL_SLOT_ENV,
                    value: slot.clone(),
                })?;
        }
        Ok(())
    }

    /// Check constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transport.host.trim().is_empty() {
            return Err(ConfigError::Invalid("transport.host is empty".to_owned()));
        }
        if self.dispatch.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.chunk_size must be greater than zero".to_owned(),
            ));
        }

        let mut seen = HashSet::new();
        for keyword in self.actions.keys() {
            if keyword.is_empty() || keyword.chars().any(char::is_whitespace) {
                return Err(ConfigError::Invalid(format!(
                    "action keyword {keyword:?} must be a single non-empty word"
                )));
            }
            if !seen.insert(keyword.to_lowercase()) {
                return Err(ConfigError::Invalid(format!(
                    "action keyword {keyword:?} is defined more than once (case-insensitive)"
                )));
            }
        }
        Ok(())
    }
}

/// Parse config text in the given format without validation.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] when the text does not match the layout.
pub fn parse_config(contents: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    match format {
        ConfigFormat::Toml => {
            toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
        }
        ConfigFormat::LegacyJson => serde_json::from_str::<LegacyConfig>(contents)
            .map(Config::from)
            .map_err(|e| ConfigError::Parse(e.to_string())),
    }
}

/// Load, override from the process environment, and validate a config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or validated.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    load_config_with(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with a custom env resolver.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or validated.
pub fn load_config_with(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = parse_config(&contents, ConfigFormat::from_path(path))?;
    config.apply_overrides(env)?;
    config.validate()?;
    tracing::debug!(path = %path.display(), actions = config.actions.len(), "config loaded");
    Ok(config)
}

/// Resolve the default config directory (`~/.mesh-commander/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".mesh-commander"))
}

/// Resolve the config file path: explicit flag, then env var, then default.
///
/// # Errors
///
/// Returns an error if no path is given and the home directory is unknown.
pub fn resolve_config_path(
    explicit: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    if let Some(path) = env(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }
    Ok(config_dir()?.join("config.toml"))
}
