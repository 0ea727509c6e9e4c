use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::blobs::digest::is_digest_hex;

/// TOML file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./blobgate.toml";

/// Errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("key_sha256 is not set (use --key-sha256, BLOBGATE_KEY_SHA256 or the config file)")]
    MissingCapabilityDigest,

    #[error("key_sha256 must be a 64-character hex SHA-256 digest")]
    InvalidCapabilityDigest,
}

/// Command-line layer. Only flags that were actually passed are serialized,
/// so unset flags never mask the TOML file or the environment.
#[derive(Parser, Serialize, Clone, Debug, Default)]
#[command(name = "blobgate-server", version, about = "Capability-gated blob storage gateway")]
pub struct Cli {
    /// Port to listen on (default: 8787)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Bind address (default: 0.0.0.0)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,

    /// Path to TOML config file (default: ./blobgate.toml)
    #[arg(long)]
    #[serde(skip)]
    pub config: Option<String>,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long)]
    #[serde(skip_serializing_if = "is_false")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    #[serde(skip)]
    pub generate_config: bool,

    /// Print the SHA-256 digest of a capability token (the value for key_sha256) and exit
    #[arg(long, value_name = "TOKEN")]
    #[serde(skip)]
    pub hash_key: Option<String>,

    /// Data directory for the filesystem object store (default: ./data)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,

    /// Hex SHA-256 digest of the capability token that authorizes uploads
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_sha256: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Resolved server configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    pub port: u16,

    pub bind_address: String,

    /// Path of the TOML file the configuration was read from
    #[serde(skip)]
    pub config: String,

    pub json_logs: bool,

    /// Set by `--generate-config`
    #[serde(skip)]
    pub generate_config: bool,

    /// Set by `--hash-key`
    #[serde(skip)]
    pub hash_key: Option<String>,

    pub data_dir: String,

    /// Hex SHA-256 digest of the capability token that authorizes uploads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_sha256: Option<String>,

    /// Object storage configuration (loaded from [storage] section in TOML)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,

    /// Upload rate limiting (loaded from [rate_limit] section in TOML)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitConfig>,
}

/// Which object store backs the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Files under `{data_dir}/objects`
    #[default]
    Fs,
    /// In-process map; contents are lost on restart
    Memory,
}

/// Configuration for the object store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend (default: fs)
    #[serde(default)]
    pub backend: StorageBackend,

    /// Maximum upload size in megabytes (default: 100)
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fs,
            max_upload_size_mb: 100,
        }
    }
}

fn default_max_upload_size() -> u32 {
    100
}

/// Per-IP token bucket on the upload endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Whether uploads are rate limited (default: true)
    #[serde(default = "default_rate_limit_enabled")]
    pub enabled: bool,

    /// Seconds between token replenishments (default: 2)
    #[serde(default = "default_rate_limit_period")]
    pub per_second: u64,

    /// Requests allowed in a burst (default: 20)
    #[serde(default = "default_rate_limit_burst")]
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_second: 2,
            burst_size: 20,
        }
    }
}

fn default_rate_limit_enabled() -> bool {
    true
}

fn default_rate_limit_period() -> u64 {
    2
}

fn default_rate_limit_burst() -> u32 {
    20
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8787,
            bind_address: "0.0.0.0".to_string(),
            config: DEFAULT_CONFIG_PATH.to_string(),
            json_logs: false,
            generate_config: false,
            hash_key: None,
            data_dir: "./data".to_string(),
            key_sha256: None,
            storage: None,
            rate_limit: None,
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (BLOBGATE_*) < CLI args
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_cli(Cli::parse())
    }

    /// Resolve the layers on top of an already parsed command line.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        let generate_config = cli.generate_config;
        let hash_key = cli.hash_key.clone();

        let mut config = Self::figment(&config_path)
            .merge(Serialized::defaults(cli))
            .extract::<Config>()?;
        config.config = config_path;
        config.generate_config = generate_config;
        config.hash_key = hash_key;
        Ok(config)
    }

    /// Every layer except the CLI.
    fn figment(config_path: &str) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("BLOBGATE_"))
    }

    /// The validated capability digest, lowercased.
    pub fn capability_digest(&self) -> Result<String, ConfigError> {
        let digest = self
            .key_sha256
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or(ConfigError::MissingCapabilityDigest)?;

        if !is_digest_hex(digest) {
            return Err(ConfigError::InvalidCapabilityDigest);
        }
        Ok(digest.to_ascii_lowercase())
    }

    pub fn storage(&self) -> StorageConfig {
        self.storage.clone().unwrap_or_default()
    }

    /// Effective upload rate limit; `None` when disabled.
    pub fn upload_rate_limit(&self) -> Option<RateLimitConfig> {
        Some(self.rate_limit.clone().unwrap_or_default()).filter(|limit| limit.enabled)
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# blobgate Server Configuration
# Place this file at ./blobgate.toml or specify with --config <path>
# All settings can be overridden via environment variables (BLOBGATE_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 8787)
# port = 8787

# Bind address (default: 0.0.0.0, all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for the filesystem object store
# data_dir = "./data"

# SHA-256 (hex) of the capability token that authorizes uploads. Required.
# Generate with: blobgate-server --hash-key '<token>'
# key_sha256 = ""

# ---- Object Storage ----
# [storage]

# Backend: "fs" (files under data_dir/objects) or "memory" (lost on restart)
# backend = "fs"

# Maximum upload size in megabytes (default: 100)
# max_upload_size_mb = 100

# ---- Upload Rate Limiting (per client IP) ----
# [rate_limit]
# enabled = true
# per_second = 2   # one request replenished every 2 seconds
# burst_size = 20
"#
    .to_string()
}
