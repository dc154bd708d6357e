// Adapter defaults and configuration layering.
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::sync::OnceLock;
use std::time::Duration;

/// Backend address used when the caller leaves `endpoint` empty.
pub const DEFAULT_ENDPOINT: &str = "bridge.padlink.io:6878";
/// Shared community token used when the caller leaves `token` empty.
pub const DEFAULT_TOKEN: &str = "padlink-community";

pub(crate) const DEFAULT_HEARTBEAT_MS: u64 = 3_000;

/// Hard safety cap for any single wire frame.
///
/// Rationale: the receive path allocates a buffer sized by the frame header's
/// declared length, so an unchecked length from a buggy or malicious backend
/// could trigger OOM. Override with `PADLINK_MAX_FRAME_BYTES`.
pub(crate) const DEFAULT_MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

#[derive(Clone)]
pub struct PuppetConfig {
    /// TLS configuration for the QUIC dial; the caller owns the root store.
    pub tls: quinn::ClientConfig,
    /// Backend address as `host:port`. Empty means the built-in default.
    pub endpoint: String,
    /// TLS server name. Empty means the host part of `endpoint`.
    pub server_name: String,
    /// Auth token sent in the event-stream init. Empty means the default.
    pub token: String,
    pub heartbeat_interval: Duration,
    pub max_frame_bytes: usize,
}

#[derive(Clone)]
pub(crate) struct RuntimeConfig {
    pub(crate) max_frame_bytes: usize,
}

static RUNTIME_CONFIG: OnceLock<RuntimeConfig> = OnceLock::new();

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
struct ConfigOverride {
    endpoint: Option<String>,
    server_name: Option<String>,
    token: Option<String>,
    heartbeat_ms: Option<u64>,
    max_frame_bytes: Option<usize>,
}

impl PuppetConfig {
    /// Built-in defaults with the given TLS setup.
    pub fn defaults(tls: quinn::ClientConfig) -> Self {
        Self {
            tls,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            server_name: String::new(),
            token: DEFAULT_TOKEN.to_string(),
            heartbeat_interval: Duration::from_millis(DEFAULT_HEARTBEAT_MS),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }

    /// Defaults, then `PADLINK_*` environment variables, then an optional
    /// YAML override file (`config_path`, or `PADLINK_CONFIG` when unset).
    pub fn from_env_or_yaml(
        tls: quinn::ClientConfig,
        config_path: Option<&str>,
    ) -> Result<Self> {
        let mut config = Self::from_env(tls);
        let override_path = config_path
            .map(|value| value.to_string())
            .or_else(|| std::env::var("PADLINK_CONFIG").ok());
        let contents = match override_path.as_deref() {
            Some(path) => match fs::read_to_string(path) {
                Ok(contents) => Some(contents),
                Err(err) => {
                    return Err(err).with_context(|| format!("read puppet config: {path}"));
                }
            },
            None => None,
        };
        if let Some(contents) = contents {
            let override_cfg: ConfigOverride =
                serde_yaml::from_str(&contents).context("parse puppet config yaml")?;
            override_cfg.apply(&mut config);
        }
        Ok(config)
    }

    fn from_env(tls: quinn::ClientConfig) -> Self {
        let mut config = Self::defaults(tls);
        if let Some(value) = read_string_env("PADLINK_ENDPOINT") {
            config.endpoint = value;
        }
        if let Some(value) = read_string_env("PADLINK_SERVER_NAME") {
            config.server_name = value;
        }
        if let Some(value) = read_string_env("PADLINK_TOKEN") {
            config.token = value;
        }
        if let Some(value) = read_u64_env("PADLINK_HEARTBEAT_MS") {
            config.heartbeat_interval = Duration::from_millis(value);
        }
        if let Some(value) = read_usize_env("PADLINK_MAX_FRAME_BYTES") {
            config.max_frame_bytes = value;
        }
        config
    }

    /// Fill empty fields with their fallbacks. Called once at construction.
    pub(crate) fn fill_fallbacks(&mut self) {
        if self.endpoint.is_empty() {
            self.endpoint = DEFAULT_ENDPOINT.to_string();
        }
        if self.token.is_empty() {
            self.token = DEFAULT_TOKEN.to_string();
        }
        if self.server_name.is_empty() {
            self.server_name = self
                .endpoint
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| self.endpoint.clone());
        }
    }

    pub(crate) fn install(&self) {
        let _ = RUNTIME_CONFIG.set(RuntimeConfig {
            max_frame_bytes: self.max_frame_bytes,
        });
    }
}

impl ConfigOverride {
    fn apply(&self, config: &mut PuppetConfig) {
        // Empty / zero override values are ignored, same as unset env vars.
        if let Some(value) = &self.endpoint
            && !value.is_empty()
        {
            config.endpoint = value.clone();
        }
        if let Some(value) = &self.server_name
            && !value.is_empty()
        {
            config.server_name = value.clone();
        }
        if let Some(value) = &self.token
            && !value.is_empty()
        {
            config.token = value.clone();
        }
        if let Some(value) = self.heartbeat_ms
            && value > 0
        {
            config.heartbeat_interval = Duration::from_millis(value);
        }
        if let Some(value) = self.max_frame_bytes
            && value > 0
        {
            config.max_frame_bytes = value;
        }
    }
}

pub(crate) fn runtime_config() -> &'static RuntimeConfig {
    RUNTIME_CONFIG.get_or_init(|| RuntimeConfig {
        max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
    })
}

fn read_string_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn read_u64_env(key: &str) -> Option<u64> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
}

fn read_usize_env(key: &str) -> Option<usize> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
}
