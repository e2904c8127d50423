// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: a TOML file deserialized into [`Config`], with
//! `FF_*` environment variables overriding individual fields the way the
//! teacher's `env.rs` centralizes `OJ_*` reads (spec §6's Environment /
//! configuration list).

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

fn default_broker_host() -> String {
    "127.0.0.1".to_string()
}

fn default_broker_port() -> u16 {
    6379
}

fn default_server_port() -> u16 {
    4000
}

fn default_webhook_timeout_ms() -> u64 {
    10_000
}

fn default_webhook_max_attempts() -> u32 {
    3
}

fn default_access_ttl_secs() -> i64 {
    30 * 60
}

fn default_refresh_ttl_secs() -> i64 {
    7 * 24 * 60 * 60
}

fn default_concurrency() -> usize {
    4
}

/// `broker.*`: where the durable WAL lives. `host`/`port`/`password` are
/// carried for parity with spec §6's configuration surface (a networked
/// broker backend); this implementation's `ff-broker::WalBroker` is an
/// embedded file, so only `wal_path` is load-bearing here.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrokerConfig {
    #[serde(default = "default_broker_host")]
    pub host: String,
    #[serde(default = "default_broker_port")]
    pub port: u16,
    pub password: Option<String>,
    pub wal_path: Option<PathBuf>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_broker_host(),
            port: default_broker_port(),
            password: None,
            wal_path: None,
        }
    }
}

/// `secrets.*`: signing material for the opaque access/refresh token scheme
/// `auth.rs` verifies. Issuance of the tokens themselves is an external
/// collaborator (spec §1); this is only the shared secret the issuer and
/// this adapter must agree on.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SecretsConfig {
    pub token_secret: Option<String>,
    pub refresh_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
        }
    }
}

/// `queues.*`: which of the fixed whitelist this instance services, and at
/// what concurrency. `ff_core::QUEUE_WHITELIST` stays the authority on valid
/// names; this only scopes which of them get worker pools spun up.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct QueuesConfig {
    pub allowed: Vec<String>,
    pub concurrency: HashMap<String, usize>,
}

impl QueuesConfig {
    pub fn concurrency_for(&self, queue: &str) -> usize {
        self.concurrency.get(queue).copied().unwrap_or_else(default_concurrency)
    }
}

/// `handlers.*`: manifest directories watched for hot enable/disable, and
/// handlers disabled at startup.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct HandlersConfig {
    pub directories: Vec<PathBuf>,
    pub disabled: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebhookConfig {
    #[serde(default = "default_webhook_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_webhook_max_attempts")]
    pub max_attempts: u32,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_webhook_timeout_ms(),
            max_attempts: default_webhook_max_attempts(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokensConfig {
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: i64,
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: i64,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            access_ttl_secs: default_access_ttl_secs(),
            refresh_ttl_secs: default_refresh_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub broker: BrokerConfig,
    pub secrets: SecretsConfig,
    pub server: ServerConfig,
    pub queues: QueuesConfig,
    pub handlers: HandlersConfig,
    pub webhook: WebhookConfig,
    pub tokens: TokensConfig,
    /// Directory snapshots/WAL/logs live under when not overridden per-field.
    pub state_dir: Option<PathBuf>,
}

impl Config {
    /// Load from `path` if it exists, else start from defaults, then apply
    /// `FF_*` environment overrides.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
                toml::from_str(&raw).map_err(ConfigError::Toml)?
            }
            _ => Config::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("FF_STATE_DIR") {
            self.state_dir = Some(PathBuf::from(dir));
        }
        if let Some(port) = std::env::var("FF_TCP_PORT").ok().and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Ok(host) = std::env::var("FF_BROKER_HOST") {
            self.broker.host = host;
        }
        if let Some(port) = std::env::var("FF_BROKER_PORT").ok().and_then(|v| v.parse().ok()) {
            self.broker.port = port;
        }
        if let Ok(password) = std::env::var("FF_BROKER_PASSWORD") {
            self.broker.password = Some(password);
        }
        if let Ok(secret) = std::env::var("FF_TOKEN_SECRET") {
            self.secrets.token_secret = Some(secret);
        }
        if let Ok(secret) = std::env::var("FF_REFRESH_SECRET") {
            self.secrets.refresh_secret = Some(secret);
        }
    }

    /// Resolve the directory persisted state lives under:
    /// `FF_STATE_DIR`/`config.state_dir` > `XDG_STATE_HOME/flowforge` >
    /// `~/.local/state/flowforge`, mirroring the teacher's `state_dir()`.
    pub fn resolve_state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.state_dir {
            return dir.clone();
        }
        if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
            return PathBuf::from(xdg).join("flowforge");
        }
        dirs::state_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flowforge")
    }

    pub fn wal_path(&self) -> PathBuf {
        self.broker.wal_path.clone().unwrap_or_else(|| self.resolve_state_dir().join("broker.wal"))
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.resolve_state_dir().join("storage.snapshot")
    }

    /// Queue names to spin worker pools for: `queues.allowed`, falling back
    /// to the full whitelist if unset.
    pub fn active_queues(&self) -> Vec<String> {
        if self.queues.allowed.is_empty() {
            ff_core::QUEUE_WHITELIST.iter().map(|s| s.to_string()).collect()
        } else {
            self.queues.allowed.clone()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(std::io::Error),
    #[error("failed to parse config file: {0}")]
    Toml(toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_cover_every_spec_field() {
        let config = Config::default();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.webhook.timeout_ms, 10_000);
        assert_eq!(config.webhook.max_attempts, 3);
        assert_eq!(config.tokens.access_ttl_secs, 1800);
        assert_eq!(config.tokens.refresh_ttl_secs, 7 * 24 * 60 * 60);
    }

    #[test]
    fn toml_overrides_defaults() {
        let raw = r#"
            [server]
            port = 9000

            [queues]
            allowed = ["jobQueue"]
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.active_queues(), vec!["jobQueue".to_string()]);
    }

    #[test]
    #[serial]
    fn env_var_overrides_toml() {
        std::env::set_var("FF_TCP_PORT", "9999");
        let mut config = Config::default();
        config.apply_env_overrides();
        std::env::remove_var("FF_TCP_PORT");
        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn empty_allowed_list_falls_back_to_the_full_whitelist() {
        let config = Config::default();
        assert_eq!(config.active_queues().len(), ff_core::QUEUE_WHITELIST.len());
    }
}
