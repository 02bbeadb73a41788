use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::KubetrailError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_list(key: &str) -> Vec<String> {
    env_opt(key)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub rules: RulesConfig,
    pub queue: QueueConfig,
    pub notify: NotifyConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig::from_env(),
            rules: RulesConfig::from_env(),
            queue: QueueConfig::from_env(),
            notify: NotifyConfig::from_env(),
        }
    }

    /// Reject values that would make the pipeline inoperable.
    pub fn validate(&self) -> Result<(), KubetrailError> {
        if self.queue.capacity == 0 {
            return Err(KubetrailError::Config(
                "KUBETRAIL_QUEUE_CAPACITY must be greater than zero".to_string(),
            ));
        }
        if self.rules.reload_interval_secs == 0 {
            return Err(KubetrailError::Config(
                "KUBETRAIL_RELOAD_INTERVAL_SECS must be greater than zero".to_string(),
            ));
        }
        if self.notify.timeout_secs == 0 {
            return Err(KubetrailError::Config(
                "KUBETRAIL_NOTIFY_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if self.notify.max_in_flight == 0 {
            return Err(KubetrailError::Config(
                "KUBETRAIL_NOTIFY_MAX_IN_FLIGHT must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  server:  {}:{}", self.server.host, self.server.port);
        tracing::info!(
            "  rules:   dir={}, reload every {}s, inline ignore={}, inline block={}",
            self.rules.rules_dir.display(),
            self.rules.reload_interval_secs,
            self.rules.inline_ignore.is_some(),
            self.rules.inline_block.is_some()
        );
        tracing::info!(
            "  queue:   capacity={}, store_max_events={}",
            self.queue.capacity,
            self.queue.store_max_events
        );
        // Webhook URLs may embed tokens; only the count is logged.
        tracing::info!(
            "  notify:  {} webhook(s), timeout={}s, max in flight={}",
            self.notify.webhook_urls.len(),
            self.notify.timeout_secs,
            self.notify.max_in_flight
        );
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("KUBETRAIL_HOST", "0.0.0.0"),
            port: env_u16("KUBETRAIL_PORT", 8443),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── Rules ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Mounted directory holding `ignore-config` and `block-config`.
    pub rules_dir: PathBuf,
    pub reload_interval_secs: u64,
    /// Inline JSON ignore rules used before the first file load.
    pub inline_ignore: Option<String>,
    /// Inline JSON block rules used before the first file load.
    pub inline_block: Option<String>,
}

impl RulesConfig {
    fn from_env() -> Self {
        Self {
            rules_dir: PathBuf::from(env_or("KUBETRAIL_RULES_DIR", "/etc/kubetrail")),
            reload_interval_secs: env_u64("KUBETRAIL_RELOAD_INTERVAL_SECS", 30),
            inline_ignore: env_opt("KUBETRAIL_IGNORE_CONFIG"),
            inline_block: env_opt("KUBETRAIL_BLOCK_CONFIG"),
        }
    }

    pub fn reload_interval(&self) -> Duration {
        Duration::from_secs(self.reload_interval_secs)
    }
}

// ── Queue / store ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub capacity: usize,
    /// Cap for the in-memory store; 0 selects the log-backed store.
    pub store_max_events: usize,
}

impl QueueConfig {
    fn from_env() -> Self {
        Self {
            capacity: env_usize("KUBETRAIL_QUEUE_CAPACITY", 1000),
            store_max_events: env_usize("KUBETRAIL_STORE_MAX_EVENTS", 0),
        }
    }
}

// ── Notifications ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub webhook_urls: Vec<String>,
    pub timeout_secs: u64,
    /// Dispatches allowed in flight at once; events past this are not notified.
    pub max_in_flight: usize,
}

impl NotifyConfig {
    fn from_env() -> Self {
        Self {
            webhook_urls: env_list("KUBETRAIL_WEBHOOK_URLS"),
            timeout_secs: env_u64("KUBETRAIL_NOTIFY_TIMEOUT_SECS", 10),
            max_in_flight: env_usize("KUBETRAIL_NOTIFY_MAX_IN_FLIGHT", 64),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
