//! Configuration for the legalens client.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (LEGALENS_API_URL, LEGALENS_TOKEN)
//! 2. Config file (.legalens/config.yaml)
//! 3. Defaults (http://localhost:5000, reference polling cadence)
//!
//! Config file discovery:
//! - Searches current directory and parents for .legalens/config.yaml
//! - The inbox path in the config file is relative to the config file's
//!   project root

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::poller::PollerConfig;

/// Service root of the reference deployment
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub service: Option<ServiceConfig>,
    #[serde(default)]
    pub polling: Option<PollingConfig>,
    #[serde(default)]
    pub inbox: Option<InboxPathConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceConfig {
    /// Service root URL
    pub base_url: Option<String>,
    /// Bearer credential (env var takes precedence)
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PollingConfig {
    pub interval_seconds: Option<u64>,
    pub budget_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InboxPathConfig {
    /// Inbox directory (relative to the config file's project root)
    pub path: Option<String>,
    pub stability_delay_secs: Option<u64>,
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Service root, no trailing slash
    pub base_url: String,
    /// Bearer credential, if any is configured
    pub token: Option<String>,
    /// Polling cadence
    pub poller: PollerConfig,
    /// Inbox directory for the watch command
    pub inbox_path: PathBuf,
    /// Stability delay for inbox files (seconds)
    pub inbox_stability_delay_secs: u64,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl ResolvedConfig {
    /// The credential, or the precondition failure that the client
    /// cannot operate without one.
    pub fn require_token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| anyhow::Error::from(crate::adapters::ApiError::MissingCredential))
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".legalens").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's project root
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let config_file = find_config_file();

    let mut base_url = DEFAULT_BASE_URL.to_string();
    let mut token = None;
    let mut poller = PollerConfig::default();
    let mut inbox_path = crate::ingest::InboxConfig::default_inbox_path();
    let mut inbox_stability_delay_secs = 2;

    if let Some(ref config_path) = config_file {
        let config = load_config_file(config_path)?;

        // Project root is the parent of .legalens/
        let base_dir = config_path
            .parent()
            .and_then(|p| p.parent())
            .unwrap_or(Path::new("."))
            .to_path_buf();

        if let Some(service) = config.service {
            if let Some(url) = service.base_url {
                base_url = url;
            }
            token = service.token;
        }

        if let Some(polling) = config.polling {
            if let Some(secs) = polling.interval_seconds {
                poller.interval = Duration::from_secs(secs);
            }
            if let Some(secs) = polling.budget_seconds {
                poller.budget = Duration::from_secs(secs);
            }
        }

        if let Some(inbox) = config.inbox {
            if let Some(ref path) = inbox.path {
                inbox_path = resolve_path(&base_dir, path);
            }
            if let Some(secs) = inbox.stability_delay_secs {
                inbox_stability_delay_secs = secs;
            }
        }
    }

    // Environment overrides
    if let Ok(env_url) = std::env::var("LEGALENS_API_URL") {
        base_url = env_url;
    }
    if let Ok(env_token) = std::env::var("LEGALENS_TOKEN") {
        token = Some(env_token);
    }

    while base_url.ends_with('/') {
        base_url.pop();
    }

    Ok(ResolvedConfig {
        base_url,
        token,
        poller,
        inbox_path,
        inbox_stability_delay_secs,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
