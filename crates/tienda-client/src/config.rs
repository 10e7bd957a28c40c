//! # Console Configuration
//!
//! Where the API lives, where the session is kept, and the timings of the
//! composition workflows.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TIENDA_API_URL=https://api.example.com/api/v1                      │
//! │     TIENDA_SESSION_PATH=/var/lib/tienda/session.json                   │
//! │     TIENDA_SEARCH_DEBOUNCE_MS=400                                      │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tienda-admin/console.toml (Linux)                        │
//! │     ~/Library/Application Support/com.tienda.admin/console.toml        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     Production API URL, session.json in the data dir                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # console.toml
//! [api]
//! base_url = "https://inventory-system-backend-production-51be.up.railway.app/api/v1"
//! # timeout_secs = 30
//!
//! [session]
//! # storage_path = "/home/ana/.local/share/tienda-admin/session.json"
//!
//! [workflow]
//! sale_confirmation_delay_ms = 1500
//! order_confirmation_delay_ms = 3000
//! search_debounce_ms = 500
//! search_min_chars = 3
//! auto_approve_purchase_orders = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ClientError, ClientResult};

/// Production API used when neither the file nor the environment names one.
pub const DEFAULT_API_URL: &str =
    "https://inventory-system-backend-production-51be.up.railway.app/api/v1";

/// Accepted range for the search debounce window, in milliseconds.
pub const SEARCH_DEBOUNCE_RANGE_MS: std::ops::RangeInclusive<u64> = 300..=1000;

// =============================================================================
// API Settings
// =============================================================================

/// Remote REST API settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL every endpoint path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout (seconds). Absent means the transport default.
    /// There is no retry policy on top of it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_API_URL.to_string()
}

impl Default for ApiSettings {
    fn default() -> Self {
        ApiSettings {
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

// =============================================================================
// Session Settings
// =============================================================================

/// Durable session storage settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// File holding the bearer token and the derived user.
    /// Defaults to `session.json` in the project data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<PathBuf>,
}

// =============================================================================
// Workflow Settings
// =============================================================================

/// Timings and policies of the composition workflows and search fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// Delay between a successful sale and navigating to its detail view.
    #[serde(default = "default_sale_delay")]
    pub sale_confirmation_delay_ms: u64,

    /// Delay before closing the purchase-order dialog after success.
    #[serde(default = "default_order_delay")]
    pub order_confirmation_delay_ms: u64,

    /// Pause required after the last keystroke before a search fires.
    #[serde(default = "default_debounce")]
    pub search_debounce_ms: u64,

    /// Shorter (trimmed) queries clear the results instead of searching.
    #[serde(default = "default_min_chars")]
    pub search_min_chars: usize,

    /// Approve purchase orders right after creating them.
    #[serde(default = "default_true")]
    pub auto_approve_purchase_orders: bool,
}

fn default_sale_delay() -> u64 {
    1500
}

fn default_order_delay() -> u64 {
    3000
}

fn default_debounce() -> u64 {
    500
}

fn default_min_chars() -> usize {
    3
}

fn default_true() -> bool {
    true
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        WorkflowSettings {
            sale_confirmation_delay_ms: default_sale_delay(),
            order_confirmation_delay_ms: default_order_delay(),
            search_debounce_ms: default_debounce(),
            search_min_chars: default_min_chars(),
            auto_approve_purchase_orders: true,
        }
    }
}

impl WorkflowSettings {
    pub fn sale_confirmation_delay(&self) -> Duration {
        Duration::from_millis(self.sale_confirmation_delay_ms)
    }

    pub fn order_confirmation_delay(&self) -> Duration {
        Duration::from_millis(self.order_confirmation_delay_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

// =============================================================================
// Main Console Configuration
// =============================================================================

/// Complete console configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub workflow: WorkflowSettings,
}

impl ConsoleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults pointing at another API, used by tests and embedders.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.api.base_url = base_url.into();
        config
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (console.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ClientResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading console config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load console config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ClientResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ClientError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Console config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ClientResult<()> {
        let url = Url::parse(&self.api.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ClientError::InvalidUrl(format!(
                "API URL must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }

        if self.api.timeout_secs == Some(0) {
            return Err(ClientError::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if !SEARCH_DEBOUNCE_RANGE_MS.contains(&self.workflow.search_debounce_ms) {
            return Err(ClientError::Config(format!(
                "search_debounce_ms must be between {} and {}, got: {}",
                SEARCH_DEBOUNCE_RANGE_MS.start(),
                SEARCH_DEBOUNCE_RANGE_MS.end(),
                self.workflow.search_debounce_ms
            )));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("TIENDA_API_URL") {
            if !url.trim().is_empty() {
                debug!(url = %url, "Overriding API URL from environment");
                self.api.base_url = url.trim().to_string();
            }
        }

        if let Ok(path) = std::env::var("TIENDA_SESSION_PATH") {
            debug!(path = %path, "Overriding session path from environment");
            self.session.storage_path = Some(PathBuf::from(path));
        }

        if let Ok(ms) = std::env::var("TIENDA_SEARCH_DEBOUNCE_MS") {
            match ms.parse::<u64>() {
                Ok(ms) => self.workflow.search_debounce_ms = ms,
                Err(_) => warn!(value = %ms, "Ignoring non-numeric search debounce"),
            }
        }
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("com", "tienda", "admin")
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("console.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api.base_url.trim_end_matches('/')
    }

    /// Where the durable session lives, if anywhere can be resolved.
    pub fn session_path(&self) -> Option<PathBuf> {
        self.session.storage_path.clone().or_else(|| {
            Self::project_dirs().map(|dirs| dirs.data_dir().join("session.json"))
        })
    }
}
