use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use tracing::info;
use validator::Validate;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_WEBHOOK_TOLERANCE_SECS: u64 = 300;

/// Object storage configuration: where blobs land on disk and how public
/// URLs are built from keys.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct StorageConfig {
    /// Root directory for the filesystem-backed store
    #[serde(default = "default_storage_root")]
    pub root_dir: String,

    /// Base URL prefixed to object keys when shaping responses
    #[validate(length(min = 1, message = "Storage public URL must not be empty"))]
    pub public_url: String,
}

fn default_storage_root() -> String {
    "storage".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: default_storage_root(),
            public_url: "http://localhost:9000/marketplace".to_string(),
        }
    }
}

/// Application configuration, loaded once at startup and injected through
/// `AppState`. No component reads configuration ad hoc.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL must not be empty"))]
    pub database_url: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text
    #[serde(default)]
    pub log_json: bool,

    /// Create missing tables on startup (development/test convenience)
    #[serde(default)]
    pub auto_migrate: bool,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// JWT signing secret for the bearer-token extractor
    #[validate(length(min = 32, message = "JWT secret must be at least 32 characters"))]
    pub jwt_secret: String,

    /// Stripe secret API key
    pub stripe_secret_key: String,

    /// Stripe webhook signing secret; webhook requests are rejected when
    /// signature verification fails
    pub stripe_webhook_secret: String,

    /// Override for the Stripe API base URL (tests point this at a mock)
    #[serde(default = "default_stripe_api_base")]
    pub stripe_api_base: String,

    /// Accepted clock skew for webhook timestamps
    #[serde(default = "default_webhook_tolerance_secs")]
    pub webhook_tolerance_secs: u64,

    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn default_stripe_api_base() -> String {
    DEFAULT_STRIPE_API_BASE.to_string()
}

fn default_webhook_tolerance_secs() -> u64 {
    DEFAULT_WEBHOOK_TOLERANCE_SECS
}

impl AppConfig {
    /// Minimal constructor used by tests.
    pub fn new(database_url: String, jwt_secret: String, stripe_secret_key: String) -> Self {
        Self {
            database_url,
            host: default_host(),
            port: default_port(),
            environment: "test".to_string(),
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            jwt_secret,
            stripe_secret_key,
            stripe_webhook_secret: "whsec_test".to_string(),
            stripe_api_base: default_stripe_api_base(),
            webhook_tolerance_secs: default_webhook_tolerance_secs(),
            storage: StorageConfig::default(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

/// Load configuration from `config/default.toml`, an optional
/// `config/<APP_ENV>.toml` overlay, and `APP_`-prefixed environment
/// variables (highest precedence).
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let run_env = env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let mut builder = Config::builder()
        .add_source(File::from(Path::new(CONFIG_DIR).join("default.toml")).required(false))
        .add_source(
            File::from(Path::new(CONFIG_DIR).join(format!("{run_env}.toml"))).required(false),
        )
        .add_source(Environment::with_prefix("APP").separator("__"));

    // DATABASE_URL without the prefix is honored for parity with deploy
    // tooling that sets it directly.
    if let Ok(url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database_url", url)?;
    }

    let cfg: AppConfig = builder.build()?.try_deserialize()?;
    cfg.validate()
        .map_err(|e| ConfigError::Message(format!("invalid configuration: {e}")))?;

    info!(environment = %cfg.environment, "configuration loaded");
    Ok(cfg)
}

/// Install the global tracing subscriber.
pub fn init_tracing(log_level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".to_string(),
            "0123456789abcdef0123456789abcdef".to_string(),
            "sk_test_123".to_string(),
        )
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let mut cfg = test_config();
        cfg.jwt_secret = "short".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_environment_is_not_production() {
        assert!(!test_config().is_production());
    }
}
