//! Bootstrap configuration and root folder resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default
//!
//! Everything here is read once at startup; a restart is needed to pick up
//! changes to the TOML file.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Directory name used under the platform data/config directories
const APP_DIR: &str = "annolab";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// SQLite database file; defaults to `<root_folder>/annolab.db`
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub cors: CorsConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub mail: MailConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_path: None,
            root_folder: None,
            auth: AuthConfig::default(),
            cors: CorsConfig::default(),
            storage: StorageConfig::default(),
            mail: MailConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Token signing and account verification settings
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for access tokens. When absent a random key is generated
    /// at startup and every token is invalidated by a restart.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    #[serde(default = "default_jwt_expiration_secs")]
    pub jwt_expiration_secs: i64,

    /// Base URL of the web client; verification links point here
    #[serde(default = "default_client_domain")]
    pub client_domain: String,

    #[serde(default = "default_verification_ttl_secs")]
    pub verification_ttl_secs: i64,

    /// Mark the session cookie `Secure`
    #[serde(default)]
    pub secure_cookie: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_expiration_secs: default_jwt_expiration_secs(),
            client_domain: default_client_domain(),
            verification_ttl_secs: default_verification_ttl_secs(),
            secure_cookie: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_cors_origins")]
    pub origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_cors_origins(),
        }
    }
}

/// Where uploaded media is kept
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    S3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Public origin used to build URLs for locally stored files
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    #[serde(default)]
    pub s3_bucket: Option<String>,

    #[serde(default)]
    pub s3_region: Option<String>,

    /// Custom endpoint for S3-compatible servers
    #[serde(default)]
    pub s3_endpoint: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            public_base_url: default_public_base_url(),
            max_upload_bytes: default_max_upload_bytes(),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MailTransport {
    /// Write outgoing mail to the log instead of delivering it
    #[default]
    Log,
    Http,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    #[serde(default)]
    pub transport: MailTransport,

    #[serde(default = "default_mail_from")]
    pub from: String,

    /// HTTP endpoint of the mail provider (transport = "http")
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            transport: MailTransport::default(),
            from: default_mail_from(),
            endpoint: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_jwt_expiration_secs() -> i64 {
    3600
}

fn default_client_domain() -> String {
    "http://localhost:3000".to_string()
}

fn default_verification_ttl_secs() -> i64 {
    15 * 60
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_public_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_mail_from() -> String {
    "annolab <no-reply@annolab.local>".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Load the bootstrap TOML file
///
/// A missing file is not an error: defaults are returned and a warning is
/// logged. A file that exists but does not parse is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file {} not found, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content).map_err(|source| Error::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Default location of the bootstrap file (`<config_dir>/annolab/config.toml`)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR).join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

/// Resolve the root folder holding the database and locally stored uploads
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./annolab_data"))
}

/// Database file inside the root folder unless configured explicitly
pub fn resolve_database_path(root_folder: &Path, toml_value: Option<&Path>) -> PathBuf {
    match toml_value {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => root_folder.join(path),
        None => root_folder.join("annolab.db"),
    }
}
