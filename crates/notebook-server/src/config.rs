//! Server configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notebook_commerce::cart::PricingPolicy;
use serde::{Deserialize, Serialize};

/// Server configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listener and HTTP behaviour.
    #[serde(default)]
    pub server: HttpConfig,

    /// Where data and uploads live.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Token lifetime and the bootstrap admin.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Per-IP request limits on `/api`.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Tax and shipping rules for cart pricing.
    #[serde(default)]
    pub cart: PricingPolicy,
}

impl ServerConfig {
    /// Load config from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
        }
    }

    /// Load `path` if given (defaults otherwise), then apply environment
    /// overrides.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `NOTEBOOK_*` overrides looked up through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(port) = lookup("NOTEBOOK_PORT") {
            self.server.port = port
                .parse()
                .with_context(|| format!("NOTEBOOK_PORT is not a valid port: {port}"))?;
        }
        if let Some(dir) = lookup("NOTEBOOK_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(env) = lookup("NOTEBOOK_ENV") {
            self.server.environment = Environment::parse(&env)
                .with_context(|| format!("NOTEBOOK_ENV must be development or production, got {env}"))?;
        }
        if let Some(password) = lookup("NOTEBOOK_ADMIN_PASSWORD") {
            self.auth.admin_password = Some(password);
        }
        Ok(())
    }
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub environment: Environment,

    /// Origins allowed by CORS.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:3001".to_string(),
    ]
}

fn default_body_limit() -> usize {
    10 * 1024 * 1024
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: Environment::default(),
            cors_origins: default_cors_origins(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the catalog, cart and account stores.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory uploaded files are written to (default: `<data_dir>/uploads`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploads_dir: Option<PathBuf>,

    /// Load the bundled laptops when the catalog is empty.
    #[serde(default = "default_true")]
    pub seed_catalog: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_true() -> bool {
    true
}

impl StorageConfig {
    /// Root of the `/uploads` static tree.
    pub fn uploads_dir(&self) -> PathBuf {
        self.uploads_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("uploads"))
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join("catalog.json")
    }

    pub fn carts_path(&self) -> PathBuf {
        self.data_dir.join("carts.json")
    }

    pub fn auth_path(&self) -> PathBuf {
        self.data_dir.join("auth.json")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            uploads_dir: None,
            seed_catalog: true,
        }
    }
}

/// Auth configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bearer token lifetime.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: i64,

    #[serde(default = "default_admin_username")]
    pub admin_username: String,

    #[serde(default = "default_admin_email")]
    pub admin_email: String,

    /// Password for the bootstrap super admin. Without one no account is
    /// created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
}

fn default_token_ttl() -> i64 {
    notebook_auth::DEFAULT_TOKEN_TTL_SECS
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_email() -> String {
    "admin@notebook.store".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: default_token_ttl(),
            admin_username: default_admin_username(),
            admin_email: default_admin_email(),
            admin_password: None,
        }
    }
}

/// Rate limit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Requests allowed per window.
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_max_requests() -> u32 {
    100
}

fn default_window_secs() -> u64 {
    15 * 60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_secs, 900);
        assert_eq!(config.storage.uploads_dir(), PathBuf::from("data/uploads"));
        assert!(config.auth.admin_password.is_none());
    }

    #[test]
    fn test_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notebook.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 8080
environment = "production"

[rate_limit]
max_requests = 5

[cart]
tax_rate = 16.0
"#,
        )
        .unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.server.port, 8080);
        assert!(config.server.environment.is_production());
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 900);
        assert_eq!(config.cart.tax_rate, 16.0);
        assert_eq!(config.auth.admin_username, "admin");
    }

    #[test]
    fn test_json_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notebook.json");
        std::fs::write(&path, r#"{"storage": {"data_dir": "/var/lib/notebook"}}"#).unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/notebook"));
        assert_eq!(
            config.storage.catalog_path(),
            PathBuf::from("/var/lib/notebook/catalog.json")
        );
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(ServerConfig::load(Path::new("/nonexistent/notebook.toml")).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("NOTEBOOK_PORT", "9000"),
            ("NOTEBOOK_ENV", "prod"),
            ("NOTEBOOK_ADMIN_PASSWORD", "s3cret-pass"),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.server.port, 9000);
        assert!(config.server.environment.is_production());
        assert_eq!(config.auth.admin_password.as_deref(), Some("s3cret-pass"));
    }

    #[test]
    fn test_bad_env_override() {
        let mut config = ServerConfig::default();
        let result = config.apply_overrides(|key| (key == "NOTEBOOK_PORT").then(|| "nope".to_string()));
        assert!(result.is_err());
    }
}
