use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use thiserror::Error;

/// Startup configuration failures. Never produced per request.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub enable_tracing: bool,
    pub gateway: GatewayConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub password: PasswordConfig,
    /// PostgreSQL connection URL for the identity store.
    /// Without it the service runs on the in-memory store.
    #[serde(default)]
    pub postgres_url: Option<String>,
    /// Upper bound on a single identity-store call
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

/// Longest accepted token lifetime (10 years)
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Token secrets and lifetimes.
///
/// Both secrets and both TTLs are required. `access_token_ttl_secs` must be
/// strictly shorter than `refresh_token_ttl_secs`.
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct AuthConfig {
    #[serde(default)]
    pub access_token_secret: String,
    #[serde(default)]
    pub refresh_token_secret: String,
    #[serde(default)]
    pub access_token_ttl_secs: u64,
    #[serde(default)]
    pub refresh_token_ttl_secs: u64,
}

// Secrets stay out of logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_token_secret", &"<redacted>")
            .field("refresh_token_secret", &"<redacted>")
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .finish()
    }
}

impl AuthConfig {
    /// Apply `ACCESS_TOKEN_SECRET`, `REFRESH_TOKEN_SECRET`, `ACCESS_TOKEN_EXPIRY`
    /// and `REFRESH_TOKEN_EXPIRY` (seconds) from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(v) = std::env::var("ACCESS_TOKEN_SECRET") {
            self.access_token_secret = v;
        }
        if let Ok(v) = std::env::var("REFRESH_TOKEN_SECRET") {
            self.refresh_token_secret = v;
        }
        if let Ok(v) = std::env::var("ACCESS_TOKEN_EXPIRY") {
            self.access_token_ttl_secs = parse_secs("ACCESS_TOKEN_EXPIRY", &v)?;
        }
        if let Ok(v) = std::env::var("REFRESH_TOKEN_EXPIRY") {
            self.refresh_token_ttl_secs = parse_secs("REFRESH_TOKEN_EXPIRY", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token_secret.trim().is_empty() {
            return Err(ConfigError::Missing("auth.access_token_secret"));
        }
        if self.refresh_token_secret.trim().is_empty() {
            return Err(ConfigError::Missing("auth.refresh_token_secret"));
        }
        if self.access_token_secret == self.refresh_token_secret {
            return Err(ConfigError::Invalid {
                name: "auth.refresh_token_secret",
                reason: "must differ from the access token secret".to_string(),
            });
        }
        if self.access_token_ttl_secs == 0 {
            return Err(ConfigError::Missing("auth.access_token_ttl_secs"));
        }
        if self.refresh_token_ttl_secs == 0 {
            return Err(ConfigError::Missing("auth.refresh_token_ttl_secs"));
        }
        for (name, ttl) in [
            ("auth.access_token_ttl_secs", self.access_token_ttl_secs),
            ("auth.refresh_token_ttl_secs", self.refresh_token_ttl_secs),
        ] {
            if ttl > MAX_TOKEN_TTL_SECS {
                return Err(ConfigError::Invalid {
                    name,
                    reason: format!("{}s exceeds the {}s ceiling", ttl, MAX_TOKEN_TTL_SECS),
                });
            }
        }
        if self.access_token_ttl_secs >= self.refresh_token_ttl_secs {
            return Err(ConfigError::Invalid {
                name: "auth.access_token_ttl_secs",
                reason: format!(
                    "{}s must be shorter than refresh ttl {}s",
                    self.access_token_ttl_secs, self.refresh_token_ttl_secs
                ),
            });
        }
        Ok(())
    }
}

fn parse_secs(name: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        reason: format!("expected seconds, got {:?}", raw),
    })
}

/// Argon2 work factor. Defaults are the argon2 crate defaults.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

fn default_store_timeout_ms() -> u64 {
    3_000
}

impl AppConfig {
    /// Load `config/<env>.yaml`, apply environment overrides and validate.
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
            path: config_path.clone(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let mut config: AppConfig = serde_yaml::from_str(content)?;
        config.auth.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auth.validate()?;
        if self.store_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "store_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
