use std::env;
use std::time::Duration;

use auth::PasswordError;
use auth::PasswordHasher;
use auth::TokenLifetimes;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub tokens: TokenConfig,
    pub password: PasswordConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
}

/// Argon2id cost parameters for newly hashed passwords.
#[derive(Debug, Deserialize, Clone)]
pub struct PasswordConfig {
    pub memory_cost_kib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (SSO_DATABASE__URL, SSO_SERVER__HTTP_PORT, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // SSO_TOKENS__ACCESS_TOKEN_TTL_SECS=60 overrides tokens.access_token_ttl_secs
            .add_source(
                Environment::with_prefix("SSO")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tokens.access_token_ttl_secs <= 0 || self.tokens.refresh_token_ttl_secs <= 0 {
            return Err(ConfigError::Message(
                "token lifetimes must be positive".to_string(),
            ));
        }

        if self.tokens.refresh_token_ttl_secs <= self.tokens.access_token_ttl_secs {
            return Err(ConfigError::Message(
                "refresh tokens must outlive access tokens".to_string(),
            ));
        }

        Ok(())
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl TokenConfig {
    pub fn lifetimes(&self) -> TokenLifetimes {
        TokenLifetimes {
            access: chrono::Duration::seconds(self.access_token_ttl_secs),
            refresh: chrono::Duration::seconds(self.refresh_token_ttl_secs),
        }
    }
}

impl PasswordConfig {
    pub fn hasher(&self) -> Result<PasswordHasher, PasswordError> {
        PasswordHasher::with_params(self.memory_cost_kib, self.time_cost, self.parallelism)
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn from_toml(toml: &str) -> Config {
        ConfigBuilder::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .expect("config should deserialize")
    }

    #[test]
    fn test_default_file_is_valid() {
        let config = from_toml(include_str!("../../config/default.toml"));

        assert!(config.validate().is_ok());
        assert_eq!(config.tokens.lifetimes().access, chrono::Duration::minutes(15));
        assert_eq!(config.tokens.lifetimes().refresh, chrono::Duration::days(30));
        assert_eq!(config.server.request_timeout(), Duration::from_secs(10));
        assert!(config.password.hasher().is_ok());
    }

    #[test]
    fn test_refresh_ttl_must_exceed_access_ttl() {
        let mut config = from_toml(include_str!("../../config/default.toml"));
        config.tokens.refresh_token_ttl_secs = config.tokens.access_token_ttl_secs;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_ttl_is_rejected() {
        let mut config = from_toml(include_str!("../../config/default.toml"));
        config.tokens.access_token_ttl_secs = 0;

        assert!(config.validate().is_err());
    }
}
