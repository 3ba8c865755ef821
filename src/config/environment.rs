// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Environment-based configuration for the web shim

use anyhow::{Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{info, warn};

use super::WhoopConfig;
use crate::constants::{defaults, limits};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_str_or_default(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the web shim
    pub host: String,
    /// Bind port for the web shim
    pub port: u16,
    pub environment: Environment,
    /// Log level
    pub log_level: String,
    /// WHOOP client settings
    pub whoop: WhoopConfig,
    /// Security settings
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Shared secret expected in `X-API-Key`
    #[serde(skip_serializing)]
    pub api_key: String,
    /// True when no key was configured and one was generated for this process
    pub api_key_generated: bool,
    /// CORS allowed origins
    pub cors_origins: Vec<String>,
    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
    /// Largest accepted JSON-RPC body in bytes
    pub max_request_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,
    /// Requests per window
    pub requests_per_window: u32,
    /// Window duration in seconds
    pub window_seconds: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        if let Err(e) = dotenv::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        let environment = Environment::from_str_or_default(&env_var_or("ENVIRONMENT", "development"));

        let (api_key, api_key_generated) = match env::var("API_SECRET_KEY") {
            Ok(key) if !key.is_empty() => (key, false),
            _ => {
                warn!("API_SECRET_KEY not set, generated a temporary key for this process");
                (generate_api_key(), true)
            }
        };

        let config = ServerConfig {
            host: env_var_or("HOST", defaults::DEFAULT_HOST),
            port: env_var_or("PORT", &defaults::DEFAULT_PORT.to_string())
                .parse()
                .context("Invalid PORT value")?,
            environment,
            log_level: env_var_or("RUST_LOG", "info"),
            whoop: WhoopConfig::from_env(),
            security: SecurityConfig {
                api_key,
                api_key_generated,
                cors_origins: default_origins(environment),
                rate_limit: RateLimitConfig {
                    enabled: env_var_or("RATE_LIMIT_ENABLED", "true")
                        .parse()
                        .context("Invalid RATE_LIMIT_ENABLED value")?,
                    requests_per_window: env_var_or(
                        "RATE_LIMIT_REQUESTS",
                        &limits::RATE_LIMIT_REQUESTS.to_string(),
                    )
                    .parse()
                    .context("Invalid RATE_LIMIT_REQUESTS value")?,
                    window_seconds: env_var_or(
                        "RATE_LIMIT_WINDOW_SECS",
                        &limits::RATE_LIMIT_WINDOW_SECS.to_string(),
                    )
                    .parse()
                    .context("Invalid RATE_LIMIT_WINDOW_SECS value")?,
                },
                max_request_size: env_var_or(
                    "MAX_REQUEST_SIZE",
                    &limits::MAX_REQUEST_SIZE.to_string(),
                )
                .parse()
                .context("Invalid MAX_REQUEST_SIZE value")?,
            },
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(anyhow::anyhow!("PORT cannot be 0"));
        }

        if self.security.rate_limit.enabled
            && (self.security.rate_limit.requests_per_window == 0
                || self.security.rate_limit.window_seconds == 0)
        {
            return Err(anyhow::anyhow!(
                "Rate limiting is enabled but RATE_LIMIT_REQUESTS or RATE_LIMIT_WINDOW_SECS is zero"
            ));
        }

        if self.security.max_request_size == 0 {
            return Err(anyhow::anyhow!("MAX_REQUEST_SIZE cannot be 0"));
        }

        if !self.whoop.has_credentials() {
            warn!("WHOOP_CLIENT_ID or WHOOP_CLIENT_SECRET is missing, OAuth routes will fail");
        }

        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    pub fn summary(&self) -> String {
        format!(
            "WHOOP MCP Server Configuration:\n\
             - Address: {}:{}\n\
             - Environment: {}\n\
             - Log Level: {}\n\
             - WHOOP OAuth: {}\n\
             - Redirect URI: {}\n\
             - API Key: {}\n\
             - Rate Limiting: {}\n\
             - Max Request Size: {} bytes",
            self.host,
            self.port,
            self.environment,
            self.log_level,
            if self.whoop.has_credentials() { "Configured" } else { "Missing credentials" },
            self.whoop.redirect_uri,
            format!(
                "{} (sha256:{})",
                if self.security.api_key_generated { "Temporary" } else { "Configured" },
                key_fingerprint(&self.security.api_key)
            ),
            if self.security.rate_limit.enabled {
                format!(
                    "{} requests / {}s",
                    self.security.rate_limit.requests_per_window,
                    self.security.rate_limit.window_seconds
                )
            } else {
                "Disabled".to_string()
            },
            self.security.max_request_size
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Origins allowed by CORS for the given environment
fn default_origins(environment: Environment) -> Vec<String> {
    match environment {
        Environment::Development => vec!["*".to_string()],
        Environment::Production => vec![
            "https://localhost".to_string(),
            "https://127.0.0.1".to_string(),
        ],
    }
}

/// Short SHA-256 prefix of the API key, safe to log
pub fn key_fingerprint(key: &str) -> String {
    Sha256::digest(key.as_bytes())
        .iter()
        .take(4)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Random URL-safe key used when `API_SECRET_KEY` is absent
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    if SystemRandom::new().fill(&mut bytes).is_err() {
        warn!("System RNG unavailable, falling back to thread RNG for the API key");
        rand::thread_rng().fill_bytes(&mut bytes);
    }
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::path::PathBuf;

    fn test_config() -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            environment: Environment::Development,
            log_level: "info".to_string(),
            whoop: WhoopConfig {
                client_id: None,
                client_secret: None,
                redirect_uri: "http://localhost:8000/whoop/callback".to_string(),
                api_base: "http://localhost".to_string(),
                auth_url: "http://localhost/auth".to_string(),
                token_url: "http://localhost/token".to_string(),
                token_file: PathBuf::from("token.json"),
                prompt_file: PathBuf::from("prompt.json"),
            },
            security: SecurityConfig {
                api_key: "key".to_string(),
                api_key_generated: false,
                cors_origins: vec!["*".to_string()],
                rate_limit: RateLimitConfig {
                    enabled: true,
                    requests_per_window: 60,
                    window_seconds: 60,
                },
                max_request_size: 10_000,
            },
        }
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!(Environment::from_str_or_default("production"), Environment::Production);
        assert_eq!(Environment::from_str_or_default("PROD"), Environment::Production);
        assert_eq!(Environment::from_str_or_default("staging"), Environment::Development);
    }

    #[test]
    fn test_default_origins() {
        assert_eq!(default_origins(Environment::Development), vec!["*"]);
        assert_eq!(
            default_origins(Environment::Production),
            vec!["https://localhost", "https://127.0.0.1"]
        );
    }

    #[test]
    fn test_generated_keys_are_unique() {
        let a = generate_api_key();
        let b = generate_api_key();
        assert_eq!(a.len(), 43);
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_fingerprint() {
        // sha256("abc") = ba7816bf...
        assert_eq!(key_fingerprint("abc"), "ba7816bf");
        assert_eq!(key_fingerprint("abc").len(), 8);
    }

    #[test]
    fn test_config_validation() {
        let mut config = test_config();
        assert!(config.validate().is_ok());

        config.security.rate_limit.requests_per_window = 0;
        assert!(config.validate().is_err());

        config.security.rate_limit.enabled = false;
        assert!(config.validate().is_ok());

        config.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_summary_hides_api_key() {
        let mut config = test_config();
        config.security.api_key = "do-not-print".to_string();
        let summary = config.summary();
        assert!(!summary.contains("do-not-print"));
        assert!(summary.contains("60 requests / 60s"));
        assert!(summary.contains(&format!("sha256:{}", key_fingerprint("do-not-print"))));
    }

    #[test]
    #[serial]
    fn test_from_env_generates_key_when_missing() {
        env::remove_var("API_SECRET_KEY");
        env::set_var("PORT", "9191");
        env::set_var("ENVIRONMENT", "production");

        let config = ServerConfig::from_env().unwrap();
        assert!(config.security.api_key_generated);
        assert_eq!(config.port, 9191);
        assert!(config.environment.is_production());
        assert_eq!(config.security.cors_origins.len(), 2);

        env::remove_var("PORT");
        env::remove_var("ENVIRONMENT");
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_port() {
        env::set_var("PORT", "not-a-port");
        assert!(ServerConfig::from_env().is_err());
        env::remove_var("PORT");
    }
}
