// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Configuration management for the WHOOP MCP server

pub mod environment;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::env_config;

pub use environment::{Environment, RateLimitConfig, SecurityConfig, ServerConfig};

/// Vendor-facing settings shared by the stdio server, the web shim and the CLI.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WhoopConfig {
    pub client_id: Option<String>,
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub api_base: String,
    pub auth_url: String,
    pub token_url: String,
    pub token_file: PathBuf,
    pub prompt_file: PathBuf,
}

impl WhoopConfig {
    /// Build from `WHOOP_*` environment variables, falling back to the production endpoints
    pub fn from_env() -> Self {
        Self {
            client_id: env_config::whoop_client_id(),
            client_secret: env_config::whoop_client_secret(),
            redirect_uri: env_config::whoop_redirect_uri(),
            api_base: env_config::whoop_api_base(),
            auth_url: env_config::whoop_auth_url(),
            token_url: env_config::whoop_token_url(),
            token_file: env_config::token_file_path(),
            prompt_file: env_config::prompt_file_path(),
        }
    }

    /// Point every vendor URL at `base` (used against mock servers)
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.api_base = base.to_string();
        self.auth_url = format!("{}/oauth/oauth2/auth", base);
        self.token_url = format!("{}/oauth/oauth2/token", base);
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.client_id.is_some() && self.client_secret.is_some()
    }

    /// Build an absolute API URL from a resource path
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }
}
