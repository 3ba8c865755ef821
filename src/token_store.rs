// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! File-backed persistence for the WHOOP OAuth token.
//!
//! The file holds the token endpoint's JSON response as-is and is replaced
//! wholesale on every save. There is no file locking: two processes
//! refreshing at the same time may race, and the last writer wins.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::{WhoopError, WhoopResult};

/// Token record as returned by the WHOOP token endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Any other fields the vendor sends, kept for round-trip fidelity
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TokenRecord {
    /// First ten characters of the access token, for display
    pub fn masked_access_token(&self) -> String {
        let prefix: String = self.access_token.chars().take(10).collect();
        format!("{}...", prefix)
    }

    pub fn token_type_or_unknown(&self) -> &str {
        self.token_type.as_deref().unwrap_or("Unknown")
    }
}

#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        tokio::fs::metadata(&self.path).await.is_ok()
    }

    /// Read the stored token.
    ///
    /// A missing file maps to [`WhoopError::NotAuthenticated`] and an
    /// unparseable one to [`WhoopError::CorruptToken`].
    pub async fn load(&self) -> WhoopResult<TokenRecord> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(WhoopError::NotAuthenticated),
            Err(e) => return Err(WhoopError::Io(e)),
        };

        serde_json::from_str(&raw).map_err(|_| WhoopError::CorruptToken)
    }

    /// Convenience accessor used before every authenticated call
    pub async fn access_token(&self) -> WhoopResult<String> {
        let record = self.load().await?;
        if record.access_token.is_empty() {
            return Err(WhoopError::NotAuthenticated);
        }
        Ok(record.access_token)
    }

    /// Persist a token endpoint response exactly as received
    pub async fn save_raw(&self, response: &Value) -> WhoopResult<()> {
        let body = serde_json::to_string(response)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, body).await?;
        debug!(path = %self.path.display(), "Token file written");
        Ok(())
    }

    pub async fn save(&self, record: &TokenRecord) -> WhoopResult<()> {
        self.save_raw(&serde_json::to_value(record)?).await
    }

    pub async fn clear(&self) -> WhoopResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WhoopError::Io(e)),
        }
    }
}
