// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Persistence for the optional custom system prompt.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::errors::WhoopResult;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PromptFile {
    #[serde(default)]
    prompt: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PromptStore {
    path: PathBuf,
}

impl PromptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current prompt; a missing or unreadable file means none is set
    pub async fn load(&self) -> Option<String> {
        let raw = tokio::fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str::<PromptFile>(&raw) {
            Ok(file) => file.prompt,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable prompt file");
                None
            }
        }
    }

    /// Store `prompt`, or record that there is none
    pub async fn save(&self, prompt: Option<&str>) -> WhoopResult<()> {
        let body = serde_json::to_string(&PromptFile {
            prompt: prompt.map(str::to_string),
        })?;
        tokio::fs::write(&self.path, body).await?;
        debug!(path = %self.path.display(), cleared = prompt.is_none(), "Prompt file written");
        Ok(())
    }
}

/// Text for `set_custom_prompt`
pub async fn set_custom_prompt(store: &PromptStore, prompt: Option<&str>) -> String {
    match store.save(prompt).await {
        Ok(()) => match prompt {
            Some(prompt) => format!("Custom prompt set successfully: '{}'", prompt),
            None => "Custom prompt cleared successfully.".to_string(),
        },
        Err(e) => format!("Error saving custom prompt: {}", e),
    }
}

/// Text for `get_current_prompt`
pub async fn current_prompt(store: &PromptStore) -> String {
    match store.load().await {
        Some(prompt) => format!("Current custom prompt: '{}'", prompt),
        None => "No custom prompt is currently set.".to_string(),
    }
}
