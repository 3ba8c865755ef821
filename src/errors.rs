// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error types for the WHOOP client, token store and tool dispatch.
//!
//! `Display` output of [`WhoopError`] is shown to tool callers verbatim, so
//! every variant renders an actionable sentence rather than debug detail.

use thiserror::Error;

use crate::constants::messages;

#[derive(Debug, Error)]
pub enum WhoopError {
    #[error("{}", messages::NOT_AUTHENTICATED)]
    NotAuthenticated,

    #[error("{}", messages::CORRUPT_TOKEN)]
    CorruptToken,

    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("HTTP error 401: {body}. {}", messages::TOKEN_EXPIRED_SUFFIX)]
    TokenExpired { body: String },

    #[error("{0}")]
    Transport(String),

    #[error("WHOOP_CLIENT_ID and WHOOP_CLIENT_SECRET must be set")]
    MissingCredentials,

    #[error("Unexpected response format: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for WhoopError {
    fn from(e: reqwest::Error) -> Self {
        WhoopError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for WhoopError {
    fn from(e: serde_json::Error) -> Self {
        WhoopError::Decode(e.to_string())
    }
}

pub type WhoopResult<T> = Result<T, WhoopError>;

/// Errors raised by the tool registry before a tool produces text
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_user_facing() {
        assert_eq!(
            WhoopError::Http { status: 500, body: "boom".into() }.to_string(),
            "HTTP error 500: boom"
        );
        assert_eq!(
            WhoopError::TokenExpired { body: "expired".into() }.to_string(),
            "HTTP error 401: expired. Your WHOOP token has expired. Please use the authenticate_with_whoop tool to re-authenticate."
        );
        assert!(WhoopError::NotAuthenticated
            .to_string()
            .starts_with("You are not authenticated with WHOOP"));
    }

    #[test]
    fn test_tool_not_found_message() {
        assert_eq!(
            ToolError::NotFound("bogus".into()).to_string(),
            "Tool not found: bogus"
        );
    }
}
