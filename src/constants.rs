// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Constants Module
//!
//! Application constants and environment-based configuration values.
//! Vendor endpoints can be overridden through the environment so that tests
//! can point the client at a local mock server.

use std::env;
use std::path::PathBuf;

/// Protocol-related constants
pub mod protocol {
    /// MCP protocol revision advertised in `initialize`
    pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

    /// JSON-RPC version (standard, not configurable)
    pub const JSONRPC_VERSION: &str = "2.0";

    /// Server name reported in `serverInfo`
    pub const SERVER_NAME: &str = "whoop-mcp";

    /// Human readable name used by the web shim info page
    pub const SERVER_DISPLAY_NAME: &str = "WHOOP MCP Server";

    /// Server version from Cargo.toml
    pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Environment-based configuration
pub mod env_config {
    use super::env;
    use super::PathBuf;

    /// WHOOP OAuth client id
    pub fn whoop_client_id() -> Option<String> {
        env::var("WHOOP_CLIENT_ID").ok().filter(|v| !v.is_empty())
    }

    /// WHOOP OAuth client secret
    pub fn whoop_client_secret() -> Option<String> {
        env::var("WHOOP_CLIENT_SECRET").ok().filter(|v| !v.is_empty())
    }

    /// Redirect URI registered with WHOOP
    pub fn whoop_redirect_uri() -> String {
        env::var("WHOOP_REDIRECT_URI")
            .unwrap_or_else(|_| super::oauth::DEFAULT_REDIRECT_URI.to_string())
    }

    /// WHOOP developer API base URL
    pub fn whoop_api_base() -> String {
        env::var("WHOOP_API_BASE")
            .unwrap_or_else(|_| "https://api.prod.whoop.com/developer".to_string())
    }

    /// WHOOP authorization endpoint
    pub fn whoop_auth_url() -> String {
        env::var("WHOOP_AUTH_URL")
            .unwrap_or_else(|_| "https://api.prod.whoop.com/oauth/oauth2/auth".to_string())
    }

    /// WHOOP token endpoint
    pub fn whoop_token_url() -> String {
        env::var("WHOOP_TOKEN_URL")
            .unwrap_or_else(|_| "https://api.prod.whoop.com/oauth/oauth2/token".to_string())
    }

    /// Location of the persisted OAuth token
    pub fn token_file_path() -> PathBuf {
        env::var("WHOOP_TOKEN_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_file(super::defaults::TOKEN_FILE_NAME))
    }

    /// Location of the persisted custom prompt
    pub fn prompt_file_path() -> PathBuf {
        env::var("WHOOP_PROMPT_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home_file(super::defaults::PROMPT_FILE_NAME))
    }

    /// Get log level from environment or default
    pub fn log_level() -> String {
        env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
    }

    fn home_file(name: &str) -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(name)
    }
}

/// OAuth flow constants
pub mod oauth {
    /// Scopes requested from WHOOP
    pub const WHOOP_SCOPES: &str =
        "read:recovery read:cycles read:sleep read:workout read:profile read:body_measurement";

    /// Default local redirect
    pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8000/whoop/callback";

    /// Port the local callback receiver binds
    pub const CALLBACK_PORT: u16 = 8000;

    /// Path the local callback receiver serves
    pub const CALLBACK_PATH: &str = "whoop/callback";

    /// Length of the generated `state` parameter
    pub const STATE_LENGTH: usize = 32;

    /// Seconds to wait for the browser redirect
    pub const AUTH_TIMEOUT_SECS: u64 = 300;

    /// Seconds a web-initiated state stays valid
    pub const PENDING_STATE_TTL_SECS: i64 = 600;
}

/// JSON-RPC error codes
pub mod errors {
    pub const ERROR_PARSE: i32 = -32700;
    pub const ERROR_METHOD_NOT_FOUND: i32 = -32601;
    pub const ERROR_INVALID_PARAMS: i32 = -32602;
    pub const ERROR_INTERNAL_ERROR: i32 = -32603;

    /// WebSocket close code for policy violations
    pub const WS_CLOSE_POLICY_VIOLATION: u16 = 1008;
}

/// Request and paging limits
pub mod limits {
    /// Per-request timeout against the vendor API
    pub const HTTP_TIMEOUT_SECS: u64 = 30;

    /// Page size for multi-day fetches
    pub const PAGE_SIZE: u32 = 25;

    /// Workouts scanned for the sports mapping
    pub const SPORTS_MAPPING_LIMIT: u32 = 25;

    /// Workouts scanned when searching sports
    pub const SPORTS_SEARCH_LIMIT: u32 = 50;

    /// Default maximum JSON-RPC body size in bytes
    pub const MAX_REQUEST_SIZE: usize = 10_000;

    /// Largest frame accepted on the stdio transport
    pub const MAX_STDIO_MESSAGE_SIZE: usize = 1_048_576;

    /// Default rate limit
    pub const RATE_LIMIT_REQUESTS: u32 = 60;
    pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;
}

/// Default values
pub mod defaults {
    pub const TOKEN_FILE_NAME: &str = ".whoop_token.json";
    pub const PROMPT_FILE_NAME: &str = ".whoop_custom_prompt.json";
    pub const DEFAULT_HOST: &str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 8080;
    pub const ASCII_CHART_WIDTH: usize = 40;
    pub const ASCII_CHART_HEIGHT: usize = 10;
}

/// Message strings shown to tool callers
pub mod messages {
    pub const NOT_AUTHENTICATED: &str =
        "You are not authenticated with WHOOP. Use the authenticate_with_whoop tool to authenticate.";
    pub const CORRUPT_TOKEN: &str =
        "Error decoding token file. The file might be corrupted. Please authenticate again.";
    pub const TOKEN_EXPIRED_SUFFIX: &str =
        "Your WHOOP token has expired. Please use the authenticate_with_whoop tool to re-authenticate.";
    pub const AUTH_TIMEOUT: &str = "Authentication timed out. Please try again.";
    pub const NO_CODE: &str = "No authorization code received. Please try again.";
    pub const STATE_MISMATCH: &str =
        "State parameter mismatch. This could be a CSRF attack. Please try again.";
    pub const RATE_LIMITED: &str = "Rate limit exceeded. Please try again later.";
    pub const UNAUTHORIZED: &str = "Unauthorized. Valid X-API-Key header required.";
    pub const WS_UNAUTHORIZED: &str = "Unauthorized: Valid X-API-Key header required";
    pub const INVALID_REQUEST: &str = "Invalid request format";
    pub const INVALID_JSON: &str = "Invalid JSON format";
    pub const TOOL_FAILED: &str =
        "Tool execution failed. Please check your authentication and try again.";
}

/// Tool names
pub mod tools {
    pub const AUTHENTICATE: &str = "authenticate_with_whoop";
    pub const CHECK_AUTH: &str = "check_authentication_status";
    pub const SLEEP_DAILY: &str = "get_sleep_daily";
    pub const RECOVERY_DAILY: &str = "get_recovery_daily";
    pub const WORKOUT_DAILY: &str = "get_workout_daily";
    pub const CYCLE_DAILY: &str = "get_cycle_daily";
    pub const PROFILE: &str = "get_profile_data";
    pub const BODY_MEASUREMENT: &str = "get_body_measurement_data";
    pub const SPORTS_MAPPING: &str = "get_sports_mapping";
    pub const WORKOUT_ANALYSIS: &str = "get_workout_analysis";
    pub const SLEEP_QUALITY: &str = "get_sleep_quality_analysis";
    pub const RECOVERY_LOAD: &str = "get_recovery_load_analysis";
    pub const TRAINING_READINESS: &str = "get_training_readiness";
    pub const SEARCH_SPORTS: &str = "search_whoop_sports";
    pub const DAILY_SUMMARY: &str = "get_daily_summary";
    pub const SET_PROMPT: &str = "set_custom_prompt";
    pub const GET_PROMPT: &str = "get_current_prompt";
    pub const RECOVERY_TRENDS: &str = "get_recovery_trends";
    pub const STRAIN_TRENDS: &str = "get_strain_trends";
    pub const SLEEP_TRENDS: &str = "get_sleep_trends";
    pub const RECOVERY_CHART: &str = "get_recovery_chart";
    pub const WORKOUT_TRENDS: &str = "get_workout_trends";
    pub const TOOLS_GUIDE: &str = "get_tools_guide";
}

/// Vendor API resource paths (v2)
pub mod endpoints {
    pub const SLEEP: &str = "/v2/activity/sleep";
    pub const RECOVERY: &str = "/v2/recovery";
    pub const WORKOUT: &str = "/v2/activity/workout";
    pub const CYCLE: &str = "/v2/cycle";
    pub const PROFILE: &str = "/v2/user/profile/basic";
    pub const BODY_MEASUREMENT: &str = "/v2/user/measurement/body";
}

/// Task orchestration platform used by the demo driver
pub mod parallel {
    pub const DEFAULT_BASE_URL: &str = "https://api.parallel.ai";
    pub const DEFAULT_MCP_API_KEY: &str = "local_development_key_12345";
    pub const MCP_SERVER_NAME: &str = "whoop_fitness_data";
    pub const PROCESSOR: &str = "pro";
    pub const RUN_BETA: &str = "mcp-server-2025-07-17,events-sse-2025-07-24";
    pub const EVENTS_BETA: &str = "events-sse-2025-07-24";
    pub const MAX_RECONNECTS: u32 = 10;
    pub const RECONNECT_DELAY_SECS: u64 = 2;
    pub const BASIS_PREVIEW: usize = 5;
    pub const TOOL_CALL_PREVIEW: usize = 3;
}
