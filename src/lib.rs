// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # WHOOP MCP Server
//!
//! A Model Context Protocol (MCP) server that exposes WHOOP fitness data
//! (sleep, recovery, strain, workouts) as tools for AI assistants.
//!
//! ## Features
//!
//! - **OAuth2 authentication**: browser-based authorization with a local callback receiver
//! - **Daily and trend tools**: formatted reports, multi-day trend analysis and ASCII charts
//! - **Two transports**: stdio for desktop clients, HTTP/WebSocket for remote clients
//! - **Custom prompt**: a persisted prompt handed to clients at `initialize`
//!
//! ## Quick Start
//!
//! 1. Set `WHOOP_CLIENT_ID` and `WHOOP_CLIENT_SECRET`
//! 2. Run `whoop-auth login` (or call the `authenticate_with_whoop` tool)
//! 3. Start `whoop-mcp` from your MCP client, or `whoop-web-server` for remote use
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use whoop_mcp_server::config::WhoopConfig;
//! use whoop_mcp_server::mcp::tools::ToolRegistry;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let registry = Arc::new(ToolRegistry::from_config(WhoopConfig::from_env()));
//!
//!     let text = registry
//!         .call_tool("get_recovery_trends", &serde_json::json!({ "days": 7 }))
//!         .await?;
//!     println!("{}", text);
//!
//!     Ok(())
//! }
//! ```

/// Application constants and configuration values
pub mod constants;

/// Environment-driven configuration
pub mod config;

/// Production logging and structured output
pub mod logging;

/// Error types shared across the crate
pub mod errors;

/// On-disk OAuth token persistence
pub mod token_store;

/// OAuth2 client and interactive authorization flow
pub mod oauth2_client;

/// Authenticated WHOOP API client
pub mod whoop_client;

/// WHOOP API record types
pub mod models;

/// Date parsing, windows and display time zone
pub mod dates;

/// Text rendering for single records
pub mod formatters;

/// Multi-day trend analysis
pub mod trends;

/// Sleep, load and readiness analysis
pub mod analysis;

/// Daily summary with recommendations
pub mod summary;

/// Custom prompt persistence
pub mod prompt_store;

/// Model Context Protocol server implementation
pub mod mcp;

/// HTTP and WebSocket transport
pub mod web;

/// Health checks and monitoring
pub mod health;

/// Parallel task API demo driver
pub mod demo;
