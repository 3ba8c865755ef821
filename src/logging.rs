// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Structured logging setup and application event helpers

use anyhow::Result;
use serde_json::json;
use std::env;
use std::io;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty, compact)
    pub format: LogFormat,
    /// Where log lines are written
    pub writer: LogWriter,
    /// Include source file and line numbers
    pub include_location: bool,
    /// Include span enter/exit events
    pub include_spans: bool,
    /// Service name for structured logging
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Environment (development, production)
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON lines for production
    Json,
    /// Multi-line human output
    Pretty,
    /// Single-line human output
    Compact,
}

/// Output stream for the subscriber.
///
/// The stdio MCP server must keep stdout free for protocol frames, so it logs to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogWriter {
    Stdout,
    Stderr,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            writer: LogWriter::Stdout,
            include_location: false,
            include_spans: false,
            service_name: "whoop-mcp".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Create logging configuration from environment variables
    pub fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let is_production = environment == "production";

        let format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") => LogFormat::Pretty,
            Ok("compact") => LogFormat::Compact,
            _ if is_production => LogFormat::Json,
            _ => LogFormat::Compact,
        };

        Self {
            level,
            format,
            writer: LogWriter::Stdout,
            include_location: is_production || env::var("LOG_INCLUDE_LOCATION").is_ok(),
            include_spans: env::var("LOG_INCLUDE_SPANS").is_ok(),
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| "whoop-mcp".to_string()),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment,
        }
    }

    pub fn with_writer(mut self, writer: LogWriter) -> Self {
        self.writer = writer;
        self
    }

    /// Initialize the global tracing subscriber
    pub fn init(&self) -> Result<()> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let span_events = if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let make_writer = match self.writer {
            LogWriter::Stdout => fmt::writer::BoxMakeWriter::new(io::stdout),
            LogWriter::Stderr => fmt::writer::BoxMakeWriter::new(io::stderr),
        };

        let base = fmt::layer()
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_writer(make_writer)
            .with_span_events(span_events);

        let registry = tracing_subscriber::registry().with(env_filter);
        match self.format {
            LogFormat::Json => registry.with(base.json()).try_init()?,
            LogFormat::Pretty => registry.with(base.pretty()).try_init()?,
            LogFormat::Compact => registry.with(base.compact().with_target(false)).try_init()?,
        }

        self.log_startup_info();
        Ok(())
    }

    fn log_startup_info(&self) {
        let summary = json!({
            "service": {
                "name": self.service_name,
                "version": self.service_version,
                "environment": self.environment
            },
            "logging": {
                "level": self.level,
                "format": format!("{:?}", self.format),
                "location": self.include_location,
                "spans": self.include_spans
            }
        });

        info!(
            service.name = %self.service_name,
            service.version = %self.service_version,
            environment = %self.environment,
            "Logging initialized: {}",
            summary
        );
    }
}

/// Initialize logging from environment
pub fn init_from_env() -> Result<()> {
    LoggingConfig::from_env().init()
}

/// Initialize logging to stderr, for processes that speak a protocol on stdout
pub fn init_stderr() -> Result<()> {
    LoggingConfig::from_env().with_writer(LogWriter::Stderr).init()
}

/// Application-specific logging utilities
pub struct AppLogger;

impl AppLogger {
    /// Log OAuth flow transitions. Never pass codes or tokens as `detail`.
    pub fn log_oauth_event(event: &str, success: bool, detail: Option<&str>) {
        info!(
            oauth.provider = "whoop",
            oauth.event = %event,
            oauth.success = %success,
            oauth.detail = detail.unwrap_or(""),
            "OAuth event"
        );
    }

    /// Log HTTP requests handled by the web shim
    pub fn log_api_request(method: &str, path: &str, status: u16, duration_ms: u64, client_ip: &str) {
        info!(
            http.method = %method,
            http.path = %path,
            http.status = %status,
            http.duration_ms = %duration_ms,
            client.ip = %client_ip,
            "HTTP request"
        );
    }

    /// Log outbound calls to the WHOOP API
    pub fn log_vendor_request(method: &str, url: &str, status: Option<u16>, duration_ms: u64) {
        info!(
            vendor.method = %method,
            vendor.url = %strip_query(url),
            vendor.status = status.map(|s| s.to_string()).unwrap_or_else(|| "error".to_string()),
            vendor.duration_ms = %duration_ms,
            "WHOOP API request"
        );
    }

    /// Log MCP tool calls
    pub fn log_mcp_tool_call(transport: &str, tool_name: &str, success: bool, duration_ms: u64) {
        info!(
            mcp.transport = %transport,
            mcp.tool = %tool_name,
            mcp.success = %success,
            mcp.duration_ms = %duration_ms,
            "MCP tool call"
        );
    }

    /// Log security events
    pub fn log_security_event(event_type: &str, severity: &str, details: &str, client_ip: Option<&str>) {
        warn!(
            security.event = %event_type,
            security.severity = %severity,
            security.details = %details,
            client.ip = client_ip.unwrap_or("unknown"),
            "Security event"
        );
    }
}

/// Drop the query string so cursors and dates stay out of the logs
fn strip_query(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_logging_config_from_env() {
        env::set_var("RUST_LOG", "debug");
        env::remove_var("LOG_FORMAT");
        env::set_var("ENVIRONMENT", "production");
        env::set_var("SERVICE_NAME", "test-service");

        let config = LoggingConfig::from_env();

        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.environment, "production");
        assert_eq!(config.service_name, "test-service");
        assert!(config.include_location);

        env::remove_var("RUST_LOG");
        env::remove_var("ENVIRONMENT");
        env::remove_var("SERVICE_NAME");
    }

    #[test]
    #[serial]
    fn test_explicit_format_wins_in_production() {
        env::set_var("ENVIRONMENT", "production");
        env::set_var("LOG_FORMAT", "pretty");

        assert_eq!(LoggingConfig::from_env().format, LogFormat::Pretty);

        env::remove_var("ENVIRONMENT");
        env::remove_var("LOG_FORMAT");
    }

    #[test]
    fn test_default_logging_config() {
        let config = LoggingConfig::default();

        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.writer, LogWriter::Stdout);
        assert_eq!(config.service_name, "whoop-mcp");
        assert!(!config.include_location);
    }

    #[test]
    fn test_strip_query() {
        assert_eq!(
            strip_query("https://api/v2/cycle?start=2024-01-01&nextToken=abc"),
            "https://api/v2/cycle"
        );
        assert_eq!(strip_query("https://api/v2/cycle"), "https://api/v2/cycle");
    }
}
