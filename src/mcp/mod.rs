// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # MCP Server
//!
//! JSON-RPC message handling shared by every transport, and the
//! line-delimited stdio server used by desktop MCP clients.

pub mod schema;
pub mod tools;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info, warn};

use crate::constants::{errors, limits, messages, protocol};
use crate::errors::ToolError;
use crate::logging::AppLogger;
use crate::mcp::schema::{InitializeResponse, ToolResponse, ToolsListResponse};
use crate::mcp::tools::ToolRegistry;

#[derive(Debug, Deserialize)]
pub struct McpRequest {
    #[allow(dead_code)]
    #[serde(default)]
    jsonrpc: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
    pub id: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct McpError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: protocol::JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id: id.unwrap_or(Value::Null),
        }
    }

    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: protocol::JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(McpError {
                code,
                message: message.into(),
                data: None,
            }),
            id: id.unwrap_or(Value::Null),
        }
    }
}

/// Validate a raw frame. The `Err` side is the response to send back.
pub fn parse_message(raw: &str, max_size: usize) -> Result<McpRequest, McpResponse> {
    if raw.len() > max_size {
        return Err(McpResponse::error(
            None,
            errors::ERROR_INVALID_PARAMS,
            messages::INVALID_REQUEST,
        ));
    }

    let value: Value = serde_json::from_str(raw)
        .map_err(|_| McpResponse::error(None, errors::ERROR_PARSE, messages::INVALID_JSON))?;

    let id = value.get("id").cloned();
    if !value.is_object() {
        return Err(McpResponse::error(
            id,
            errors::ERROR_INVALID_PARAMS,
            messages::INVALID_REQUEST,
        ));
    }

    serde_json::from_value(value)
        .map_err(|_| McpResponse::error(id, errors::ERROR_INVALID_PARAMS, messages::INVALID_REQUEST))
}

/// Handle one request. Notifications produce no response.
pub async fn handle_request(
    registry: &ToolRegistry,
    request: McpRequest,
    transport: &str,
) -> Option<McpResponse> {
    let method = request.method.clone().unwrap_or_default();
    let id = request.id.clone();

    if method.starts_with("notifications/") {
        return None;
    }

    let response = match method.as_str() {
        "initialize" => {
            let init_response = InitializeResponse::new(
                protocol::MCP_PROTOCOL_VERSION.to_string(),
                protocol::SERVER_NAME.to_string(),
                protocol::SERVER_VERSION.to_string(),
            )
            .with_instructions(registry.prompts().load().await);

            McpResponse::success(id, to_value(&init_response))
        }
        "ping" => McpResponse::success(id, json!({})),
        "tools/list" => McpResponse::success(
            id,
            to_value(&ToolsListResponse {
                tools: registry.schemas(),
            }),
        ),
        "prompts/list" => McpResponse::success(id, json!({ "prompts": [] })),
        "resources/list" => McpResponse::success(id, json!({ "resources": [] })),
        "tools/call" => handle_tool_call(registry, request, transport).await,
        _ => McpResponse::error(
            id,
            errors::ERROR_METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        ),
    };

    Some(response)
}

async fn handle_tool_call(registry: &ToolRegistry, request: McpRequest, transport: &str) -> McpResponse {
    let params = request.params.unwrap_or_default();
    let tool_name = params["name"].as_str().unwrap_or("").to_string();
    let args = params.get("arguments").cloned().unwrap_or(Value::Null);

    let started = Instant::now();
    let outcome = registry.call_tool(&tool_name, &args).await;
    let elapsed = started.elapsed().as_millis() as u64;
    AppLogger::log_mcp_tool_call(transport, &tool_name, outcome.is_ok(), elapsed);

    match outcome {
        Ok(text) => McpResponse::success(request.id, to_value(&ToolResponse::text(text))),
        Err(ToolError::NotFound(name)) => McpResponse::error(
            request.id,
            errors::ERROR_METHOD_NOT_FOUND,
            format!("Tool not found: {}", name),
        ),
        Err(e) => {
            // Detail stays in the log
            error!(tool = %tool_name, error = %e, "Tool execution failed");
            McpResponse::error(request.id, errors::ERROR_INTERNAL_ERROR, messages::TOOL_FAILED)
        }
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Line-delimited JSON-RPC over stdin/stdout
pub struct McpServer {
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub async fn run_stdio(self) -> Result<()> {
        info!("MCP server listening on stdio");
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    /// Serve until `reader` reaches EOF
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let response = match parse_message(&line, limits::MAX_STDIO_MESSAGE_SIZE) {
                Ok(request) => handle_request(&self.registry, request, "stdio").await,
                Err(response) => {
                    warn!("Rejected malformed stdio frame");
                    Some(response)
                }
            };

            if let Some(response) = response {
                let mut frame = serde_json::to_string(&response)?;
                frame.push('\n');
                writer.write_all(frame.as_bytes()).await?;
                writer.flush().await?;
            }
        }

        info!("stdin closed, shutting down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt_store::PromptStore;
    use crate::token_store::TokenStore;
    use crate::whoop_client::{Query, WhoopApi};
    use crate::errors::WhoopResult;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct NoData;

    #[async_trait]
    impl WhoopApi for NoData {
        async fn get(&self, _path: &str, _query: &Query) -> WhoopResult<Value> {
            Ok(json!({ "records": [] }))
        }
    }

    fn registry(dir: &TempDir) -> ToolRegistry {
        ToolRegistry::new(
            Arc::new(NoData),
            TokenStore::new(dir.path().join("token.json")),
            PromptStore::new(dir.path().join("prompt.json")),
        )
    }

    async fn call(registry: &ToolRegistry, raw: &str) -> Option<Value> {
        let response = match parse_message(raw, 10_000) {
            Ok(request) => handle_request(registry, request, "test").await,
            Err(response) => Some(response),
        };
        response.map(|r| serde_json::to_value(r).unwrap())
    }

    #[tokio::test]
    async fn test_initialize() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        let response = call(&registry, r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#)
            .await
            .unwrap();

        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(response["result"]["serverInfo"]["name"], "whoop-mcp");
        assert!(response.get("error").is_none());
    }

    #[tokio::test]
    async fn test_initialize_carries_custom_prompt() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        registry.prompts().save(Some("Coach me gently")).await.unwrap();

        let response = call(&registry, r#"{"id":1,"method":"initialize"}"#).await.unwrap();
        assert_eq!(response["result"]["instructions"], "Coach me gently");
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        let parse = call(&registry, "{not json").await.unwrap();
        assert_eq!(parse["error"]["code"], -32700);
        assert_eq!(parse["error"]["message"], "Invalid JSON format");
        assert!(parse["id"].is_null());

        let array = call(&registry, "[1,2,3]").await.unwrap();
        assert_eq!(array["error"]["code"], -32602);

        let oversized = format!(r#"{{"id":1,"method":"{}"}}"#, "x".repeat(10_001));
        let oversized = call(&registry, &oversized).await.unwrap();
        assert_eq!(oversized["error"]["message"], "Invalid request format");

        let unknown = call(&registry, r#"{"id":7,"method":"resources/read"}"#).await.unwrap();
        assert_eq!(unknown["error"]["code"], -32601);
        assert_eq!(unknown["error"]["message"], "Method not found: resources/read");
        assert_eq!(unknown["id"], 7);
    }

    #[tokio::test]
    async fn test_tool_call_envelopes() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);

        let ok = call(
            &registry,
            r#"{"id":"a","method":"tools/call","params":{"name":"get_current_prompt"}}"#,
        )
        .await
        .unwrap();
        assert_eq!(ok["result"]["content"][0]["type"], "text");
        assert_eq!(ok["result"]["content"][0]["text"], "No custom prompt is currently set.");

        let missing = call(
            &registry,
            r#"{"id":"b","method":"tools/call","params":{"name":"nope","arguments":{}}}"#,
        )
        .await
        .unwrap();
        assert_eq!(missing["error"]["code"], -32601);
        assert_eq!(missing["error"]["message"], "Tool not found: nope");

        let bad_args = call(
            &registry,
            r#"{"id":"c","method":"tools/call","params":{"name":"get_recovery_trends","arguments":{"days":[1]}}}"#,
        )
        .await
        .unwrap();
        assert_eq!(bad_args["error"]["code"], -32603);
        assert_eq!(
            bad_args["error"]["message"],
            "Tool execution failed. Please check your authentication and try again."
        );
    }

    #[tokio::test]
    async fn test_notifications_get_no_reply() {
        let dir = TempDir::new().unwrap();
        let registry = registry(&dir);
        assert!(call(&registry, r#"{"method":"notifications/initialized"}"#).await.is_none());
    }

    #[tokio::test]
    async fn test_stdio_serve_writes_one_line_per_response() {
        let dir = TempDir::new().unwrap();
        let server = McpServer::new(Arc::new(registry(&dir)));
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n"
        );

        let mut output = Vec::new();
        server
            .serve(tokio::io::BufReader::new(input.as_bytes()), &mut output)
            .await
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["result"]["tools"].as_array().unwrap().len(), 23);
        assert_eq!(lines[1]["id"], 2);
    }
}
