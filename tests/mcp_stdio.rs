// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Integration tests for the line-delimited stdio transport

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::BufReader;
use whoop_mcp_server::constants::{errors, messages};
use whoop_mcp_server::errors::WhoopResult;
use whoop_mcp_server::mcp::tools::ToolRegistry;
use whoop_mcp_server::mcp::McpServer;
use whoop_mcp_server::prompt_store::PromptStore;
use whoop_mcp_server::token_store::TokenStore;
use whoop_mcp_server::whoop_client::{Query, WhoopApi};

struct EmptyApi;

#[async_trait]
impl WhoopApi for EmptyApi {
    async fn get(&self, _path: &str, _query: &Query) -> WhoopResult<Value> {
        Ok(json!({ "records": [] }))
    }
}

fn server(dir: &TempDir) -> McpServer {
    McpServer::new(Arc::new(ToolRegistry::new(
        Arc::new(EmptyApi),
        TokenStore::new(dir.path().join("token.json")),
        PromptStore::new(dir.path().join("prompt.json")),
    )))
}

/// Feed `frames` as stdin and collect every response line
async fn exchange(server: &McpServer, frames: &[&str]) -> Vec<Value> {
    let input = frames.join("\n") + "\n";
    let mut output: Vec<u8> = Vec::new();

    server
        .serve(BufReader::new(input.as_bytes()), &mut output)
        .await
        .unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_session_over_stdio() {
    let dir = TempDir::new().unwrap();
    let server = server(&dir);

    let responses = exchange(
        &server,
        &[
            r#"{"jsonrpc":"2.0","method":"initialize","params":{"protocolVersion":"2024-11-05"},"id":0}"#,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "",
            r#"{"jsonrpc":"2.0","method":"tools/list","id":1}"#,
            r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"check_authentication_status"},"id":2}"#,
            r#"{"jsonrpc":"2.0","method":"resources/read","id":3}"#,
        ],
    )
    .await;

    // The notification and blank line produce nothing
    assert_eq!(responses.len(), 4);
    assert_eq!(responses[0]["id"], 0);
    assert!(responses[0]["result"]["capabilities"].is_object());
    assert_eq!(responses[1]["result"]["tools"].as_array().unwrap().len(), 23);
    assert_eq!(responses[2]["result"]["content"][0]["type"], "text");
    assert_eq!(responses[2]["result"]["content"][0]["text"], messages::NOT_AUTHENTICATED);
    assert_eq!(responses[3]["error"]["code"], errors::ERROR_METHOD_NOT_FOUND);
    assert_eq!(responses[3]["error"]["message"], "Method not found: resources/read");
}

#[tokio::test]
async fn test_custom_prompt_reaches_initialize() {
    let dir = TempDir::new().unwrap();
    let server = server(&dir);

    let responses = exchange(
        &server,
        &[
            r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"set_custom_prompt","arguments":{"prompt":"Answer in metric units"}},"id":1}"#,
            r#"{"jsonrpc":"2.0","method":"initialize","id":2}"#,
            r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"set_custom_prompt","arguments":{}},"id":3}"#,
            r#"{"jsonrpc":"2.0","method":"initialize","id":4}"#,
        ],
    )
    .await;

    assert_eq!(
        responses[0]["result"]["content"][0]["text"],
        "Custom prompt set successfully: 'Answer in metric units'"
    );
    assert_eq!(responses[1]["result"]["instructions"], "Answer in metric units");
    assert_eq!(responses[2]["result"]["content"][0]["text"], "Custom prompt cleared successfully.");
    assert!(responses[3]["result"].get("instructions").is_none());
}

#[tokio::test]
async fn test_malformed_frames_get_error_responses() {
    let dir = TempDir::new().unwrap();
    let server = server(&dir);

    let responses = exchange(&server, &["{oops", r#""just a string""#]).await;

    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["error"]["code"], errors::ERROR_PARSE);
    assert_eq!(responses[0]["id"], Value::Null);
    assert_eq!(responses[1]["error"]["code"], errors::ERROR_INVALID_PARAMS);
}
