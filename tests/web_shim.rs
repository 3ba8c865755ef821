// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Integration tests for the HTTP/WebSocket transport

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use whoop_mcp_server::config::{
    Environment, RateLimitConfig, SecurityConfig, ServerConfig, WhoopConfig,
};
use whoop_mcp_server::constants::{errors, messages, protocol};
use whoop_mcp_server::errors::WhoopResult;
use whoop_mcp_server::mcp::tools::ToolRegistry;
use whoop_mcp_server::prompt_store::PromptStore;
use whoop_mcp_server::token_store::TokenStore;
use whoop_mcp_server::web::{routes, WebState};
use whoop_mcp_server::whoop_client::{Query, WhoopApi};

const API_KEY: &str = "test-api-key";

struct EmptyApi;

#[async_trait]
impl WhoopApi for EmptyApi {
    async fn get(&self, _path: &str, _query: &Query) -> WhoopResult<Value> {
        Ok(json!({ "records": [] }))
    }
}

fn server_config(dir: &Path, token_url: &str, requests_per_window: u32) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 8080,
        environment: Environment::Development,
        log_level: "info".to_string(),
        whoop: WhoopConfig {
            client_id: Some("client-123".to_string()),
            client_secret: Some("secret-456".to_string()),
            redirect_uri: "http://localhost:8080/whoop/callback".to_string(),
            api_base: "http://127.0.0.1:9".to_string(),
            auth_url: "https://api.prod.whoop.com/oauth/oauth2/auth".to_string(),
            token_url: token_url.to_string(),
            token_file: dir.join("token.json"),
            prompt_file: dir.join("prompt.json"),
        },
        security: SecurityConfig {
            api_key: API_KEY.to_string(),
            api_key_generated: false,
            cors_origins: vec!["*".to_string()],
            rate_limit: RateLimitConfig {
                enabled: true,
                requests_per_window,
                window_seconds: 60,
            },
            max_request_size: 10_000,
        },
    }
}

fn state_with(config: ServerConfig) -> Arc<WebState> {
    let registry = Arc::new(ToolRegistry::new(
        Arc::new(EmptyApi),
        TokenStore::new(config.whoop.token_file.clone()),
        PromptStore::new(config.whoop.prompt_file.clone()),
    ));
    Arc::new(WebState::new(config, registry))
}

fn test_state(dir: &TempDir) -> Arc<WebState> {
    state_with(server_config(dir.path(), "http://127.0.0.1:9/token", 100))
}

fn body_json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn test_root_is_public_and_carries_security_headers() {
    let dir = TempDir::new().unwrap();
    let routes = routes(test_state(&dir));

    let response = warp::test::request().path("/").reply(&routes).await;

    assert_eq!(response.status(), 200);
    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-xss-protection"], "1; mode=block");
    assert_eq!(headers["strict-transport-security"], "max-age=31536000; includeSubDomains");
    assert_eq!(headers["referrer-policy"], "strict-origin-when-cross-origin");

    let body = body_json(response.body());
    assert_eq!(body["name"], protocol::SERVER_DISPLAY_NAME);
    assert_eq!(body["security"]["protected_endpoints"], json!(["/mcp", "/auth", "/tools"]));
}

#[tokio::test]
async fn test_protected_routes_require_api_key() {
    let dir = TempDir::new().unwrap();
    let routes = routes(test_state(&dir));

    for path in ["/tools", "/auth"] {
        let response = warp::test::request().path(path).reply(&routes).await;
        assert_eq!(response.status(), 401, "{}", path);
        assert_eq!(body_json(response.body())["error"], messages::UNAUTHORIZED);
        assert_eq!(response.headers()["x-frame-options"], "DENY");
    }

    let wrong_key = warp::test::request()
        .method("POST")
        .path("/mcp")
        .header("x-api-key", "nope")
        .body(r#"{"jsonrpc":"2.0","method":"ping","id":1}"#)
        .reply(&routes)
        .await;
    assert_eq!(wrong_key.status(), 401);

    let truncated_key = warp::test::request()
        .path("/tools")
        .header("x-api-key", &API_KEY[..API_KEY.len() - 1])
        .reply(&routes)
        .await;
    assert_eq!(truncated_key.status(), 401);

    let tools = warp::test::request()
        .path("/tools")
        .header("x-api-key", API_KEY)
        .reply(&routes)
        .await;
    assert_eq!(tools.status(), 200);
    assert_eq!(body_json(tools.body())["tools"].as_array().unwrap().len(), 23);
}

#[tokio::test]
async fn test_rate_limit_returns_429() {
    let dir = TempDir::new().unwrap();
    let routes = routes(state_with(server_config(dir.path(), "http://127.0.0.1:9/token", 2)));

    let request = || warp::test::request().path("/health").header("x-forwarded-for", "203.0.113.7");
    assert_eq!(request().reply(&routes).await.status(), 200);
    assert_eq!(request().reply(&routes).await.status(), 200);

    let limited = request().reply(&routes).await;
    assert_eq!(limited.status(), 429);
    assert_eq!(body_json(limited.body())["error"], messages::RATE_LIMITED);

    let other_client = warp::test::request()
        .path("/health")
        .header("x-forwarded-for", "198.51.100.1, 10.0.0.1")
        .reply(&routes)
        .await;
    assert_eq!(other_client.status(), 200);
}

async fn post_mcp<F>(routes: &F, body: &str) -> (u16, Vec<u8>)
where
    F: warp::Filter + 'static,
    F::Extract: warp::Reply + Send,
{
    let response = warp::test::request()
        .method("POST")
        .path("/mcp")
        .header("x-api-key", API_KEY)
        .header("content-type", "application/json")
        .body(body.to_string())
        .reply(routes)
        .await;
    (response.status().as_u16(), response.body().to_vec())
}

#[tokio::test]
async fn test_http_mcp_round_trip() {
    let dir = TempDir::new().unwrap();
    let routes = routes(test_state(&dir));

    let (status, body) = post_mcp(&routes, r#"{"jsonrpc":"2.0","method":"initialize","params":{},"id":1}"#).await;
    assert_eq!(status, 200);
    let init = body_json(&body);
    assert_eq!(init["id"], 1);
    assert_eq!(init["result"]["protocolVersion"], protocol::MCP_PROTOCOL_VERSION);
    assert_eq!(init["result"]["serverInfo"]["name"], "whoop-mcp");

    let (_, body) = post_mcp(&routes, r#"{"jsonrpc":"2.0","method":"tools/list","id":2}"#).await;
    assert_eq!(body_json(&body)["result"]["tools"].as_array().unwrap().len(), 23);

    let (_, body) = post_mcp(
        &routes,
        r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"no_such_tool","arguments":{}},"id":3}"#,
    )
    .await;
    let missing = body_json(&body);
    assert_eq!(missing["error"]["code"], errors::ERROR_METHOD_NOT_FOUND);
    assert_eq!(missing["error"]["message"], "Tool not found: no_such_tool");

    let (status, body) = post_mcp(&routes, r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).await;
    assert_eq!(status, 202);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_http_mcp_rejects_malformed_bodies() {
    let dir = TempDir::new().unwrap();
    let routes = routes(test_state(&dir));

    let (status, body) = post_mcp(&routes, "{not json").await;
    assert_eq!(status, 400);
    let parse_error = body_json(&body);
    assert_eq!(parse_error["error"]["code"], errors::ERROR_PARSE);
    assert_eq!(parse_error["error"]["message"], messages::INVALID_JSON);
    assert_eq!(parse_error["id"], Value::Null);

    let (status, body) = post_mcp(&routes, "[1, 2, 3]").await;
    assert_eq!(status, 400);
    assert_eq!(body_json(&body)["error"]["message"], messages::INVALID_REQUEST);

    let oversized = format!(r#"{{"jsonrpc":"2.0","method":"ping","pad":"{}"}}"#, "x".repeat(10_001));
    let (status, body) = post_mcp(&routes, &oversized).await;
    assert_eq!(status, 400);
    assert_eq!(body_json(&body)["error"]["code"], errors::ERROR_INVALID_PARAMS);
}

#[tokio::test]
async fn test_auth_status_reflects_token_file() {
    let dir = TempDir::new().unwrap();
    let routes = routes(test_state(&dir));
    let request = || warp::test::request().path("/auth").header("x-api-key", API_KEY);

    let response = request().reply(&routes).await;
    assert_eq!(body_json(response.body()), json!({ "authenticated": false }));

    std::fs::write(
        dir.path().join("token.json"),
        r#"{"access_token":"abc","token_type":"bearer","expires_in":3600}"#,
    )
    .unwrap();
    let response = request().reply(&routes).await;
    assert_eq!(
        body_json(response.body()),
        json!({ "authenticated": true, "token_type": "bearer", "expires_in": 3600 })
    );
}

#[tokio::test]
async fn test_whoop_auth_issues_state_and_callback_redeems_it() {
    let dir = TempDir::new().unwrap();
    let mut server = mockito::Server::new_async().await;
    let token_mock = server
        .mock("POST", "/token")
        .with_status(200)
        .with_body(r#"{"access_token":"web-token","token_type":"bearer","expires_in":3600}"#)
        .expect(1)
        .create_async()
        .await;

    let config = server_config(dir.path(), &format!("{}/token", server.url()), 100);
    let routes = routes(state_with(config));

    let start = warp::test::request().path("/whoop/auth").reply(&routes).await;
    assert_eq!(start.status(), 200);
    let start = body_json(start.body());
    let state = start["state"].as_str().unwrap().to_string();
    assert_eq!(state.len(), 32);
    assert!(start["auth_url"].as_str().unwrap().contains(&format!("state={}", state)));
    assert_eq!(start["callback_uri"], "http://localhost:8080/whoop/callback");

    let unknown = warp::test::request()
        .path("/whoop/callback?code=abc&state=forged")
        .reply(&routes)
        .await;
    assert_eq!(unknown.status(), 400);
    assert_eq!(body_json(unknown.body())["error"], "Invalid state parameter");

    let callback = warp::test::request()
        .path(&format!("/whoop/callback?code=abc&state={}", state))
        .reply(&routes)
        .await;
    assert_eq!(callback.status(), 200);
    let callback = body_json(callback.body());
    assert_eq!(callback["success"], true);
    assert_eq!(callback["token_type"], "bearer");
    token_mock.assert_async().await;

    let saved = std::fs::read_to_string(dir.path().join("token.json")).unwrap();
    assert!(saved.contains("web-token"));

    // States are single use
    let replay = warp::test::request()
        .path(&format!("/whoop/callback?code=abc&state={}", state))
        .reply(&routes)
        .await;
    assert_eq!(replay.status(), 400);
}

#[tokio::test]
async fn test_callback_reports_vendor_error() {
    let dir = TempDir::new().unwrap();
    let routes = routes(test_state(&dir));

    let response = warp::test::request()
        .path("/whoop/callback?error=access_denied")
        .reply(&routes)
        .await;

    assert_eq!(response.status(), 400);
    let body = body_json(response.body());
    assert_eq!(body["error"], "WHOOP authentication failed");
    assert_eq!(body["details"], "access_denied");
}

#[tokio::test]
async fn test_whoop_auth_without_credentials() {
    let dir = TempDir::new().unwrap();
    let mut config = server_config(dir.path(), "http://127.0.0.1:9/token", 100);
    config.whoop.client_id = None;
    let routes = routes(state_with(config));

    let response = warp::test::request().path("/whoop/auth").reply(&routes).await;
    assert_eq!(response.status(), 500);
    assert_eq!(body_json(response.body())["error"], "WHOOP client ID not configured");
}

#[tokio::test]
async fn test_websocket_rejects_missing_key() {
    let dir = TempDir::new().unwrap();
    let (addr, server) = warp::serve(routes(test_state(&dir))).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);

    let (mut socket, _) = connect_async(format!("ws://{}/mcp", addr)).await.unwrap();
    let message = timeout(Duration::from_secs(5), socket.next())
        .await
        .expect("server did not close in time")
        .expect("stream ended without a close frame")
        .unwrap();

    match message {
        Message::Close(Some(frame)) => {
            assert_eq!(u16::from(frame.code), errors::WS_CLOSE_POLICY_VIOLATION);
            assert_eq!(frame.reason, messages::WS_UNAUTHORIZED);
        }
        other => panic!("expected a close frame, got {:?}", other),
    }
}

#[tokio::test]
async fn test_websocket_serves_requests() {
    let dir = TempDir::new().unwrap();
    let routes = routes(test_state(&dir));

    let mut client = warp::test::ws()
        .path("/mcp")
        .header("x-api-key", API_KEY)
        .handshake(routes)
        .await
        .expect("handshake");

    client.send_text(r#"{"jsonrpc":"2.0","method":"ping","id":"a"}"#).await;
    let reply = client.recv().await.expect("reply");
    let reply: Value = serde_json::from_str(reply.to_str().unwrap()).unwrap();
    assert_eq!(reply["id"], "a");
    assert_eq!(reply["result"], json!({}));

    client.send_text("garbage").await;
    let reply = client.recv().await.expect("reply");
    let reply: Value = serde_json::from_str(reply.to_str().unwrap()).unwrap();
    assert_eq!(reply["error"]["code"], errors::ERROR_PARSE);
}
