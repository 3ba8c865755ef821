// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! End-to-end tests for the interactive OAuth flow against a mock token endpoint

use mockito::Matcher;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;
use whoop_mcp_server::config::WhoopConfig;
use whoop_mcp_server::constants::messages;
use whoop_mcp_server::oauth2_client::{FlowState, OAuth2Client, OAuth2Config, OAuthFlow};
use whoop_mcp_server::token_store::TokenStore;

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn client(dir: &TempDir, base_url: &str) -> OAuth2Client {
    let mut config = WhoopConfig::from_env().with_base_url(base_url);
    config.client_id = Some("client-123".to_string());
    config.client_secret = Some("secret-456".to_string());
    config.token_file = dir.path().join("token.json");

    let oauth_config = OAuth2Config::from_whoop(&config).unwrap();
    OAuth2Client::new(oauth_config, TokenStore::new(config.token_file.clone()))
}

/// Browser stand-in: follows the redirect with `code`, optionally overriding `state`
fn redirecting_browser(
    port: u16,
    code: &'static str,
    forced_state: Option<&'static str>,
) -> impl Fn(&str) -> std::io::Result<()> + Send + Sync + 'static {
    move |auth_url: &str| {
        let url = Url::parse(auth_url).unwrap();
        let state = url
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        let state = forced_state.map(str::to_string).unwrap_or(state);

        let callback = format!(
            "http://127.0.0.1:{}/whoop/callback?code={}&state={}",
            port, code, state
        );
        tokio::spawn(async move {
            let _ = reqwest::get(callback).await;
        });
        Ok(())
    }
}

#[tokio::test]
async fn test_flow_exchanges_code_and_saves_token() {
    let dir = TempDir::new().unwrap();
    let mut server = mockito::Server::new_async().await;
    let token_mock = server
        .mock("POST", "/oauth/oauth2/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
            Matcher::UrlEncoded("code".into(), "auth-code-1".into()),
            Matcher::UrlEncoded("client_id".into(), "client-123".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"new-access","refresh_token":"r1","token_type":"bearer","expires_in":3600}"#)
        .create_async()
        .await;

    let port = free_port();
    let flow = OAuthFlow::new(client(&dir, &server.url()))
        .with_callback_port(port)
        .with_timeout(Duration::from_secs(10))
        .with_browser_launcher(redirecting_browser(port, "auth-code-1", None));

    let message = flow.authenticate().await;

    assert!(message.contains("Successfully authenticated with WHOOP!"), "{}", message);
    assert!(message.contains("Token expires in 3600 seconds."));
    assert_eq!(flow.state().await, FlowState::Done(Ok(())));
    token_mock.assert_async().await;

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("token.json")).unwrap()).unwrap();
    assert_eq!(saved["access_token"], "new-access");
    assert_eq!(saved["refresh_token"], "r1");
}

#[tokio::test]
async fn test_flow_rejects_forged_state() {
    let dir = TempDir::new().unwrap();
    let mut server = mockito::Server::new_async().await;
    let token_mock = server
        .mock("POST", "/oauth/oauth2/token")
        .expect(0)
        .create_async()
        .await;

    let port = free_port();
    let flow = OAuthFlow::new(client(&dir, &server.url()))
        .with_callback_port(port)
        .with_timeout(Duration::from_secs(10))
        .with_browser_launcher(redirecting_browser(port, "auth-code-1", Some("forged")));

    assert_eq!(flow.authenticate().await, messages::STATE_MISMATCH);
    assert!(!dir.path().join("token.json").exists());
    token_mock.assert_async().await;
}

#[tokio::test]
async fn test_flow_reports_exchange_failure() {
    let dir = TempDir::new().unwrap();
    let mut server = mockito::Server::new_async().await;
    let _token_mock = server
        .mock("POST", "/oauth/oauth2/token")
        .with_status(400)
        .with_body(r#"{"error":"invalid_grant"}"#)
        .create_async()
        .await;

    let port = free_port();
    let flow = OAuthFlow::new(client(&dir, &server.url()))
        .with_callback_port(port)
        .with_timeout(Duration::from_secs(10))
        .with_browser_launcher(redirecting_browser(port, "stale-code", None));

    let message = flow.authenticate().await;
    assert!(message.starts_with("Error exchanging code for token: HTTP error 400"), "{}", message);
    assert!(!dir.path().join("token.json").exists());
}
