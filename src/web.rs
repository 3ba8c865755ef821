// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Web Server
//!
//! HTTP and WebSocket transport for the MCP tools, for remote clients that
//! cannot spawn the stdio server. Every response carries the security
//! headers; `/mcp`, `/tools` and `/auth` require the shared `X-API-Key`.

use anyhow::{Context, Result};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};
use uuid::Uuid;
use warp::http::header::{HeaderMap, HeaderName, HeaderValue};
use warp::http::StatusCode;
use warp::ws::{Message, WebSocket, Ws};
use warp::{Filter, Rejection, Reply};

use crate::config::ServerConfig;
use crate::constants::{errors, messages, oauth, protocol};
use crate::errors::WhoopError;
use crate::health::{middleware as health_routes, HealthChecker};
use crate::logging::AppLogger;
use crate::mcp::tools::ToolRegistry;
use crate::mcp::{handle_request, parse_message, McpResponse};
use crate::oauth2_client::callback::CallbackParams;
use crate::oauth2_client::{generate_state, OAuth2Client, OAuth2Config};
use crate::token_store::TokenStore;

/// Upper bound on bodies warp will buffer; the JSON-RPC size check happens after
const BODY_BUFFER_LIMIT: u64 = 1024 * 1024;

const PROTECTED_ENDPOINTS: [&str; 3] = ["/mcp", "/auth", "/tools"];

const SECURITY_HEADERS: [(&str, &str); 5] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
];

/// Sliding-window request counter keyed by client address
#[derive(Clone)]
pub struct RateLimiter {
    requests: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
    limit: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            requests: Arc::new(Mutex::new(HashMap::new())),
            limit: limit as usize,
            window,
        }
    }

    /// Record a request from `client` unless it is over the limit
    pub fn check(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut requests = self.requests.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter lock poisoned, recovering");
            poisoned.into_inner()
        });

        let window = self.window;
        requests.retain(|_, times| {
            times.retain(|t| now.duration_since(*t) < window);
            !times.is_empty()
        });

        let times = requests.entry(client.to_string()).or_default();
        if times.len() >= self.limit {
            return false;
        }
        times.push(now);
        true
    }
}

/// OAuth `state` values issued by `/whoop/auth` and not yet redeemed
#[derive(Clone)]
pub struct PendingStates {
    states: Arc<Mutex<HashMap<String, Instant>>>,
    ttl: Duration,
}

impl PendingStates {
    pub fn new(ttl: Duration) -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Instant>> {
        self.states.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, state: String) {
        let ttl = self.ttl;
        let mut states = self.lock();
        states.retain(|_, issued| issued.elapsed() < ttl);
        states.insert(state, Instant::now());
    }

    /// Redeem `state`. Unknown, reused and expired values all fail.
    pub fn take(&self, state: &str) -> bool {
        if state.is_empty() {
            return false;
        }
        match self.lock().remove(state) {
            Some(issued) => issued.elapsed() < self.ttl,
            None => false,
        }
    }
}

/// Everything the route handlers share
pub struct WebState {
    config: ServerConfig,
    registry: Arc<ToolRegistry>,
    oauth: Option<OAuth2Client>,
    tokens: TokenStore,
    pending: PendingStates,
    limiter: RateLimiter,
    health: Arc<HealthChecker>,
}

impl WebState {
    pub fn new(config: ServerConfig, registry: Arc<ToolRegistry>) -> Self {
        let tokens = TokenStore::new(config.whoop.token_file.clone());
        let oauth = OAuth2Config::from_whoop(&config.whoop)
            .ok()
            .map(|oauth_config| OAuth2Client::new(oauth_config, tokens.clone()));
        let limiter = RateLimiter::new(
            config.security.rate_limit.requests_per_window,
            Duration::from_secs(config.security.rate_limit.window_seconds),
        );
        let health = Arc::new(HealthChecker::new(config.whoop.clone(), config.environment));

        Self {
            registry,
            oauth,
            tokens,
            pending: PendingStates::new(Duration::from_secs(oauth::PENDING_STATE_TTL_SECS as u64)),
            limiter,
            health,
            config,
        }
    }

    /// State for the configured environment, backed by the real WHOOP client
    pub fn from_config(config: ServerConfig) -> Self {
        let registry = Arc::new(ToolRegistry::from_config(config.whoop.clone()));
        Self::new(config, registry)
    }

    fn api_key_valid(&self, provided: Option<&str>) -> bool {
        match provided {
            Some(key) if !key.is_empty() => key
                .as_bytes()
                .ct_eq(self.config.security.api_key.as_bytes())
                .into(),
            _ => false,
        }
    }
}

#[derive(Debug)]
struct Unauthorized;
impl warp::reject::Reject for Unauthorized {}

#[derive(Debug)]
struct RateLimited;
impl warp::reject::Reject for RateLimited {}

fn with_state(
    state: Arc<WebState>,
) -> impl Filter<Extract = (Arc<WebState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// First `X-Forwarded-For` entry, else the socket address
fn client_ip() -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    warp::header::optional::<String>("x-forwarded-for")
        .and(warp::addr::remote())
        .map(|forwarded: Option<String>, remote: Option<SocketAddr>| {
            forwarded
                .as_deref()
                .and_then(|xff| xff.split(',').next())
                .map(|ip| ip.trim().to_string())
                .filter(|ip| !ip.is_empty())
                .or_else(|| remote.map(|addr| addr.ip().to_string()))
                .unwrap_or_else(|| "unknown".to_string())
        })
}

fn rate_limit(
    state: Arc<WebState>,
) -> impl Filter<Extract = (String,), Error = Rejection> + Clone {
    client_ip().and_then(move |ip: String| {
        let state = state.clone();
        async move {
            if !state.config.security.rate_limit.enabled || state.limiter.check(&ip) {
                Ok(ip)
            } else {
                AppLogger::log_security_event("rate_limited", "medium", "Rate limit exceeded", Some(&ip));
                Err(warp::reject::custom(RateLimited))
            }
        }
    })
}

fn require_api_key(
    state: Arc<WebState>,
) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::header::optional::<String>("x-api-key")
        .and(client_ip())
        .and_then(move |key: Option<String>, ip: String| {
            let state = state.clone();
            async move {
                if state.api_key_valid(key.as_deref()) {
                    Ok(())
                } else {
                    AppLogger::log_security_event(
                        "unauthorized",
                        "medium",
                        "Missing or invalid X-API-Key",
                        Some(&ip),
                    );
                    Err(warp::reject::custom(Unauthorized))
                }
            }
        })
        .untuple_one()
}

/// All routes with CORS, rejection handling and security headers applied
pub fn routes(
    state: Arc<WebState>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let root = warp::path::end()
        .and(warp::get())
        .and(with_state(state.clone()))
        .map(|state: Arc<WebState>| warp::reply::json(&server_info(&state)));

    let tools = warp::path!("tools")
        .and(warp::get())
        .and(require_api_key(state.clone()))
        .and(with_state(state.clone()))
        .map(|state: Arc<WebState>| {
            let tools: Vec<Value> = state
                .registry
                .schemas()
                .into_iter()
                .map(|t| json!({ "name": t.name, "description": t.description }))
                .collect();
            warp::reply::json(&json!({ "tools": tools }))
        });

    let auth = warp::path!("auth")
        .and(warp::get())
        .and(require_api_key(state.clone()))
        .and(with_state(state.clone()))
        .and_then(auth_status_handler);

    let whoop_auth = warp::path!("whoop" / "auth")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(whoop_auth_handler);

    let whoop_callback = warp::path!("whoop" / "callback")
        .and(warp::get())
        .and(warp::query::raw().or(warp::any().map(String::new)).unify())
        .and(with_state(state.clone()))
        .and(client_ip())
        .and_then(whoop_callback_handler);

    let mcp_ws = warp::path!("mcp")
        .and(warp::ws())
        .and(warp::header::optional::<String>("x-api-key"))
        .and(with_state(state.clone()))
        .and(client_ip())
        .map(|ws: Ws, key: Option<String>, state: Arc<WebState>, ip: String| {
            let authorized = state.api_key_valid(key.as_deref());
            ws.on_upgrade(move |socket| websocket_session(socket, state, ip, authorized))
        });

    let mcp_http = warp::path!("mcp")
        .and(warp::post())
        .and(require_api_key(state.clone()))
        .and(warp::body::content_length_limit(BODY_BUFFER_LIMIT))
        .and(warp::body::bytes())
        .and(with_state(state.clone()))
        .and_then(mcp_http_handler);

    let cors = cors_for(&state);
    let mut security_headers = HeaderMap::new();
    for (name, value) in SECURITY_HEADERS {
        security_headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }

    let log = warp::log::custom(|info| {
        let client = info
            .remote_addr()
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        AppLogger::log_api_request(
            info.method().as_str(),
            info.path(),
            info.status().as_u16(),
            info.elapsed().as_millis() as u64,
            &client,
        );
    });

    let api = root
        .or(health_routes::routes(state.health.clone()))
        .or(tools)
        .or(auth)
        .or(whoop_auth)
        .or(whoop_callback)
        .or(mcp_ws)
        .or(mcp_http);

    rate_limit(state)
        .and(api)
        .map(|_ip: String, reply| reply)
        .with(cors)
        .recover(handle_rejection)
        .with(warp::reply::with::headers(security_headers))
        .with(log)
}

fn cors_for(state: &WebState) -> warp::cors::Builder {
    let cors = warp::cors()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["x-api-key", "content-type", "authorization"])
        .allow_credentials(true);

    if state.config.environment.is_production() {
        // warp panics on malformed origins
        let origins: Vec<&str> = state
            .config
            .security
            .cors_origins
            .iter()
            .map(String::as_str)
            .filter(|origin| *origin != "*" && url::Url::parse(origin).is_ok())
            .collect();
        cors.allow_origins(origins)
    } else {
        cors.allow_any_origin()
    }
}

fn server_info(state: &WebState) -> Value {
    let rate_limit = &state.config.security.rate_limit;
    json!({
        "name": protocol::SERVER_DISPLAY_NAME,
        "version": protocol::SERVER_VERSION,
        "description": "WHOOP Model Context Protocol Server with WHOOP API v2",
        "security": {
            "protected_endpoints": PROTECTED_ENDPOINTS,
            "authentication": "X-API-Key header required for protected endpoints",
            "rate_limit": format!(
                "{} requests per {} seconds",
                rate_limit.requests_per_window, rate_limit.window_seconds
            ),
        },
        "endpoints": {
            "health": "/health (public)",
            "whoop_auth": "/whoop/auth (public) - start WHOOP OAuth",
            "mcp_http": "/mcp (POST) (protected - requires X-API-Key)",
            "mcp_ws": "/mcp (WebSocket) (protected - requires X-API-Key)",
            "tools": "/tools (protected - requires X-API-Key)",
            "auth": "/auth (protected - requires X-API-Key)",
        },
        "usage": {
            "authentication": "Include 'X-API-Key: your-api-key' header for protected endpoints",
            "http_mcp": "POST JSON-RPC 2.0 messages to /mcp",
            "websocket_mcp": "Connect to /mcp (WebSocket) with the X-API-Key header",
        },
    })
}

async fn auth_status_handler(state: Arc<WebState>) -> Result<warp::reply::Response, Rejection> {
    let body = match state.tokens.load().await {
        Ok(record) => json!({
            "authenticated": true,
            "token_type": record.token_type_or_unknown(),
            "expires_in": record
                .expires_in
                .map(Value::from)
                .unwrap_or_else(|| Value::from("unknown")),
        }),
        Err(_) => json!({ "authenticated": false }),
    };
    Ok(warp::reply::json(&body).into_response())
}

fn json_status(body: Value, status: StatusCode) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(&body), status).into_response()
}

async fn whoop_auth_handler(state: Arc<WebState>) -> Result<warp::reply::Response, Rejection> {
    let Some(client) = &state.oauth else {
        return Ok(json_status(
            json!({
                "error": "WHOOP client ID not configured",
                "message": "Server configuration error. Please contact administrator.",
            }),
            StatusCode::INTERNAL_SERVER_ERROR,
        ));
    };

    let oauth_state = generate_state();
    let auth_url = match client.get_authorization_url(&oauth_state) {
        Ok(url) => url,
        Err(e) => {
            error!("Failed to build authorization URL: {}", e);
            return Ok(json_status(
                json!({ "error": "Authorization URL unavailable" }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }
    };

    state.pending.insert(oauth_state.clone());
    AppLogger::log_oauth_event("web_authorization_started", true, None);

    Ok(warp::reply::json(&json!({
        "auth_url": auth_url,
        "state": oauth_state,
        "instructions": "Visit the auth_url to authenticate with WHOOP",
        "callback_uri": client.config().redirect_uri,
    }))
    .into_response())
}

async fn whoop_callback_handler(
    query: String,
    state: Arc<WebState>,
    ip: String,
) -> Result<warp::reply::Response, Rejection> {
    let params = CallbackParams::from_query(&query);
    let state_valid = state.pending.take(&params.state);

    if !params.error.is_empty() {
        AppLogger::log_oauth_event("web_authorization", false, Some(&params.error));
        return Ok(json_status(
            json!({
                "error": "WHOOP authentication failed",
                "details": params.error,
                "message": "Please try authenticating again",
            }),
            StatusCode::BAD_REQUEST,
        ));
    }

    if !state_valid {
        AppLogger::log_security_event(
            "oauth_state_mismatch",
            "high",
            "Callback state unknown or expired",
            Some(&ip),
        );
        return Ok(json_status(
            json!({
                "error": "Invalid state parameter",
                "message": messages::STATE_MISMATCH,
            }),
            StatusCode::BAD_REQUEST,
        ));
    }

    if params.code.is_empty() {
        return Ok(json_status(
            json!({
                "error": "Missing authorization code",
                "message": "Please start the authentication process again",
            }),
            StatusCode::BAD_REQUEST,
        ));
    }

    let Some(client) = &state.oauth else {
        return Ok(json_status(
            json!({ "error": "WHOOP client ID not configured" }),
            StatusCode::INTERNAL_SERVER_ERROR,
        ));
    };

    match client.exchange_code(&params.code).await {
        Ok(token) => {
            info!("WHOOP authentication successful");
            Ok(warp::reply::json(&json!({
                "success": true,
                "message": "WHOOP authentication successful!",
                "token_type": token.get("token_type"),
                "expires_in": token.get("expires_in"),
                "instructions": "You can now close this tab and use WHOOP tools in your MCP client.",
            }))
            .into_response())
        }
        Err(WhoopError::Http { status, .. }) => {
            error!(status, "Token exchange failed");
            Ok(json_status(
                json!({
                    "error": "Token exchange failed",
                    "status_code": status,
                    "message": "Failed to exchange authorization code for access token",
                }),
                StatusCode::BAD_REQUEST,
            ))
        }
        Err(e) => {
            error!("OAuth callback error: {}", e);
            Ok(json_status(
                json!({
                    "error": "Authentication processing failed",
                    "message": "An error occurred while processing the authentication",
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}

async fn mcp_http_handler(body: Bytes, state: Arc<WebState>) -> Result<warp::reply::Response, Rejection> {
    let max_size = state.config.security.max_request_size;

    let request = match std::str::from_utf8(&body) {
        Ok(raw) => parse_message(raw, max_size),
        Err(_) => Err(McpResponse::error(None, errors::ERROR_PARSE, messages::INVALID_JSON)),
    };

    let request = match request {
        Ok(request) => request,
        Err(response) => {
            warn!("Rejected malformed MCP request");
            return Ok(json_status(to_json(&response), StatusCode::BAD_REQUEST));
        }
    };

    match handle_request(&state.registry, request, "http").await {
        Some(response) => Ok(warp::reply::json(&response).into_response()),
        None => Ok(warp::reply::with_status(warp::reply(), StatusCode::ACCEPTED).into_response()),
    }
}

fn to_json(response: &McpResponse) -> Value {
    serde_json::to_value(response).unwrap_or(Value::Null)
}

async fn websocket_session(socket: WebSocket, state: Arc<WebState>, ip: String, authorized: bool) {
    let (mut tx, mut rx) = socket.split();

    if !authorized {
        AppLogger::log_security_event(
            "unauthorized_websocket",
            "medium",
            "WebSocket connection without valid X-API-Key",
            Some(&ip),
        );
        let close = Message::close_with(errors::WS_CLOSE_POLICY_VIOLATION, messages::WS_UNAUTHORIZED);
        let _ = tx.send(close).await;
        let _ = tx.close().await;
        return;
    }

    let session = Uuid::new_v4();
    info!(client = %ip, session = %session, "MCP WebSocket connection established");
    let max_size = state.config.security.max_request_size;

    while let Some(frame) = rx.next().await {
        let message = match frame {
            Ok(message) => message,
            Err(e) => {
                warn!("WebSocket error: {}", e);
                break;
            }
        };
        if message.is_close() {
            break;
        }
        let Ok(text) = message.to_str() else {
            continue;
        };

        let response = match parse_message(text, max_size) {
            Ok(request) => handle_request(&state.registry, request, "websocket").await,
            Err(response) => Some(response),
        };

        if let Some(response) = response {
            let Ok(frame) = serde_json::to_string(&response) else {
                continue;
            };
            if tx.send(Message::text(frame)).await.is_err() {
                break;
            }
        }
    }

    info!(client = %ip, session = %session, "MCP WebSocket connection closed");
}

async fn handle_rejection(err: Rejection) -> Result<warp::reply::Response, Infallible> {
    let (body, status) = if err.find::<RateLimited>().is_some() {
        (json!({ "error": messages::RATE_LIMITED }), StatusCode::TOO_MANY_REQUESTS)
    } else if err.find::<Unauthorized>().is_some() {
        (json!({ "error": messages::UNAUTHORIZED }), StatusCode::UNAUTHORIZED)
    } else if err.is_not_found() {
        (
            json!({ "error": "Not Found", "message": "The requested endpoint was not found" }),
            StatusCode::NOT_FOUND,
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (json!({ "error": "Method Not Allowed" }), StatusCode::METHOD_NOT_ALLOWED)
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (json!({ "error": messages::INVALID_REQUEST }), StatusCode::PAYLOAD_TOO_LARGE)
    } else if err.find::<warp::cors::CorsForbidden>().is_some() {
        (json!({ "error": "Origin not allowed" }), StatusCode::FORBIDDEN)
    } else {
        error!("Unhandled rejection: {:?}", err);
        (
            json!({ "error": "Internal Server Error", "message": "Something went wrong" }),
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    };

    Ok(json_status(body, status))
}

/// Bind and serve until Ctrl-C
pub async fn run(config: ServerConfig) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.host, config.port))?;

    if config.security.api_key_generated {
        warn!("Using a temporary API key; set API_SECRET_KEY to keep it stable across restarts");
        eprintln!("Temporary API key: {}", config.security.api_key);
    }

    let state = Arc::new(WebState::from_config(config));
    let (bound, server) = warp::serve(routes(state)).try_bind_with_graceful_shutdown(addr, async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Shutdown signal received");
    })?;

    info!("WHOOP MCP web server listening on {}", bound);
    server.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.check("1.2.3.4"));
        assert!(limiter.check("1.2.3.4"));
        assert!(!limiter.check("1.2.3.4"));
        assert!(limiter.check("5.6.7.8"));

        let short = RateLimiter::new(1, Duration::from_millis(0));
        assert!(short.check("a"));
        assert!(short.check("a"));
    }

    #[test]
    fn test_pending_states_are_single_use() {
        let pending = PendingStates::new(Duration::from_secs(600));
        pending.insert("abc".to_string());
        assert!(!pending.take("other"));
        assert!(!pending.take(""));
        assert!(pending.take("abc"));
        assert!(!pending.take("abc"));
    }

    #[tokio::test]
    async fn test_client_ip_sources() {
        let forwarded = warp::test::request()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .remote_addr("127.0.0.1:4000".parse().unwrap())
            .filter(&client_ip())
            .await
            .unwrap();
        assert_eq!(forwarded, "203.0.113.7");

        let remote = warp::test::request()
            .remote_addr("192.0.2.10:4000".parse().unwrap())
            .filter(&client_ip())
            .await
            .unwrap();
        assert_eq!(remote, "192.0.2.10");

        let unknown = warp::test::request().filter(&client_ip()).await.unwrap();
        assert_eq!(unknown, "unknown");
    }

    #[test]
    fn test_pending_states_expire() {
        let pending = PendingStates::new(Duration::from_millis(0));
        pending.insert("abc".to_string());
        assert!(!pending.take("abc"));
    }
}
