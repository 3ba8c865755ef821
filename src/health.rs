// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Health check endpoints and monitoring utilities

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::{Environment, WhoopConfig};
use crate::constants::protocol;
use crate::errors::WhoopError;
use crate::token_store::TokenStore;

/// Overall health status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: HealthStatus,
    /// Service information
    pub service: ServiceInfo,
    /// Individual component checks
    pub checks: Vec<ComponentHealth>,
    /// Response timestamp
    pub timestamp: u64,
    /// Response time in milliseconds
    pub response_time_ms: u64,
}

/// Service information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    /// development or production
    pub environment: String,
    pub uptime_seconds: u64,
}

/// Individual component health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    /// Status description
    pub message: String,
    /// Check duration in milliseconds
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

pub struct HealthChecker {
    start_time: Instant,
    environment: Environment,
    whoop: WhoopConfig,
    http: reqwest::Client,
    /// Cached readiness result
    cached_status: RwLock<Option<(HealthResponse, Instant)>>,
    cache_ttl: Duration,
}

impl HealthChecker {
    pub fn new(whoop: WhoopConfig, environment: Environment) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            start_time: Instant::now(),
            environment,
            whoop,
            http,
            cached_status: RwLock::new(None),
            cache_ttl: Duration::from_secs(30),
        }
    }

    fn service_info(&self) -> ServiceInfo {
        ServiceInfo {
            name: protocol::SERVER_NAME.to_string(),
            version: protocol::SERVER_VERSION.to_string(),
            environment: self.environment.to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Fast check suitable for load balancer probes
    pub async fn basic_health(&self) -> HealthResponse {
        let start = Instant::now();

        let checks = vec![ComponentHealth {
            name: "service".to_string(),
            status: HealthStatus::Healthy,
            message: "Service is running".to_string(),
            duration_ms: 0,
            metadata: None,
        }];

        HealthResponse {
            status: HealthStatus::Healthy,
            service: self.service_info(),
            checks,
            timestamp: unix_now(),
            response_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Every component, cached for 30 seconds
    pub async fn comprehensive_health(&self) -> HealthResponse {
        let start = Instant::now();

        {
            let cached = self.cached_status.read().await;
            if let Some((response, cached_at)) = cached.as_ref() {
                if cached_at.elapsed() < self.cache_ttl {
                    return response.clone();
                }
            }
        }

        info!("Performing comprehensive health check");

        let checks = vec![
            self.check_oauth_config(),
            self.check_token_store().await,
            self.check_whoop_api().await,
        ];

        let response = HealthResponse {
            status: overall_status(&checks),
            service: self.service_info(),
            checks,
            timestamp: unix_now(),
            response_time_ms: start.elapsed().as_millis() as u64,
        };

        *self.cached_status.write().await = Some((response.clone(), Instant::now()));
        response
    }

    fn check_oauth_config(&self) -> ComponentHealth {
        let (status, message) = if self.whoop.has_credentials() {
            (HealthStatus::Healthy, "WHOOP client credentials configured")
        } else {
            (HealthStatus::Degraded, "WHOOP_CLIENT_ID or WHOOP_CLIENT_SECRET missing")
        };

        ComponentHealth {
            name: "oauth_config".to_string(),
            status,
            message: message.to_string(),
            duration_ms: 0,
            metadata: Some(serde_json::json!({ "redirect_uri": self.whoop.redirect_uri })),
        }
    }

    async fn check_token_store(&self) -> ComponentHealth {
        let start = Instant::now();
        let store = TokenStore::new(self.whoop.token_file.clone());

        let (status, message) = match store.load().await {
            Ok(_) => (HealthStatus::Healthy, "WHOOP token present".to_string()),
            Err(WhoopError::NotAuthenticated) => {
                (HealthStatus::Degraded, "Not authenticated with WHOOP".to_string())
            }
            Err(e) => {
                warn!("Token store check failed: {}", e);
                (HealthStatus::Degraded, e.to_string())
            }
        };

        ComponentHealth {
            name: "token_store".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
            metadata: None,
        }
    }

    /// Any HTTP answer counts; 401 is expected without a token
    async fn check_whoop_api(&self) -> ComponentHealth {
        let start = Instant::now();

        let (status, message) = match self.http.get(&self.whoop.api_base).send().await {
            Ok(response) => (
                HealthStatus::Healthy,
                format!("WHOOP API reachable (HTTP {})", response.status().as_u16()),
            ),
            Err(e) => {
                warn!("WHOOP API unreachable: {}", e);
                (HealthStatus::Degraded, "WHOOP API unreachable".to_string())
            }
        };

        ComponentHealth {
            name: "whoop_api".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
            metadata: Some(serde_json::json!({ "api_base": self.whoop.api_base })),
        }
    }

    /// Readiness: degraded components still accept traffic
    pub async fn readiness(&self) -> HealthResponse {
        self.comprehensive_health().await
    }

    pub async fn liveness(&self) -> HealthResponse {
        self.basic_health().await
    }
}

fn overall_status(checks: &[ComponentHealth]) -> HealthStatus {
    if checks.iter().any(|c| c.status == HealthStatus::Unhealthy) {
        HealthStatus::Unhealthy
    } else if checks.iter().any(|c| c.status == HealthStatus::Degraded) {
        HealthStatus::Degraded
    } else {
        HealthStatus::Healthy
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Health check routes for the web shim
pub mod middleware {
    use super::*;
    use std::sync::Arc;
    use warp::{Filter, Reply};

    /// `/health`, `/health/ready`, `/health/live`
    pub fn routes(
        health_checker: Arc<HealthChecker>,
    ) -> impl Filter<Extract = (impl Reply,), Error = warp::Rejection> + Clone {
        let health = warp::path!("health")
            .and(warp::get())
            .and(with_health_checker(health_checker.clone()))
            .and_then(health_handler);

        let ready = warp::path!("health" / "ready")
            .and(warp::get())
            .and(with_health_checker(health_checker.clone()))
            .and_then(readiness_handler);

        let live = warp::path!("health" / "live")
            .and(warp::get())
            .and(with_health_checker(health_checker))
            .and_then(liveness_handler);

        health.or(ready).unify().or(live).unify()
    }

    fn with_health_checker(
        health_checker: Arc<HealthChecker>,
    ) -> impl Filter<Extract = (Arc<HealthChecker>,), Error = std::convert::Infallible> + Clone {
        warp::any().map(move || health_checker.clone())
    }

    fn respond(response: HealthResponse) -> warp::reply::Response {
        let status_code = match response.status {
            HealthStatus::Healthy | HealthStatus::Degraded => warp::http::StatusCode::OK,
            HealthStatus::Unhealthy => warp::http::StatusCode::SERVICE_UNAVAILABLE,
        };
        warp::reply::with_status(warp::reply::json(&response), status_code).into_response()
    }

    async fn health_handler(
        health_checker: Arc<HealthChecker>,
    ) -> Result<warp::reply::Response, warp::Rejection> {
        Ok(respond(health_checker.basic_health().await))
    }

    async fn readiness_handler(
        health_checker: Arc<HealthChecker>,
    ) -> Result<warp::reply::Response, warp::Rejection> {
        Ok(respond(health_checker.readiness().await))
    }

    async fn liveness_handler(
        health_checker: Arc<HealthChecker>,
    ) -> Result<warp::reply::Response, warp::Rejection> {
        Ok(respond(health_checker.liveness().await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn checker(dir: &TempDir, api_base: &str) -> HealthChecker {
        let mut whoop = WhoopConfig::from_env().with_base_url(api_base);
        whoop.client_id = Some("id".to_string());
        whoop.client_secret = Some("secret".to_string());
        whoop.token_file = dir.path().join("token.json");
        HealthChecker::new(whoop, Environment::Development)
    }

    #[tokio::test]
    async fn test_basic_health_check() {
        let dir = TempDir::new().unwrap();
        let response = checker(&dir, "http://127.0.0.1:9").basic_health().await;

        assert_eq!(response.status, HealthStatus::Healthy);
        assert_eq!(response.service.name, "whoop-mcp");
        assert_eq!(response.service.environment, "development");
        assert!(!response.checks.is_empty());
    }

    #[tokio::test]
    async fn test_readiness_degrades_without_token() {
        let dir = TempDir::new().unwrap();
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/")
            .with_status(401)
            .create_async()
            .await;

        let response = checker(&dir, &server.url()).readiness().await;

        assert_eq!(response.status, HealthStatus::Degraded);
        let token = response.checks.iter().find(|c| c.name == "token_store").unwrap();
        assert_eq!(token.status, HealthStatus::Degraded);
        let api = response.checks.iter().find(|c| c.name == "whoop_api").unwrap();
        assert_eq!(api.status, HealthStatus::Healthy);
        assert_eq!(api.message, "WHOOP API reachable (HTTP 401)");
    }

    #[tokio::test]
    async fn test_readiness_healthy_with_token() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("token.json"),
            r#"{"access_token":"abc","token_type":"bearer"}"#,
        )
        .unwrap();
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("GET", "/").with_status(200).create_async().await;

        let response = checker(&dir, &server.url()).readiness().await;
        assert_eq!(response.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_routes() {
        let dir = TempDir::new().unwrap();
        let routes = middleware::routes(Arc::new(checker(&dir, "http://127.0.0.1:9")));

        let live = warp::test::request().path("/health/live").reply(&routes).await;
        assert_eq!(live.status(), 200);

        let health = warp::test::request().path("/health").reply(&routes).await;
        let body: serde_json::Value = serde_json::from_slice(health.body()).unwrap();
        assert_eq!(body["status"], "healthy");
    }
}
