// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # WHOOP API Client
//!
//! Authenticated access to the WHOOP developer API. A 401 triggers exactly one
//! token refresh followed by one retry; anything else is reported as a
//! [`WhoopError`] whose text can be shown to the user directly.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::WhoopConfig;
use crate::constants::{endpoints, limits};
use crate::dates;
use crate::errors::{WhoopError, WhoopResult};
use crate::logging::AppLogger;
use crate::models::{
    BodyMeasurement, CycleRecord, Page, RecoveryRecord, SleepRecord, UserProfile, WorkoutRecord,
};
use crate::oauth2_client::{OAuth2Client, OAuth2Config};
use crate::token_store::TokenStore;

pub type Query = Vec<(&'static str, String)>;

/// Read access to WHOOP resources
#[async_trait]
pub trait WhoopApi: Send + Sync {
    /// GET `path` (relative to the API base) with the given query parameters
    async fn get(&self, path: &str, query: &Query) -> WhoopResult<Value>;
}

pub struct WhoopClient {
    config: WhoopConfig,
    http: reqwest::Client,
    store: TokenStore,
    oauth: Option<OAuth2Client>,
}

impl WhoopClient {
    pub fn new(config: WhoopConfig) -> Self {
        let store = TokenStore::new(config.token_file.clone());
        let oauth = OAuth2Config::from_whoop(&config)
            .ok()
            .map(|oauth_config| OAuth2Client::new(oauth_config, store.clone()));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(limits::HTTP_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { config, http, store, oauth }
    }

    pub fn config(&self) -> &WhoopConfig {
        &self.config
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.store
    }

    pub fn oauth(&self) -> Option<&OAuth2Client> {
        self.oauth.as_ref()
    }

    /// Issue an authenticated request, refreshing the token once on 401
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &Query,
        body: Option<&Value>,
    ) -> WhoopResult<Value> {
        let url = self.config.api_url(path);
        let access_token = self.store.access_token().await?;

        let (status, text) = self.send(&method, &url, query, body, &access_token).await?;
        if status.is_success() {
            return parse_body(&text);
        }

        if status != StatusCode::UNAUTHORIZED {
            return Err(WhoopError::Http { status: status.as_u16(), body: text });
        }

        debug!("WHOOP returned 401, attempting token refresh");
        match self.refresh_and_retry(&method, &url, query, body).await {
            Some(value) => Ok(value),
            None => Err(WhoopError::TokenExpired { body: text }),
        }
    }

    async fn refresh_and_retry(
        &self,
        method: &Method,
        url: &str,
        query: &Query,
        body: Option<&Value>,
    ) -> Option<Value> {
        let oauth = self.oauth.as_ref()?;
        let refreshed = match oauth.refresh_token().await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                return None;
            }
        };

        match self.send(method, url, query, body, &refreshed.access_token).await {
            Ok((status, text)) if status.is_success() => parse_body(&text).ok(),
            Ok((status, _)) => {
                warn!(status = status.as_u16(), "Retry after refresh failed");
                None
            }
            Err(e) => {
                warn!(error = %e, "Retry after refresh failed");
                None
            }
        }
    }

    async fn send(
        &self,
        method: &Method,
        url: &str,
        query: &Query,
        body: Option<&Value>,
        access_token: &str,
    ) -> WhoopResult<(StatusCode, String)> {
        let started = Instant::now();
        let mut request = self
            .http
            .request(method.clone(), url)
            .bearer_auth(access_token)
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let result = request.send().await;
        let elapsed = started.elapsed().as_millis() as u64;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                AppLogger::log_vendor_request(method.as_str(), url, None, elapsed);
                return Err(e.into());
            }
        };

        let status = response.status();
        AppLogger::log_vendor_request(method.as_str(), url, Some(status.as_u16()), elapsed);
        let text = response.text().await?;
        Ok((status, text))
    }
}

fn parse_body(text: &str) -> WhoopResult<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(text)?)
}

#[async_trait]
impl WhoopApi for WhoopClient {
    async fn get(&self, path: &str, query: &Query) -> WhoopResult<Value> {
        self.request(Method::GET, path, query, None).await
    }
}

/// GET and deserialize into a typed model
pub async fn get_typed<T: DeserializeOwned>(
    api: &dyn WhoopApi,
    path: &str,
    query: &Query,
) -> WhoopResult<T> {
    let value = api.get(path, query).await?;
    Ok(serde_json::from_value(value)?)
}

/// Query for the latest record, or the single record on `date`
fn single_day_query(date: Option<&str>) -> Query {
    match date {
        Some(date) if !date.trim().is_empty() => {
            let (start, end) = dates::day_bounds(date.trim());
            vec![("start", start), ("end", end), ("limit", "1".to_string())]
        }
        _ => vec![("limit", "1".to_string())],
    }
}

pub async fn sleep_for(api: &dyn WhoopApi, date: Option<&str>) -> WhoopResult<Page<SleepRecord>> {
    get_typed(api, endpoints::SLEEP, &single_day_query(date)).await
}

pub async fn recovery_for(
    api: &dyn WhoopApi,
    date: Option<&str>,
) -> WhoopResult<Page<RecoveryRecord>> {
    get_typed(api, endpoints::RECOVERY, &single_day_query(date)).await
}

pub async fn cycle_for(api: &dyn WhoopApi, date: Option<&str>) -> WhoopResult<Page<CycleRecord>> {
    get_typed(api, endpoints::CYCLE, &single_day_query(date)).await
}

/// Latest workout, or the workout with the given id
pub async fn workout(api: &dyn WhoopApi, id: Option<&str>) -> WhoopResult<Option<WorkoutRecord>> {
    match id {
        Some(id) if !id.trim().is_empty() => {
            let path = format!("{}/{}", endpoints::WORKOUT, urlencoding::encode(id.trim()));
            let value = api.get(&path, &Vec::new()).await?;
            if value.is_null() {
                return Ok(None);
            }
            Ok(Some(serde_json::from_value(value)?))
        }
        _ => {
            let page: Page<WorkoutRecord> = recent_workouts(api, 1).await?;
            Ok(page.records.into_iter().next())
        }
    }
}

/// Workouts for a whole day
pub async fn workouts_on(api: &dyn WhoopApi, date: &str) -> WhoopResult<Page<WorkoutRecord>> {
    let (start, end) = dates::day_bounds(date);
    let query = vec![
        ("start", start),
        ("end", end),
        ("limit", limits::PAGE_SIZE.to_string()),
    ];
    get_typed(api, endpoints::WORKOUT, &query).await
}

pub async fn recent_workouts(api: &dyn WhoopApi, limit: u32) -> WhoopResult<Page<WorkoutRecord>> {
    get_typed(api, endpoints::WORKOUT, &vec![("limit", limit.to_string())]).await
}

pub async fn profile(api: &dyn WhoopApi) -> WhoopResult<UserProfile> {
    get_typed(api, endpoints::PROFILE, &Vec::new()).await
}

pub async fn body_measurement(api: &dyn WhoopApi) -> WhoopResult<BodyMeasurement> {
    get_typed(api, endpoints::BODY_MEASUREMENT, &Vec::new()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_day_query() {
        assert_eq!(single_day_query(None), vec![("limit", "1".to_string())]);
        assert_eq!(single_day_query(Some("  ")), vec![("limit", "1".to_string())]);
        assert_eq!(
            single_day_query(Some("2024-01-15")),
            vec![
                ("start", "2024-01-15T00:00:00Z".to_string()),
                ("end", "2024-01-15T23:59:59Z".to_string()),
                ("limit", "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_body_allows_empty() {
        assert_eq!(parse_body("").unwrap(), Value::Null);
        assert!(parse_body("<html>").is_err());
    }
}
