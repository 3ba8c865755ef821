// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! WHOOP OAuth2 authorization-code flow.
//!
//! [`OAuth2Client`] talks to the token endpoint. [`OAuthFlow`] drives one
//! interactive authorization attempt through
//! `Idle -> AwaitingRedirect -> Exchanging -> Done`, using the
//! [`callback::CallbackReceiver`] to capture the browser redirect.

pub mod callback;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};
use url::Url;

use crate::config::WhoopConfig;
use crate::constants::{limits, messages, oauth};
use crate::errors::{WhoopError, WhoopResult};
use crate::logging::AppLogger;
use crate::token_store::{TokenRecord, TokenStore};

use callback::{AuthSession, CallbackParams, CallbackReceiver};

#[derive(Debug, Clone)]
pub struct OAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl OAuth2Config {
    /// WHOOP settings with the standard read scopes
    pub fn from_whoop(config: &WhoopConfig) -> WhoopResult<Self> {
        let (client_id, client_secret) = match (&config.client_id, &config.client_secret) {
            (Some(id), Some(secret)) => (id.clone(), secret.clone()),
            _ => return Err(WhoopError::MissingCredentials),
        };

        Ok(Self {
            client_id,
            client_secret,
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: oauth::WHOOP_SCOPES.split(' ').map(str::to_string).collect(),
        })
    }
}

/// Token endpoint client. Responses are persisted through the [`TokenStore`].
#[derive(Clone)]
pub struct OAuth2Client {
    config: OAuth2Config,
    client: reqwest::Client,
    store: TokenStore,
}

impl OAuth2Client {
    pub fn new(config: OAuth2Config, store: TokenStore) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(limits::HTTP_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { config, client, store }
    }

    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn get_authorization_url(&self, state: &str) -> WhoopResult<String> {
        let mut url = Url::parse(&self.config.auth_url)
            .map_err(|e| WhoopError::Decode(format!("Invalid auth URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state);

        Ok(url.to_string())
    }

    /// Trade an authorization code for a token and persist the full response
    pub async fn exchange_code(&self, code: &str) -> WhoopResult<Value> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let token = self.post_token_form(&params).await?;
        self.store.save_raw(&token).await?;
        AppLogger::log_oauth_event("code_exchanged", true, None);
        Ok(token)
    }

    /// Use the stored refresh token to obtain and persist a new access token
    pub async fn refresh_token(&self) -> WhoopResult<TokenRecord> {
        let current = self.store.load().await?;
        let refresh_token = current
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(WhoopError::NotAuthenticated)?;

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ];

        let token = self.post_token_form(&params).await?;
        self.store.save_raw(&token).await?;
        AppLogger::log_oauth_event("token_refreshed", true, None);
        Ok(serde_json::from_value(token)?)
    }

    async fn post_token_form(&self, params: &[(&str, &str)]) -> WhoopResult<Value> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WhoopError::Http { status: status.as_u16(), body });
        }

        Ok(response.json::<Value>().await?)
    }
}

/// Random `state` parameter drawn from `[A-Za-z0-9]`
pub fn generate_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(oauth::STATE_LENGTH)
        .map(char::from)
        .collect()
}

/// Lifecycle of one interactive authorization attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    AwaitingRedirect,
    Exchanging,
    Done(Result<(), String>),
}

/// Decide whether a captured redirect may proceed to token exchange.
///
/// Checks run in order: vendor error, missing code, state mismatch. A code
/// paired with the wrong state is always rejected.
pub fn validate_redirect(expected_state: &str, params: &CallbackParams) -> Result<String, String> {
    if !params.error.is_empty() {
        return Err(format!("Authentication failed: {}", params.error));
    }

    if params.code.is_empty() {
        return Err(messages::NO_CODE.to_string());
    }

    if params.state != expected_state {
        AppLogger::log_security_event(
            "oauth_state_mismatch",
            "high",
            "Redirect state did not match the pending authorization",
            None,
        );
        return Err(messages::STATE_MISMATCH.to_string());
    }

    Ok(params.code.clone())
}

type BrowserLauncher = Arc<dyn Fn(&str) -> std::io::Result<()> + Send + Sync>;

/// Interactive OAuth flow: opens the browser, waits for the redirect and exchanges the code
pub struct OAuthFlow {
    client: OAuth2Client,
    session: Arc<Mutex<AuthSession>>,
    receiver: CallbackReceiver,
    timeout: Duration,
    launcher: BrowserLauncher,
    state: Mutex<FlowState>,
}

impl OAuthFlow {
    pub fn new(client: OAuth2Client) -> Self {
        let session = Arc::new(Mutex::new(AuthSession::default()));
        let receiver = CallbackReceiver::new(oauth::CALLBACK_PORT, session.clone());

        Self {
            client,
            session,
            receiver,
            timeout: Duration::from_secs(oauth::AUTH_TIMEOUT_SECS),
            launcher: Arc::new(|url: &str| open::that(url)),
            state: Mutex::new(FlowState::Idle),
        }
    }

    /// Listen on a different port (0 picks any free port)
    pub fn with_callback_port(mut self, port: u16) -> Self {
        self.receiver = CallbackReceiver::new(port, self.session.clone());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_browser_launcher<F>(mut self, launcher: F) -> Self
    where
        F: Fn(&str) -> std::io::Result<()> + Send + Sync + 'static,
    {
        self.launcher = Arc::new(launcher);
        self
    }

    pub fn receiver(&self) -> &CallbackReceiver {
        &self.receiver
    }

    pub async fn state(&self) -> FlowState {
        self.state.lock().await.clone()
    }

    async fn transition(&self, next: FlowState) {
        *self.state.lock().await = next;
    }

    /// Run a full authorization attempt and describe the outcome
    pub async fn authenticate(&self) -> String {
        match self.run().await {
            Ok(message) => {
                self.transition(FlowState::Done(Ok(()))).await;
                message
            }
            Err(message) => {
                AppLogger::log_oauth_event("authorization", false, Some(&message));
                self.transition(FlowState::Done(Err(message.clone()))).await;
                message
            }
        }
    }

    async fn run(&self) -> Result<String, String> {
        let state = generate_state();
        let (tx, rx) = oneshot::channel();
        self.session.lock().await.begin(state.clone(), tx);
        self.transition(FlowState::AwaitingRedirect).await;

        self.receiver
            .start()
            .await
            .map_err(|e| format!("Error starting callback server: {}", e))?;

        let auth_url = self
            .client
            .get_authorization_url(&state)
            .map_err(|e| e.to_string())?;

        info!("Opening browser for WHOOP authorization");
        if let Err(e) = (self.launcher)(&auth_url) {
            warn!(error = %e, "Failed to open browser automatically");
            eprintln!("\nPlease authorize by visiting:\n{}\n", auth_url);
        }

        let received = tokio::time::timeout(self.timeout, rx).await;
        self.session.lock().await.reset();

        let params = match received {
            Ok(Ok(params)) => params,
            _ => return Err(messages::AUTH_TIMEOUT.to_string()),
        };

        let code = validate_redirect(&state, &params)?;

        self.transition(FlowState::Exchanging).await;
        let token = self
            .client
            .exchange_code(&code)
            .await
            .map_err(|e| format!("Error exchanging code for token: {}", e))?;

        let expires_in = token
            .get("expires_in")
            .map(|v| v.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(format!(
            "\nSuccessfully authenticated with WHOOP!\nAccess token saved to {}\n\nToken expires in {} seconds.\nYou can now use the other tools to fetch data from WHOOP.\n",
            self.client.store().path().display(),
            expires_in
        ))
    }
}

/// Text for `check_authentication_status`
pub async fn authentication_status(store: &TokenStore) -> String {
    match store.load().await {
        Ok(record) => format!(
            "\nYou are authenticated with WHOOP.\nAccess token: {}\nToken type: {}\n",
            record.masked_access_token(),
            record.token_type_or_unknown()
        ),
        Err(e) => e.to_string(),
    }
}
