// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Local listener for the OAuth redirect.
//!
//! The receiver is started once and then serves for the life of the process.
//! Each authorization attempt installs a fresh [`AuthSession`]; the first
//! redirect that arrives completes it through a oneshot channel. Query
//! strings are never logged since they carry the authorization code.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info, warn};
use warp::http::StatusCode;
use warp::Filter;

use crate::constants::oauth;
use crate::errors::{WhoopError, WhoopResult};

/// Query parameters captured from the redirect; absent values are empty strings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
    pub error: String,
}

impl CallbackParams {
    pub fn from_query(query: &str) -> Self {
        let pairs: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        let take = |key: &str| pairs.get(key).cloned().unwrap_or_default();

        Self {
            code: take("code"),
            state: take("state"),
            error: take("error"),
        }
    }
}

/// Transient state for the authorization attempt in flight
#[derive(Debug, Default)]
pub struct AuthSession {
    expected_state: Option<String>,
    received_code: Option<String>,
    received_state: Option<String>,
    error: Option<String>,
    completion: Option<oneshot::Sender<CallbackParams>>,
}

impl AuthSession {
    /// Discard anything left from a previous attempt and wait for `expected_state`
    pub fn begin(&mut self, expected_state: String, completion: oneshot::Sender<CallbackParams>) {
        *self = AuthSession {
            expected_state: Some(expected_state),
            completion: Some(completion),
            ..AuthSession::default()
        };
    }

    pub fn reset(&mut self) {
        *self = AuthSession::default();
    }

    pub fn is_pending(&self) -> bool {
        self.completion.is_some()
    }

    pub fn expected_state(&self) -> Option<&str> {
        self.expected_state.as_deref()
    }

    pub fn received_code(&self) -> Option<&str> {
        self.received_code.as_deref()
    }

    pub fn received_state(&self) -> Option<&str> {
        self.received_state.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Store the redirect and fire the completion signal.
    ///
    /// Returns whether the redirect's state matched, or `None` when no attempt
    /// is waiting; the session is left untouched in that case.
    fn complete(&mut self, params: &CallbackParams) -> Option<bool> {
        let tx = self.completion.take()?;
        let state_valid = self.expected_state.as_deref() == Some(params.state.as_str());

        self.received_code = Some(params.code.clone()).filter(|c| !c.is_empty());
        self.received_state = Some(params.state.clone()).filter(|s| !s.is_empty());
        self.error = Some(params.error.clone()).filter(|e| !e.is_empty());

        let _ = tx.send(params.clone());
        Some(state_valid)
    }
}

/// Idempotently started redirect listener
#[derive(Clone)]
pub struct CallbackReceiver {
    port: u16,
    session: Arc<Mutex<AuthSession>>,
    bound: Arc<Mutex<Option<SocketAddr>>>,
}

impl CallbackReceiver {
    pub fn new(port: u16, session: Arc<Mutex<AuthSession>>) -> Self {
        Self {
            port,
            session,
            bound: Arc::new(Mutex::new(None)),
        }
    }

    /// Address the receiver is listening on, once started
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.bound.lock().await
    }

    /// Start listening unless already running
    pub async fn start(&self) -> WhoopResult<SocketAddr> {
        let mut bound = self.bound.lock().await;
        if let Some(addr) = *bound {
            return Ok(addr);
        }

        let (addr, server) = warp::serve(callback_routes(self.session.clone()))
            .try_bind_ephemeral(([127, 0, 0, 1], self.port))
            .map_err(|e| WhoopError::Transport(format!("Failed to bind callback server: {}", e)))?;

        tokio::spawn(server);
        info!("OAuth callback receiver listening on http://{}/{}", addr, oauth::CALLBACK_PATH);

        *bound = Some(addr);
        Ok(addr)
    }
}

fn callback_routes(
    session: Arc<Mutex<AuthSession>>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    let callback = warp::path!("whoop" / "callback")
        .and(warp::get())
        .and(
            warp::query::raw()
                .or(warp::any().map(String::new))
                .unify(),
        )
        .and(warp::any().map(move || session.clone()))
        .and_then(handle_callback);

    let not_found = warp::any()
        .map(|| warp::reply::with_status("404 Not Found", StatusCode::NOT_FOUND));

    callback.or(not_found)
}

async fn handle_callback(
    query: String,
    session: Arc<Mutex<AuthSession>>,
) -> Result<impl warp::Reply, Infallible> {
    info!("OAuth callback received");

    let params = CallbackParams::from_query(&query);
    let html = match session.lock().await.complete(&params) {
        Some(state_valid) => {
            debug!(state_valid, "OAuth callback processed");
            render_page(&params, state_valid)
        }
        None => {
            warn!("OAuth callback arrived with no authorization in progress");
            page(
                "WHOOP Authorization Expired",
                "No Authorization In Progress",
                "error",
                "This authorization link has already been used or has expired.",
                "Start the authentication again from your assistant.",
            )
        }
    };

    Ok(warp::reply::html(html))
}

/// HTML shown in the browser after the redirect
pub fn render_page(params: &CallbackParams, state_valid: bool) -> String {
    let has_code = !params.code.is_empty();

    if has_code && state_valid {
        page(
            "WHOOP Authorization Successful",
            "Authorization Successful!",
            "success",
            "WHOOP has authorized your application.",
            "You can close this window and return to your assistant.",
        )
    } else if has_code {
        page(
            "WHOOP Authorization Failed",
            "Authorization Failed",
            "error",
            "Error: State mismatch (possible CSRF attack)",
            "Please try again or contact support.",
        )
    } else {
        let reason = if params.error.is_empty() {
            "Unknown error".to_string()
        } else {
            html_escape::encode_text(&params.error).to_string()
        };
        page(
            "WHOOP Authorization Failed",
            "Authorization Failed",
            "error",
            &format!("Error: {}", reason),
            "Please try again or contact support.",
        )
    }
}

fn page(title: &str, heading: &str, class: &str, message: &str, footer: &str) -> String {
    format!(
        r#"<html>
<head>
    <title>{title}</title>
    <style>
        body {{ font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; }}
        .success {{ color: green; }}
        .error {{ color: red; }}
        .container {{ text-align: center; margin-top: 50px; }}
    </style>
</head>
<body>
    <div class="container">
        <h1>{heading}</h1>
        <p class="{class}">{message}</p>
        <p>{footer}</p>
    </div>
</body>
</html>"#
    )
}
