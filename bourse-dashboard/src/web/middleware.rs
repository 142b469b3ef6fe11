//! Shared state and the middleware stack in front of every route.

use anyhow::{Context, Result};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use bourse_api::{BourseApi, PageSize, SessionToken};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug};

use crate::config::{Config, SessionConfig};
use crate::gate::{self, GateDecision};

/// State shared by all routes
pub struct AppState {
    /// Backend client, shared by every request
    pub api: Arc<BourseApi>,
    /// Session cookie contract
    pub session: SessionConfig,
    /// Rows per page when the query does not ask for a size
    pub default_page_size: PageSize,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let api = BourseApi::new(
            config.backend.base_url.as_str(),
            &config.session.cookie_name,
            config.backend.request_timeout(),
        )
        .with_context(|| format!("Invalid backend URL {}", config.backend.base_url))?;

        Ok(Self {
            api: Arc::new(api),
            session: config.session.clone(),
            default_page_size: config.listing.default_page_size,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.session.cookie_name
    }

    /// The session token, when the canonical cookie is set and non-empty.
    pub fn session_token(&self, jar: &CookieJar) -> Option<SessionToken> {
        jar.get(self.cookie_name())
            .map(|cookie| cookie.value())
            .filter(|value| !value.is_empty())
            .map(SessionToken::new)
    }

    /// `Set-Cookie` value for a freshly issued session.
    pub fn session_cookie_header(&self, token: &SessionToken) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.cookie_name(),
            token.as_str(),
            self.session.max_age_secs
        );
        if self.session.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Route every request through the access gate.
pub async fn access_gate(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let target = request
        .uri()
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let has_session = state.session_token(&jar).is_some();

    let decision = gate::decide(&target, has_session);
    match decision.location() {
        Some(location) => {
            debug!(path = %target, location = %location, "Access gate redirect");
            Redirect::to(&location).into_response()
        }
        None => {
            if decision == GateDecision::PassThrough {
                debug!(path = %target, "Passing through to backend");
            }
            next.run(request).await
        }
    }
}

/// Wrap each request in an `http.request` span.
pub async fn request_tracing(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let span = tracing::info_span!("http.request", method = %method, path = %path);

    let started = Instant::now();
    let response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| {
        debug!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request finished"
        );
    });
    response
}
