//! Errors raised by page handlers and how they turn into responses.

use askama::Template;
use axum::{
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::{error, warn};

use crate::gate::login_url;
use crate::web::templates::NotFoundTemplate;

#[derive(Debug, thiserror::Error)]
pub enum WebError {
    /// The session cookie is missing or the backend rejected it.
    #[error("Session rejected, returning to login from {from}")]
    Unauthorized { from: String, cookie_name: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend error: {0}")]
    Backend(bourse_api::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

impl WebError {
    pub fn unauthorized<F: Into<String>, C: Into<String>>(from: F, cookie_name: C) -> Self {
        WebError::Unauthorized {
            from: from.into(),
            cookie_name: cookie_name.into(),
        }
    }
}

/// `Set-Cookie` value that drops the session cookie.
pub fn clear_cookie_header(cookie_name: &str) -> String {
    format!("{cookie_name}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            // The only place a backend 401 turns into navigation.
            WebError::Unauthorized { from, cookie_name } => {
                warn!(from = %from, "Session rejected, redirecting to login");
                let mut response = Redirect::to(&login_url(Some(&from))).into_response();
                if let Ok(value) = clear_cookie_header(&cookie_name).parse() {
                    response.headers_mut().insert(header::SET_COOKIE, value);
                }
                response
            }
            WebError::NotFound(message) => {
                let template = NotFoundTemplate { message };
                let body = template
                    .render()
                    .unwrap_or_else(|e| format!("Template error: {e}"));
                (StatusCode::NOT_FOUND, Html(body)).into_response()
            }
            WebError::Backend(e) => {
                error!("Backend call failed: {e}");
                let status = if e.is_transient() {
                    StatusCode::BAD_GATEWAY
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                (status, e.user_message()).into_response()
            }
            WebError::Template(e) => {
                error!("Template error: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Template error: {e}")).into_response()
            }
        }
    }
}
