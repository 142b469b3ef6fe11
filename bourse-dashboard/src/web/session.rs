//! Per-request session extractor for dashboard pages.

use axum::{
    extract::FromRequestParts,
    http::{Method, header, request::Parts},
};
use axum_extra::extract::CookieJar;
use bourse_api::SessionToken;
use std::sync::Arc;

use crate::gate::DASHBOARD_PATH;
use crate::listing::AuthorizationError;
use crate::web::error::WebError;
use crate::web::middleware::AppState;

/// The caller's session token plus where to send them back to if the
/// backend turns it down.
pub struct Session {
    pub token: SessionToken,
    return_to: String,
    cookie_name: String,
}

impl Session {
    pub fn reject(&self) -> WebError {
        WebError::unauthorized(self.return_to.clone(), self.cookie_name.clone())
    }

    /// Classify a backend failure: 401 ends the session, 404 becomes the
    /// not-found page, everything else is reported as is.
    pub fn fail(&self, error: bourse_api::Error) -> WebError {
        match error {
            bourse_api::Error::Unauthorized => self.reject(),
            bourse_api::Error::NotFound(message) => WebError::NotFound(message),
            other => WebError::Backend(other),
        }
    }

    pub fn expired(&self, _: AuthorizationError) -> WebError {
        self.reject()
    }
}

/// Path part of a same-origin `Referer`, if any.
fn referer_path(parts: &Parts) -> Option<String> {
    let referer = parts.headers.get(header::REFERER)?.to_str().ok()?;
    let host = parts.headers.get(header::HOST)?.to_str().ok()?;

    let rest = referer
        .strip_prefix("http://")
        .or_else(|| referer.strip_prefix("https://"))?;
    let path = rest.strip_prefix(host)?;
    path.starts_with('/').then(|| path.to_string())
}

impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = WebError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // Form posts have no page of their own to return to.
        let return_to = if parts.method == Method::GET {
            parts
                .uri
                .path_and_query()
                .map(|p| p.as_str().to_string())
                .unwrap_or_else(|| parts.uri.path().to_string())
        } else {
            referer_path(parts).unwrap_or_else(|| DASHBOARD_PATH.to_string())
        };

        let jar = CookieJar::from_headers(&parts.headers);
        match state.session_token(&jar) {
            Some(token) => Ok(Session {
                token,
                return_to,
                cookie_name: state.cookie_name().to_string(),
            }),
            None => Err(WebError::unauthorized(return_to, state.cookie_name())),
        }
    }
}
