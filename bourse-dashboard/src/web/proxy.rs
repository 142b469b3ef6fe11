//! `/api/*` pass-through to the backend host.
//!
//! Requests are relayed unchanged apart from hop-by-hop headers. The
//! backend's answer, whatever its status, goes back to the browser as is.

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::{HeaderMap, HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

use crate::web::middleware::AppState;

/// Largest request body relayed to the backend.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::HOST,
];

fn strip_headers(headers: &mut HeaderMap) {
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove(header::CONTENT_LENGTH);
    headers.remove("keep-alive");
}

pub async fn pass_through(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let target = parts
        .uri
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %target, "Could not read request body: {e}");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let mut headers = parts.headers;
    strip_headers(&mut headers);

    let upstream = match state
        .api
        .forward(parts.method, &target, headers, body.to_vec())
        .await
    {
        Ok(resp) => resp,
        Err(e) => {
            warn!(path = %target, "Pass-through failed: {e}");
            return (StatusCode::BAD_GATEWAY, e.user_message()).into_response();
        }
    };

    let status = upstream.status();
    let mut headers = upstream.headers().clone();
    strip_headers(&mut headers);

    match upstream.bytes().await {
        Ok(bytes) => {
            let mut response = Response::new(Body::from(bytes));
            *response.status_mut() = status;
            *response.headers_mut() = headers;
            response
        }
        Err(e) => {
            warn!(path = %target, "Could not read backend response: {e}");
            (StatusCode::BAD_GATEWAY, "The backend could not be reached").into_response()
        }
    }
}
