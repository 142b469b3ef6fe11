//! Access gate: routes a request based on its path and whether a session
//! cookie is present.
//!
//! Only presence is checked here. Whether the token is still valid is up to
//! the backend, which answers 401 on the first call that uses it.

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const API_PREFIX: &str = "/api/";

/// Outcome of the gate for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Serve the requested page.
    Allow,
    /// Backend call; forward untouched, cookies included.
    PassThrough,
    /// No session; send to the login page and come back to `from` afterwards.
    RedirectToLogin { from: String },
    /// Already logged in; the login page has nothing to offer.
    RedirectToDashboard,
}

impl GateDecision {
    /// Location header for redirect outcomes.
    pub fn location(&self) -> Option<String> {
        match self {
            GateDecision::RedirectToLogin { from } => Some(login_url(Some(from))),
            GateDecision::RedirectToDashboard => Some(DASHBOARD_PATH.to_string()),
            GateDecision::Allow | GateDecision::PassThrough => None,
        }
    }
}

fn has_prefix(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('?'))
}

fn is_asset(path: &str) -> bool {
    path.starts_with("/static/") || path == "/favicon.ico"
}

pub fn is_login_page(path: &str) -> bool {
    has_prefix(path, LOGIN_PATH)
}

pub fn is_register_page(path: &str) -> bool {
    has_prefix(path, REGISTER_PATH)
}

pub fn is_auth_page(path: &str) -> bool {
    is_login_page(path) || is_register_page(path)
}

/// Decide what to do with a request for `path`.
pub fn decide(path: &str, has_session: bool) -> GateDecision {
    if is_asset(path) {
        return GateDecision::Allow;
    }

    if path.starts_with(API_PREFIX) {
        return GateDecision::PassThrough;
    }

    if !has_session && !is_auth_page(path) {
        return GateDecision::RedirectToLogin {
            from: path.to_string(),
        };
    }

    if has_session && is_login_page(path) {
        return GateDecision::RedirectToDashboard;
    }

    // registration stays reachable with a session
    GateDecision::Allow
}

/// `/login`, or `/login?from=<path>` when there is somewhere to return to.
///
/// Slashes are legal in a query value and stay readable.
pub fn login_url(from: Option<&str>) -> String {
    match from {
        Some(from) if !from.is_empty() && from != "/" => {
            let from = urlencoding::encode(from).replace("%2F", "/");
            format!("{LOGIN_PATH}?from={from}")
        }
        _ => LOGIN_PATH.to_string(),
    }
}

/// Where to go after logging in. Only local absolute paths are honored, so
/// the `from` parameter cannot send the user to another site.
///
/// Browsers drop tabs and newlines from URLs, so `/\t/host` would be read as
/// `//host`; any control character disqualifies the path.
pub fn safe_return_path(from: Option<&str>) -> String {
    match from {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control)
                && !is_auth_page(path) =>
        {
            path.to_string()
        }
        _ => DASHBOARD_PATH.to_string(),
    }
}
