//! Client for the stock exchange REST backend (`/api/v1`).
//!
//! Every authenticated call forwards the caller's session token as the
//! backend's session cookie. Nothing here inspects the token; the backend
//! decides whether it is still valid and answers 401 when it is not.

pub mod types;

pub use reqwest::{Method, StatusCode, Url};
pub use types::*;

use reqwest::header::{COOKIE, HeaderMap, SET_COOKIE};
use reqwest::{Client, IntoUrl, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport, timeout or decoding failure inside reqwest
    #[error("Backend request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// 400 with field-level detail
    #[error("Validation failed: {0}")]
    Validation(ValidationFailure),

    /// 401/403, the session is missing, expired or rejected
    #[error("Not authorized")]
    Unauthorized,

    /// 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status
    #[error("HTTP error from backend: {status} {body}")]
    Http { status: StatusCode, body: String },

    /// Base URL or path could not be joined
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Login was accepted but no session token came back
    #[error("Backend did not return a session token")]
    MissingSession,
}

impl Error {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized)
    }

    /// Errors worth showing as a transient notification rather than inline.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Request(_) => true,
            Error::Http { status, .. } => status.is_server_error(),
            _ => false,
        }
    }

    /// Field errors for form display; empty unless this is a 400.
    pub fn field_errors(&self) -> FieldErrors {
        match self {
            Error::Validation(failure) => failure.field_errors(),
            _ => FieldErrors::new(),
        }
    }

    /// Message suitable for a notification banner.
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation(failure) => failure.to_string(),
            Error::NotFound(message) => message.clone(),
            Error::Http { status, body } if !body.is_empty() => format!("{status}: {body}"),
            Error::Request(e) if e.is_timeout() => "The backend did not answer in time".to_string(),
            Error::Request(_) => "The backend could not be reached".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub struct BourseApi {
    client: Client,
    base_url: Url,
    /// Where `/api/...` paths are mounted on the backend host
    proxy_root: Url,
    cookie_name: String,
}

impl BourseApi {
    /// Create a client for `base_url` (e.g. `http://localhost:8080/api/v1`).
    ///
    /// `cookie_name` is the session cookie the backend issues on login and
    /// expects on every other call.
    pub fn new<C: ToString, U: IntoUrl>(base_url: U, cookie_name: C, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let mut base_url = base_url.into_url()?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let proxy_root = proxy_root(&base_url);
        Ok(Self {
            client,
            base_url,
            proxy_root,
            cookie_name: cookie_name.to_string(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::InvalidUrl(format!("{path}: {e}")))
    }

    fn forward_url(&self, path_and_query: &str) -> Result<Url> {
        self.proxy_root
            .join(path_and_query.trim_start_matches('/'))
            .map_err(|e| Error::InvalidUrl(format!("{path_and_query}: {e}")))
    }

    fn request(&self, method: Method, url: Url, session: Option<&SessionToken>) -> RequestBuilder {
        let request_builder = self.client.request(method, url);
        match session {
            Some(token) => {
                request_builder.header(COOKIE, format!("{}={}", self.cookie_name, token.as_str()))
            }
            None => request_builder,
        }
    }

    /// Map a non-success response onto the error taxonomy.
    async fn check(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        match status {
            StatusCode::BAD_REQUEST => {
                let failure = serde_json::from_str::<ValidationFailure>(&body).unwrap_or_else(|_| {
                    ValidationFailure {
                        message: body.clone(),
                        errors: Vec::new(),
                    }
                });
                debug!("Backend rejected request: {failure}");
                Err(Error::Validation(failure))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                warn!("Backend answered {status}, session rejected");
                Err(Error::Unauthorized)
            }
            StatusCode::NOT_FOUND => {
                let message = serde_json::from_str::<MessageEnvelope>(&body)
                    .ok()
                    .and_then(|m| m.message)
                    .unwrap_or_else(|| "Resource not found".to_string());
                Err(Error::NotFound(message))
            }
            _ => {
                error!("Backend error: {status} - {body}");
                Err(Error::Http { status, body })
            }
        }
    }

    async fn data<T: DeserializeOwned>(resp: Response) -> Result<T> {
        let envelope: Envelope<T> = Self::check(resp).await?.json().await?;
        if let Some(message) = &envelope.message {
            debug!("Backend: {message}");
        }
        Ok(envelope.data)
    }

    async fn get_data<T: DeserializeOwned>(&self, session: &SessionToken, path: &str) -> Result<T> {
        let url = self.url(path)?;
        let resp = self.request(Method::GET, url, Some(session)).send().await?;
        Self::data(resp).await
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        session: &SessionToken,
        path: &str,
        request: PageRequest,
    ) -> Result<Page<T>> {
        let mut url = self.url(path)?;
        url.set_query(Some(&request.query()));
        let resp = self.request(Method::GET, url, Some(session)).send().await?;
        let page: Option<Page<T>> = Self::data(resp).await?;
        Ok(page.unwrap_or_else(Page::empty))
    }

    // ========================================================================
    // Stocks
    // ========================================================================

    pub async fn list_stocks(&self, session: &SessionToken, request: PageRequest) -> Result<Page<Stock>> {
        self.get_page(session, "stock", request).await
    }

    pub async fn get_stock(&self, session: &SessionToken, id: i64) -> Result<Stock> {
        self.get_data(session, &format!("stock/{id}")).await
    }

    pub async fn create_stock(&self, session: &SessionToken, stock: &NewStock) -> Result<Stock> {
        let url = self.url("stock")?;
        let resp = self.request(Method::POST, url, Some(session)).json(stock).send().await?;
        Self::data(resp).await
    }

    pub async fn update_stock_price(
        &self,
        session: &SessionToken,
        id: i64,
        update: &PriceUpdate,
    ) -> Result<()> {
        let url = self.url(&format!("stock/{id}/price"))?;
        let resp = self.request(Method::PUT, url, Some(session)).json(update).send().await?;
        Self::check(resp).await?;
        debug!("Updated price of stock {id} to {}", update.current_price);
        Ok(())
    }

    /// Exchanges on which the stock is listed.
    pub async fn list_exchanges_for_stock(
        &self,
        session: &SessionToken,
        stock_id: i64,
        request: PageRequest,
    ) -> Result<Page<StockExchange>> {
        self.get_page(session, &format!("stock/{stock_id}/stockExchanges"), request)
            .await
    }

    pub async fn delete_stock(&self, session: &SessionToken, id: i64) -> Result<()> {
        let url = self.url(&format!("stock/{id}"))?;
        let resp = self.request(Method::DELETE, url, Some(session)).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    // ========================================================================
    // Stock exchanges
    // ========================================================================

    pub async fn list_stock_exchanges(
        &self,
        session: &SessionToken,
        request: PageRequest,
    ) -> Result<Page<StockExchange>> {
        self.get_page(session, "stockExchange", request).await
    }

    /// Only exchanges currently live in the market.
    pub async fn list_live_stock_exchanges(
        &self,
        session: &SessionToken,
        request: PageRequest,
    ) -> Result<Page<StockExchange>> {
        self.get_page(session, "stockExchange/live", request).await
    }

    pub async fn get_stock_exchange(&self, session: &SessionToken, id: i64) -> Result<StockExchange> {
        self.get_data(session, &format!("stockExchange/{id}")).await
    }

    pub async fn create_stock_exchange(
        &self,
        session: &SessionToken,
        exchange: &NewStockExchange,
    ) -> Result<StockExchange> {
        let url = self.url("stockExchange")?;
        let resp = self.request(Method::POST, url, Some(session)).json(exchange).send().await?;
        Self::data(resp).await
    }

    pub async fn update_stock_exchange(
        &self,
        session: &SessionToken,
        id: i64,
        update: &StockExchangeUpdate,
    ) -> Result<()> {
        let url = self.url(&format!("stockExchange/{id}"))?;
        let resp = self.request(Method::PUT, url, Some(session)).json(update).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn delete_stock_exchange(&self, session: &SessionToken, id: i64) -> Result<()> {
        let url = self.url(&format!("stockExchange/{id}"))?;
        let resp = self.request(Method::DELETE, url, Some(session)).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    pub async fn list_stocks_in_exchange(
        &self,
        session: &SessionToken,
        exchange_id: i64,
        request: PageRequest,
    ) -> Result<Page<Stock>> {
        self.get_page(session, &format!("stockExchange/{exchange_id}/stocks"), request)
            .await
    }

    pub async fn add_stock_to_exchange(
        &self,
        session: &SessionToken,
        exchange_id: i64,
        stock_id: i64,
    ) -> Result<()> {
        let mut url = self.url("stockExchange/addStock")?;
        url.set_query(Some(&format!("stockExchangeId={exchange_id}&stockId={stock_id}")));
        let resp = self.request(Method::PUT, url, Some(session)).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Remove a set of stocks from one exchange in a single call.
    pub async fn remove_stocks_from_exchange(
        &self,
        session: &SessionToken,
        exchange_id: i64,
        stock_ids: &[i64],
    ) -> Result<()> {
        let url = self.url(&format!("stockExchange/{exchange_id}/stocks"))?;
        let resp = self
            .request(Method::DELETE, url, Some(session))
            .json(&StockRemoval { stock_ids })
            .send()
            .await?;
        Self::check(resp).await?;
        debug!("Removed {} stocks from exchange {exchange_id}", stock_ids.len());
        Ok(())
    }

    // ========================================================================
    // Authentication
    // ========================================================================

    /// Log in and return the session token the backend issued.
    ///
    /// The token is read from the backend's `Set-Cookie` header; older
    /// backends only put it in the response body, so that is the fallback.
    pub async fn login(&self, login: &LoginRequest) -> Result<SessionToken> {
        let url = self.url("auth/login")?;
        let resp = self.request(Method::POST, url, None).json(login).send().await?;
        let resp = Self::check(resp).await?;

        if let Some(token) = session_cookie(resp.headers(), &self.cookie_name) {
            return Ok(token);
        }

        let envelope: Envelope<Option<LoginData>> = resp.json().await?;
        envelope
            .data
            .and_then(|d| d.token)
            .filter(|t| !t.is_empty())
            .map(SessionToken::new)
            .ok_or(Error::MissingSession)
    }

    /// Register a new account. Returns the backend's confirmation message.
    pub async fn register(&self, register: &RegisterRequest) -> Result<String> {
        let url = self.url("auth/register")?;
        let resp = self.request(Method::POST, url, None).json(register).send().await?;
        let resp = Self::check(resp).await?;
        let body: MessageEnvelope = resp.json().await.unwrap_or(MessageEnvelope { message: None });
        Ok(body.message.unwrap_or_else(|| "registered successfully".to_string()))
    }

    pub async fn logout(&self, session: &SessionToken) -> Result<()> {
        let url = self.url("auth/logout")?;
        let resp = self.request(Method::POST, url, Some(session)).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    // ========================================================================
    // Pass-through
    // ========================================================================

    /// Forward a raw request to the backend host, keeping method, headers and
    /// body as given. `path_and_query` is absolute (`/api/v1/stock?page=0`)
    /// and is resolved below any prefix the base URL has in front of `/api/`.
    ///
    /// The response is returned as-is, whatever its status.
    pub async fn forward(
        &self,
        method: Method,
        path_and_query: &str,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Result<Response> {
        let url = self.forward_url(path_and_query)?;
        debug!("Forwarding {method} {url}");
        let resp = self
            .client
            .request(method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;
        Ok(resp)
    }
}

/// The part of the base URL in front of its `/api/` segment, e.g.
/// `http://host/gateway/` for `http://host/gateway/api/v1/`. A base URL
/// without an `/api/` segment is mounted at its own path.
fn proxy_root(base_url: &Url) -> Url {
    let mut root = base_url.clone();
    let path = base_url.path();
    if let Some(at) = path.find("/api/") {
        root.set_path(&path[..=at]);
    }
    root.set_query(None);
    root
}

/// Find the named cookie among `Set-Cookie` headers. Empty values (the
/// backend's way of clearing the cookie) do not count.
pub fn session_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<SessionToken> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| SessionToken::new(value))
}
