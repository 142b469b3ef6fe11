//! Dashboard route handlers.
//!
//! Pages are rendered on the server. Lists are rebuilt on every request from
//! the `page`/`size` query and driven through the list controller; form
//! posts either redirect back with a flash message or re-render the page
//! with field errors.

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    middleware::{from_fn, from_fn_with_state},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{any, get, post},
};
use axum_extra::extract::CookieJar;
use bourse_api::{FieldErrors, PageSize, StockExchange};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::forms::{
    AddListingForm, ExchangeForm, ExchangeUpdateForm, LoginForm, PriceForm, RegisterForm,
    RemoveListingsForm, StockForm,
};
use crate::gate::{DASHBOARD_PATH, LOGIN_PATH, safe_return_path};
use crate::listing::{
    BulkOutcome, ExchangePages, ExchangeStockPages, ListController, LiveExchangePages, Notice,
    PageSource, StockExchangePages, StockPages,
};
use crate::web::error::{WebError, clear_cookie_header};
use crate::web::middleware::{AppState, access_gate, request_tracing};
use crate::web::proxy::pass_through;
use crate::web::session::Session;
use crate::web::templates::{
    ExchangeDetailTemplate, ExchangeView, ExchangesTemplate, FormErrors, LoginTemplate,
    RegisterTemplate, StockDetailTemplate, StockView, StocksTemplate, TableView,
};

type PageResult = Result<Response, WebError>;

const STYLESHEET: &str = include_str!("../../static/app.css");

/// Build the dashboard router, access gate included.
pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to(DASHBOARD_PATH) }))
        .route("/static/app.css", get(stylesheet))
        .route("/login", get(login_page).post(login_submit))
        .route("/register", get(register_page).post(register_submit))
        .route("/logout", post(logout))
        .route("/dashboard", get(stocks_page))
        .route("/dashboard/stocks", post(stock_create))
        .route("/dashboard/stocks/{id}", get(stock_detail))
        .route("/dashboard/stocks/{id}/price", post(stock_update_price))
        .route("/dashboard/stocks/{id}/delete", post(stock_delete))
        .route(
            "/dashboard/stock-exchanges",
            get(exchanges_page).post(exchange_create),
        )
        .route(
            "/dashboard/stock-exchanges/{id}",
            get(exchange_detail).post(exchange_update),
        )
        .route("/dashboard/stock-exchanges/{id}/delete", post(exchange_delete))
        .route(
            "/dashboard/stock-exchanges/{id}/stocks/add",
            post(exchange_add_stock),
        )
        .route(
            "/dashboard/stock-exchanges/{id}/stocks/remove",
            post(exchange_remove_stocks),
        )
        .route("/api/{*path}", any(pass_through))
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), access_gate))
        .layer(from_fn(request_tracing))
        .with_state(state)
}

fn render<T: Template>(status: StatusCode, template: &T) -> PageResult {
    Ok((status, Html(template.render()?)).into_response())
}

async fn stylesheet() -> Response {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLESHEET).into_response()
}

async fn not_found() -> WebError {
    WebError::NotFound("The page you are looking for does not exist.".to_string())
}

// ============================================================================
// Query parameters and notices
// ============================================================================

/// Paging and flash parameters shared by every list page.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    page: Option<u32>,
    /// Anything outside the supported sizes falls back to the default
    #[serde(default)]
    size: Option<u32>,
    #[serde(default)]
    live: Option<bool>,
    #[serde(default)]
    flash: Option<String>,
}

impl ListQuery {
    fn page(&self) -> u32 {
        self.page.unwrap_or(0)
    }

    fn size(&self, default: PageSize) -> PageSize {
        self.size
            .and_then(|size| PageSize::try_from(size).ok())
            .unwrap_or(default)
    }

    fn live_only(&self) -> bool {
        self.live.unwrap_or(false)
    }

    /// `page=..&size=..` for redirects back to the same listing.
    fn paging(&self, default: PageSize) -> String {
        format!("page={}&size={}", self.page(), self.size(default).get())
    }

    fn flash(&self) -> Option<Notice> {
        self.flash.as_deref().and_then(flash_notice)
    }
}

/// Messages shown after a redirect. Only known keys are displayed.
fn flash_notice(key: &str) -> Option<Notice> {
    let message = match key {
        "stock-created" => "Stock created successfully",
        "stock-deleted" => "Stock deleted",
        "price-updated" => "Stock price updated successfully",
        "exchange-created" => "Stock exchange created successfully",
        "exchange-updated" => "Stock exchange updated successfully",
        "exchange-deleted" => "Stock exchange deleted",
        "listing-added" => "Stock added to the exchange",
        "logged-out" => "You have been logged out",
        _ => return None,
    };
    Some(Notice::success(message))
}

// Fields each page shows an inline error for.
const LOGIN_FIELDS: &[&str] = &["email", "password"];
const REGISTER_FIELDS: &[&str] = &[
    "firstName",
    "lastName",
    "email",
    "password",
    "confirmPassword",
];
const STOCK_FIELDS: &[&str] = &["name", "description", "currentPrice"];
const PRICE_FIELDS: &[&str] = &["currentPrice"];
const EXCHANGE_FIELDS: &[&str] = &["name", "description"];
const EXCHANGE_DETAIL_FIELDS: &[&str] = &["name", "description", "liveInMarket", "stockId"];

/// Status, field errors and banner for a re-rendered page.
struct Feedback {
    status: StatusCode,
    errors: FieldErrors,
    notice: Option<Notice>,
}

impl Feedback {
    fn invalid(errors: FieldErrors) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            errors,
            notice: None,
        }
    }

    /// Classify a failed mutation. A 401 ends the session instead.
    ///
    /// Field errors the page has no input for go into the banner.
    fn from_backend(
        session: &Session,
        error: bourse_api::Error,
        shown: &[&str],
    ) -> Result<Self, WebError> {
        match error {
            bourse_api::Error::Unauthorized => Err(session.reject()),
            bourse_api::Error::Validation(failure) => Ok(Self {
                status: StatusCode::BAD_REQUEST,
                errors: failure.field_errors(),
                notice: Some(Notice::error(failure.summary(shown))),
            }),
            bourse_api::Error::NotFound(message) => Ok(Self {
                status: StatusCode::NOT_FOUND,
                errors: FieldErrors::new(),
                notice: Some(Notice::error(message)),
            }),
            other => {
                warn!("Backend call failed: {other}");
                let status = if other.is_transient() {
                    StatusCode::BAD_GATEWAY
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                Ok(Self {
                    status,
                    errors: FieldErrors::new(),
                    notice: Some(Notice::error(other.user_message())),
                })
            }
        }
    }
}

/// Fetch the requested page, clamping once if it is past the end.
async fn refreshed<S: PageSource>(
    session: &Session,
    mut list: ListController<S>,
) -> Result<ListController<S>, WebError> {
    list.refresh().await.map_err(|e| session.expired(e))?;
    Ok(list)
}

// ============================================================================
// Authentication
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    flash: Option<String>,
}

async fn login_page(Query(query): Query<LoginQuery>) -> PageResult {
    let template = LoginTemplate {
        notice: query.flash.as_deref().and_then(flash_notice).map(Into::into),
        errors: FormErrors::default(),
        email: String::new(),
        from: query.from.unwrap_or_default(),
    };
    render(StatusCode::OK, &template)
}

async fn login_submit(State(state): State<Arc<AppState>>, Form(form): Form<LoginForm>) -> PageResult {
    let rejected = |status: StatusCode, errors: FieldErrors, notice: Option<Notice>| {
        let template = LoginTemplate {
            notice: notice.map(Into::into),
            errors: errors.into(),
            email: form.email.clone(),
            from: form.from.clone().unwrap_or_default(),
        };
        render(status, &template)
    };

    let login = match form.validate() {
        Ok(login) => login,
        Err(errors) => return rejected(StatusCode::BAD_REQUEST, errors, None),
    };

    match state.api.login(&login).await {
        Ok(token) => {
            info!(email = %login.email, "User logged in");
            let location = safe_return_path(form.from.as_deref());
            Ok((
                StatusCode::SEE_OTHER,
                [
                    (header::LOCATION, location),
                    (header::SET_COOKIE, state.session_cookie_header(&token)),
                ],
            )
                .into_response())
        }
        Err(bourse_api::Error::Unauthorized) => rejected(
            StatusCode::UNAUTHORIZED,
            FieldErrors::new(),
            Some(Notice::error("Invalid email or password")),
        ),
        Err(bourse_api::Error::Validation(failure)) => rejected(
            StatusCode::BAD_REQUEST,
            failure.field_errors(),
            Some(Notice::error(failure.summary(LOGIN_FIELDS))),
        ),
        Err(e) => {
            warn!("Login failed: {e}");
            rejected(
                StatusCode::BAD_GATEWAY,
                FieldErrors::new(),
                Some(Notice::error(e.user_message())),
            )
        }
    }
}

async fn register_page() -> PageResult {
    let template = RegisterTemplate {
        notice: None,
        errors: FormErrors::default(),
        first_name: String::new(),
        last_name: String::new(),
        email: String::new(),
    };
    render(StatusCode::OK, &template)
}

async fn register_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegisterForm>,
) -> PageResult {
    let rejected = |status: StatusCode, errors: FieldErrors, notice: Option<Notice>| {
        let template = RegisterTemplate {
            notice: notice.map(Into::into),
            errors: errors.into(),
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            email: form.email.clone(),
        };
        render(status, &template)
    };

    let register = match form.validate() {
        Ok(register) => register,
        Err(errors) => return rejected(StatusCode::BAD_REQUEST, errors, None),
    };

    match state.api.register(&register).await {
        Ok(message) => {
            info!(email = %register.email, "Registered new account");
            let template = RegisterTemplate {
                notice: Some(Notice::success(message).into()),
                errors: FormErrors::default(),
                first_name: String::new(),
                last_name: String::new(),
                email: String::new(),
            };
            render(StatusCode::OK, &template)
        }
        Err(bourse_api::Error::Validation(failure)) => rejected(
            StatusCode::BAD_REQUEST,
            failure.field_errors(),
            Some(Notice::error(failure.summary(REGISTER_FIELDS))),
        ),
        Err(e) => {
            warn!("Registration failed: {e}");
            let status = if e.is_transient() {
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::BAD_REQUEST
            };
            rejected(status, FieldErrors::new(), Some(Notice::error(e.user_message())))
        }
    }
}

/// Logout handler. The backend call is best effort; the cookie is cleared
/// either way.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(token) = state.session_token(&jar)
        && let Err(e) = state.api.logout(&token).await
    {
        warn!("Backend logout failed: {e}");
    }

    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, format!("{LOGIN_PATH}?flash=logged-out")),
            (header::SET_COOKIE, clear_cookie_header(state.cookie_name())),
        ],
    )
        .into_response()
}

// ============================================================================
// Stocks
// ============================================================================

async fn stock_list(
    state: &AppState,
    session: &Session,
    query: &ListQuery,
) -> Result<ListController<StockPages>, WebError> {
    let source = StockPages::new(state.api.clone(), session.token.clone());
    let list = ListController::new(source, query.page(), query.size(state.default_page_size));
    refreshed(session, list).await
}

fn stocks_template(
    list: &ListController<StockPages>,
    form: StockForm,
    errors: FieldErrors,
    notice: Option<Notice>,
) -> StocksTemplate {
    let notice = notice.or_else(|| list.state().notice.clone());
    StocksTemplate {
        notice: notice.map(Into::into),
        table: TableView::new(list, DASHBOARD_PATH).with_empty_message("No stocks yet."),
        errors: errors.into(),
        name: form.name,
        description: form.description,
        current_price: form.current_price,
    }
}

async fn stocks_page(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> PageResult {
    let list = stock_list(&state, &session, &query).await?;
    let notice = list.state().notice.clone().or_else(|| query.flash());
    let template = stocks_template(&list, StockForm::default(), FieldErrors::new(), notice);
    render(StatusCode::OK, &template)
}

async fn stock_create(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<ListQuery>,
    Form(form): Form<StockForm>,
) -> PageResult {
    let rejected = match form.validate() {
        Err(errors) => Feedback::invalid(errors),
        Ok(stock) => match state.api.create_stock(&session.token, &stock).await {
            Ok(created) => {
                info!(stock_id = created.stock_id, name = %stock.name, "Created stock");
                let location = format!(
                    "{DASHBOARD_PATH}?{}&flash=stock-created",
                    query.paging(state.default_page_size)
                );
                return Ok(Redirect::to(&location).into_response());
            }
            Err(e) => Feedback::from_backend(&session, e, STOCK_FIELDS)?,
        },
    };

    let list = stock_list(&state, &session, &query).await?;
    let template = stocks_template(&list, form, rejected.errors, rejected.notice);
    render(rejected.status, &template)
}

async fn stock_delete(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i64>,
) -> PageResult {
    match state.api.delete_stock(&session.token, id).await {
        Ok(()) => {
            info!(stock_id = id, "Deleted stock");
            Ok(Redirect::to(&format!("{DASHBOARD_PATH}?flash=stock-deleted")).into_response())
        }
        Err(e) => {
            let rejected = Feedback::from_backend(&session, e, STOCK_FIELDS)?;
            let list = stock_list(&state, &session, &ListQuery::default()).await?;
            let template =
                stocks_template(&list, StockForm::default(), rejected.errors, rejected.notice);
            render(rejected.status, &template)
        }
    }
}

async fn stock_detail_template(
    state: &AppState,
    session: &Session,
    id: i64,
    query: &ListQuery,
    current_price: String,
    feedback: Feedback,
) -> Result<(StatusCode, StockDetailTemplate), WebError> {
    let stock = state
        .api
        .get_stock(&session.token, id)
        .await
        .map_err(|e| session.fail(e))?;

    let source = StockExchangePages::new(state.api.clone(), session.token.clone(), id);
    let list = ListController::new(source, query.page(), query.size(state.default_page_size));
    let list = refreshed(session, list).await?;
    let table = TableView::new(&list, &format!("/dashboard/stocks/{id}"))
        .read_only()
        .with_empty_message("This stock is not listed on any exchange.");

    let notice = feedback.notice.or_else(|| list.state().notice.clone());
    let template = StockDetailTemplate {
        notice: notice.map(Into::into),
        stock: StockView::from(&stock),
        errors: feedback.errors.into(),
        current_price,
        table,
    };
    Ok((feedback.status, template))
}

async fn stock_detail(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> PageResult {
    let feedback = Feedback {
        status: StatusCode::OK,
        errors: FieldErrors::new(),
        notice: query.flash(),
    };
    let (status, template) =
        stock_detail_template(&state, &session, id, &query, String::new(), feedback).await?;
    render(status, &template)
}

async fn stock_update_price(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i64>,
    Query(query): Query<ListQuery>,
    Form(form): Form<PriceForm>,
) -> PageResult {
    let feedback = match form.validate() {
        Err(errors) => Feedback::invalid(errors),
        Ok(update) => match state.api.update_stock_price(&session.token, id, &update).await {
            Ok(()) => {
                info!(stock_id = id, price = update.current_price, "Updated stock price");
                let location = format!(
                    "/dashboard/stocks/{id}?{}&flash=price-updated",
                    query.paging(state.default_page_size)
                );
                return Ok(Redirect::to(&location).into_response());
            }
            Err(e) => Feedback::from_backend(&session, e, PRICE_FIELDS)?,
        },
    };

    let (status, template) =
        stock_detail_template(&state, &session, id, &query, form.current_price, feedback).await?;
    render(status, &template)
}

// ============================================================================
// Stock exchanges
// ============================================================================

const EXCHANGES_PATH: &str = "/dashboard/stock-exchanges";

/// Exchanges table for the query, live-only or all.
async fn exchange_table(
    state: &AppState,
    session: &Session,
    query: &ListQuery,
) -> Result<(TableView, Option<Notice>), WebError> {
    let page = query.page();
    let size = query.size(state.default_page_size);

    if query.live_only() {
        let source = LiveExchangePages::new(state.api.clone(), session.token.clone());
        let list = refreshed(session, ListController::new(source, page, size)).await?;
        let table = TableView::new(&list, EXCHANGES_PATH)
            .with_param("live", "true")
            .with_empty_message("No exchanges are live right now.");
        Ok((table, list.state().notice.clone()))
    } else {
        let source = ExchangePages::new(state.api.clone(), session.token.clone());
        let list = refreshed(session, ListController::new(source, page, size)).await?;
        let table =
            TableView::new(&list, EXCHANGES_PATH).with_empty_message("No stock exchanges yet.");
        Ok((table, list.state().notice.clone()))
    }
}

async fn exchanges_page(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<ListQuery>,
) -> PageResult {
    let (table, list_notice) = exchange_table(&state, &session, &query).await?;
    let template = ExchangesTemplate {
        notice: list_notice.or_else(|| query.flash()).map(Into::into),
        table,
        live_only: query.live_only(),
        errors: FormErrors::default(),
        name: String::new(),
        description: String::new(),
    };
    render(StatusCode::OK, &template)
}

async fn exchange_create(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<ListQuery>,
    Form(form): Form<ExchangeForm>,
) -> PageResult {
    let rejected = match form.validate() {
        Err(errors) => Feedback::invalid(errors),
        Ok(exchange) => match state.api.create_stock_exchange(&session.token, &exchange).await {
            Ok(created) => {
                info!(
                    exchange_id = created.stock_exchange_id,
                    name = %exchange.name,
                    "Created stock exchange"
                );
                let location = format!(
                    "{EXCHANGES_PATH}?{}&flash=exchange-created",
                    query.paging(state.default_page_size)
                );
                return Ok(Redirect::to(&location).into_response());
            }
            Err(e) => Feedback::from_backend(&session, e, EXCHANGE_FIELDS)?,
        },
    };

    let (table, list_notice) = exchange_table(&state, &session, &query).await?;
    let template = ExchangesTemplate {
        notice: rejected.notice.or(list_notice).map(Into::into),
        table,
        live_only: query.live_only(),
        errors: rejected.errors.into(),
        name: form.name,
        description: form.description,
    };
    render(rejected.status, &template)
}

/// Values shown in the exchange detail forms.
struct ExchangeEdit {
    name: String,
    description: String,
    live: bool,
    stock_id: String,
}

impl From<&StockExchange> for ExchangeEdit {
    fn from(exchange: &StockExchange) -> Self {
        Self {
            name: exchange.name.clone().unwrap_or_default(),
            description: exchange.description.clone().unwrap_or_default(),
            live: exchange.live_in_market,
            stock_id: String::new(),
        }
    }
}

async fn exchange_listings(
    state: &AppState,
    session: &Session,
    id: i64,
    query: &ListQuery,
) -> Result<ListController<ExchangeStockPages>, WebError> {
    let source = ExchangeStockPages::new(state.api.clone(), session.token.clone(), id);
    let list = ListController::new(source, query.page(), query.size(state.default_page_size));
    refreshed(session, list).await
}

/// Render the exchange detail page around an already loaded listings table.
async fn exchange_detail_response(
    state: &AppState,
    session: &Session,
    list: &ListController<ExchangeStockPages>,
    edit: impl FnOnce(&StockExchange) -> ExchangeEdit,
    feedback: Feedback,
) -> PageResult {
    let id = list.source().exchange_id();
    let exchange = state
        .api
        .get_stock_exchange(&session.token, id)
        .await
        .map_err(|e| session.fail(e))?;
    let edit = edit(&exchange);

    let notice = feedback.notice.or_else(|| list.state().notice.clone());
    let table = TableView::new(list, &format!("{EXCHANGES_PATH}/{id}"))
        .selectable()
        .with_empty_message("No stocks are listed on this exchange.");

    let template = ExchangeDetailTemplate {
        notice: notice.map(Into::into),
        exchange: ExchangeView::from(&exchange),
        errors: feedback.errors.into(),
        name: edit.name,
        description: edit.description,
        live: edit.live,
        stock_id: edit.stock_id,
        table,
    };
    render(feedback.status, &template)
}

async fn exchange_detail(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i64>,
    Query(query): Query<ListQuery>,
) -> PageResult {
    let list = exchange_listings(&state, &session, id, &query).await?;
    let feedback = Feedback {
        status: StatusCode::OK,
        errors: FieldErrors::new(),
        notice: list.state().notice.clone().or_else(|| query.flash()),
    };
    exchange_detail_response(&state, &session, &list, |e| ExchangeEdit::from(e), feedback).await
}

async fn exchange_update(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i64>,
    Form(form): Form<ExchangeUpdateForm>,
) -> PageResult {
    let rejected = match form.validate() {
        Err(errors) => Feedback::invalid(errors),
        Ok(update) => match state.api.update_stock_exchange(&session.token, id, &update).await {
            Ok(()) => {
                info!(exchange_id = id, live = update.live_in_market, "Updated stock exchange");
                let location = format!("{EXCHANGES_PATH}/{id}?flash=exchange-updated");
                return Ok(Redirect::to(&location).into_response());
            }
            Err(e) => Feedback::from_backend(&session, e, EXCHANGE_DETAIL_FIELDS)?,
        },
    };

    let list = exchange_listings(&state, &session, id, &ListQuery::default()).await?;
    let submitted = |_: &StockExchange| ExchangeEdit {
        name: form.name.clone(),
        description: form.description.clone(),
        live: form.live_in_market.is_some(),
        stock_id: String::new(),
    };
    exchange_detail_response(&state, &session, &list, submitted, rejected).await
}

async fn exchange_delete(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i64>,
) -> PageResult {
    match state.api.delete_stock_exchange(&session.token, id).await {
        Ok(()) => {
            info!(exchange_id = id, "Deleted stock exchange");
            Ok(Redirect::to(&format!("{EXCHANGES_PATH}?flash=exchange-deleted")).into_response())
        }
        Err(e) => {
            let rejected = Feedback::from_backend(&session, e, EXCHANGE_DETAIL_FIELDS)?;
            let list = exchange_listings(&state, &session, id, &ListQuery::default()).await?;
            exchange_detail_response(&state, &session, &list, |e| ExchangeEdit::from(e), rejected)
                .await
        }
    }
}

async fn exchange_add_stock(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i64>,
    Query(query): Query<ListQuery>,
    Form(form): Form<AddListingForm>,
) -> PageResult {
    let rejected = match form.validate() {
        Err(errors) => Feedback::invalid(errors),
        Ok(stock_id) => match state.api.add_stock_to_exchange(&session.token, id, stock_id).await {
            Ok(()) => {
                info!(exchange_id = id, stock_id, "Listed stock on exchange");
                let location = format!(
                    "{EXCHANGES_PATH}/{id}?{}&flash=listing-added",
                    query.paging(state.default_page_size)
                );
                return Ok(Redirect::to(&location).into_response());
            }
            Err(e) => Feedback::from_backend(&session, e, EXCHANGE_DETAIL_FIELDS)?,
        },
    };

    let list = exchange_listings(&state, &session, id, &query).await?;
    let submitted = |exchange: &StockExchange| ExchangeEdit {
        stock_id: form.stock_id.clone(),
        ..ExchangeEdit::from(exchange)
    };
    exchange_detail_response(&state, &session, &list, submitted, rejected).await
}

/// Bulk removal of the checked listings, one backend call for all of them.
async fn exchange_remove_stocks(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<i64>,
    Query(query): Query<ListQuery>,
    axum_extra::extract::Form(form): axum_extra::extract::Form<RemoveListingsForm>,
) -> PageResult {
    let source = ExchangeStockPages::new(state.api.clone(), session.token.clone(), id);
    let mut list = ListController::new(source, query.page(), query.size(state.default_page_size))
        .with_selection(form.stock_ids);

    let outcome = list.remove_selected().await.map_err(|e| session.expired(e))?;
    let (status, notice) = match outcome {
        BulkOutcome::Removed(count) => {
            info!(exchange_id = id, count, "Removed stocks from exchange");
            (StatusCode::OK, None)
        }
        BulkOutcome::NothingSelected => (
            StatusCode::BAD_REQUEST,
            Some(Notice::error("Select at least one stock to remove")),
        ),
        BulkOutcome::Failed => (StatusCode::BAD_GATEWAY, list.state().notice.clone()),
    };

    // a removal that did not happen left the table unloaded
    if !matches!(outcome, BulkOutcome::Removed(_)) {
        list.refresh().await.map_err(|e| session.expired(e))?;
    }

    let rejected = Feedback {
        status,
        errors: FieldErrors::new(),
        notice,
    };
    exchange_detail_response(&state, &session, &list, |e| ExchangeEdit::from(e), rejected).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_defaults_and_invalid_size() {
        let query = ListQuery::default();
        assert_eq!(query.page(), 0);
        assert_eq!(query.size(PageSize::Ten), PageSize::Ten);
        assert!(!query.live_only());

        let query = ListQuery {
            page: Some(3),
            size: Some(7),
            ..ListQuery::default()
        };
        assert_eq!(query.size(PageSize::Twenty), PageSize::Twenty);
        assert_eq!(query.paging(PageSize::Twenty), "page=3&size=20");
    }

    #[test]
    fn test_only_known_flash_keys_are_shown() {
        let notice = flash_notice("stock-created").unwrap();
        assert!(!notice.is_error());
        assert_eq!(notice.message, "Stock created successfully");
        assert!(flash_notice("<script>").is_none());
    }
}
