//! Askama templates for the dashboard.

use askama::Template;
use bourse_api::{FieldErrors, PageSize, Stock, StockExchange};

use crate::format::{
    NO_DESCRIPTION, UNNAMED_EXCHANGE, UNNAMED_STOCK, format_optional_date,
    format_optional_datetime, format_price, market_status, or_placeholder,
};
use crate::listing::{ListController, Notice, NoticeKind, PageSource, RowAction, TableRow};

/// Field errors as looked up by the templates.
#[derive(Debug, Clone, Default)]
pub struct FormErrors(FieldErrors);

impl FormErrors {
    pub fn get(&self, field: &str) -> Option<&String> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<FieldErrors> for FormErrors {
    fn from(errors: FieldErrors) -> Self {
        Self(errors)
    }
}

/// Banner above the page content
pub struct NoticeView {
    pub class: &'static str,
    pub message: String,
}

impl From<Notice> for NoticeView {
    fn from(notice: Notice) -> Self {
        let class = match notice.kind {
            NoticeKind::Success => "notice notice-success",
            NoticeKind::Error => "notice notice-error",
        };
        Self {
            class,
            message: notice.message,
        }
    }
}

// ============================================================================
// Tables
// ============================================================================

pub struct RowView {
    pub id: i64,
    pub number: u64,
    pub cells: Vec<String>,
    pub href: Option<String>,
    pub actions: Vec<RowAction>,
    pub selected: bool,
}

pub struct SizeOption {
    pub value: u32,
    pub selected: bool,
}

/// Everything the shared table partial needs, for any `TableRow` type.
pub struct TableView {
    pub columns: Vec<&'static str>,
    pub rows: Vec<RowView>,
    pub empty_message: &'static str,
    /// Rows carry a checkbox named `stock_ids`
    pub selectable: bool,
    pub show_actions: bool,
    /// Path the pagination links point at
    pub base_path: String,
    /// Query parameters kept across page changes
    pub extra_params: Vec<(String, String)>,
    pub page: u32,
    pub page_size: u32,
    pub sizes: Vec<SizeOption>,
    pub display_page: u32,
    pub display_total_pages: u32,
    pub has_previous: bool,
    pub has_next: bool,
    pub showing_first: u64,
    pub showing_last: u64,
    pub total_elements: u64,
    pub is_loading: bool,
}

impl TableView {
    pub fn new<S: PageSource>(list: &ListController<S>, base_path: &str) -> Self {
        let state = list.state();
        let rows = state
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| RowView {
                id: row.row_id(),
                number: list.row_number(index),
                cells: row.cells(),
                href: row.detail_href(),
                actions: row.actions(),
                selected: list.is_selected(row.row_id()),
            })
            .collect();
        let (showing_first, showing_last) = list.showing_range();

        Self {
            columns: S::Item::COLUMNS.to_vec(),
            rows,
            empty_message: "Nothing to show yet.",
            selectable: false,
            show_actions: true,
            base_path: base_path.to_string(),
            extra_params: Vec::new(),
            page: state.page,
            page_size: state.page_size.get(),
            sizes: PageSize::ALL
                .iter()
                .map(|size| SizeOption {
                    value: size.get(),
                    selected: *size == state.page_size,
                })
                .collect(),
            display_page: list.display_page(),
            display_total_pages: list.display_total_pages(),
            has_previous: list.has_previous(),
            has_next: list.has_next(),
            showing_first,
            showing_last,
            total_elements: state.total_elements,
            is_loading: state.is_loading,
        }
    }

    /// No per-row actions, for tables shown alongside another record.
    pub fn read_only(mut self) -> Self {
        self.show_actions = false;
        self
    }

    /// Checkbox column instead of per-row actions.
    pub fn selectable(mut self) -> Self {
        self.selectable = true;
        self.show_actions = false;
        self
    }

    pub fn with_param(mut self, name: &str, value: &str) -> Self {
        self.extra_params.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_empty_message(mut self, message: &'static str) -> Self {
        self.empty_message = message;
        self
    }

    fn query(&self, page: u32, size: u32) -> String {
        let mut query: Vec<String> = self
            .extra_params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect();
        query.push(format!("page={page}"));
        query.push(format!("size={size}"));
        query.join("&")
    }

    pub fn page_href(&self, page: u32) -> String {
        format!("{}?{}", self.base_path, self.query(page, self.page_size))
    }

    /// Same listing with the current page and size, for form actions.
    pub fn current_query(&self) -> String {
        self.query(self.page, self.page_size)
    }

    pub fn previous_page(&self) -> u32 {
        self.page.saturating_sub(1)
    }

    pub fn next_page(&self) -> u32 {
        self.page + 1
    }

    pub fn column_count(&self) -> usize {
        // number column, optional checkbox and actions columns
        self.columns.len()
            + 1
            + usize::from(self.selectable)
            + usize::from(self.show_actions)
    }
}

// ============================================================================
// Detail views
// ============================================================================

pub struct StockView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: String,
    pub listed: String,
    pub updated: String,
}

impl From<&Stock> for StockView {
    fn from(stock: &Stock) -> Self {
        Self {
            id: stock.stock_id,
            name: or_placeholder(stock.name.as_deref(), UNNAMED_STOCK),
            description: or_placeholder(stock.description.as_deref(), NO_DESCRIPTION),
            price: format_price(stock.current_price),
            listed: format_optional_date(stock.listing_date),
            updated: format_optional_datetime(stock.updated_at),
        }
    }
}

pub struct ExchangeView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub status: &'static str,
    pub live: bool,
}

impl From<&StockExchange> for ExchangeView {
    fn from(exchange: &StockExchange) -> Self {
        Self {
            id: exchange.stock_exchange_id,
            name: or_placeholder(exchange.name.as_deref(), UNNAMED_EXCHANGE),
            description: or_placeholder(exchange.description.as_deref(), NO_DESCRIPTION),
            status: market_status(exchange.live_in_market),
            live: exchange.live_in_market,
        }
    }
}

// ============================================================================
// Pages
// ============================================================================

/// Login page template
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub notice: Option<NoticeView>,
    pub errors: FormErrors,
    pub email: String,
    /// Hidden field, passed back on submit
    pub from: String,
}

/// Registration page template
#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub notice: Option<NoticeView>,
    pub errors: FormErrors,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Stocks table with the create form
#[derive(Template)]
#[template(path = "stocks.html")]
pub struct StocksTemplate {
    pub notice: Option<NoticeView>,
    pub table: TableView,
    pub errors: FormErrors,
    pub name: String,
    pub description: String,
    pub current_price: String,
}

/// Exchanges table with the create form
#[derive(Template)]
#[template(path = "exchanges.html")]
pub struct ExchangesTemplate {
    pub notice: Option<NoticeView>,
    pub table: TableView,
    pub live_only: bool,
    pub errors: FormErrors,
    pub name: String,
    pub description: String,
}

#[derive(Template)]
#[template(path = "stock_detail.html")]
pub struct StockDetailTemplate {
    pub notice: Option<NoticeView>,
    pub stock: StockView,
    pub errors: FormErrors,
    pub current_price: String,
    /// Exchanges listing this stock
    pub table: TableView,
}

/// Exchange detail: update form, add-listing form and the listings table
#[derive(Template)]
#[template(path = "exchange_detail.html")]
pub struct ExchangeDetailTemplate {
    pub notice: Option<NoticeView>,
    pub exchange: ExchangeView,
    pub errors: FormErrors,
    pub name: String,
    pub description: String,
    pub live: bool,
    pub stock_id: String,
    pub table: TableView,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub message: String,
}
