//! Paginated list controller shared by every table in the dashboard.
//!
//! One controller drives any collection: the entity type comes from the
//! [`PageSource`], the fetch is `PageSource::fetch_page`, and rows are
//! rendered through [`TableRow`]. Each request builds a controller from its
//! query parameters, refreshes it and hands the state to a template.

use async_trait::async_trait;
use bourse_api::{BourseApi, Page, PageRequest, PageSize, SessionToken, Stock, StockExchange};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::format::{
    NO_DESCRIPTION, UNNAMED_EXCHANGE, UNNAMED_STOCK, format_optional_date,
    format_optional_datetime, format_price, market_status, or_placeholder,
};

// ============================================================================
// Seams
// ============================================================================

/// Fetches one page of a collection from the backend.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: TableRow + Send;

    async fn fetch_page(&self, request: PageRequest) -> bourse_api::Result<Page<Self::Item>>;
}

/// Collections whose rows can be removed in bulk.
#[async_trait]
pub trait BulkRemover: Send + Sync {
    /// Remove every id in one backend call.
    async fn remove(&self, ids: &[i64]) -> bourse_api::Result<()>;
}

/// How an entity shows up as a table row.
pub trait TableRow {
    const COLUMNS: &'static [&'static str];

    fn row_id(&self) -> i64;

    /// Display text per column, same length as `COLUMNS`.
    fn cells(&self) -> Vec<String>;

    fn detail_href(&self) -> Option<String> {
        None
    }

    /// Per-row buttons, each a POST form.
    fn actions(&self) -> Vec<RowAction> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowAction {
    pub label: &'static str,
    pub action: String,
    /// Confirmation prompt shown before submitting
    pub confirm: Option<String>,
}

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// Banner message shown above a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success<S: Into<String>>(message: S) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

#[derive(Debug, Clone)]
pub struct ListState<T> {
    pub page: u32,
    pub page_size: PageSize,
    pub rows: Vec<T>,
    pub total_pages: u32,
    pub total_elements: u64,
    pub is_loading: bool,
    pub selection: BTreeSet<i64>,
    pub notice: Option<Notice>,
}

impl<T> ListState<T> {
    fn new(page: u32, page_size: PageSize) -> Self {
        Self {
            page,
            page_size,
            rows: Vec::new(),
            total_pages: 0,
            total_elements: 0,
            is_loading: false,
            selection: BTreeSet::new(),
            notice: None,
        }
    }
}

/// Handed out by [`ListController::begin_load`]; only the newest ticket may
/// change state when its response arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
    pub request: PageRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    /// The page index was past the end; it now points at the last page and
    /// needs one more load.
    OutOfRange { clamped_to: u32 },
    /// Rows kept, error notice set
    Failed,
    /// Response for a superseded request, dropped
    Stale,
    /// Request for a page that does not exist, nothing fetched
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOutcome {
    NothingSelected,
    Removed(usize),
    Failed,
}

/// The backend rejected the session. Not recoverable inside a list; the
/// caller has to send the user back to the login page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("session rejected by the backend")]
pub struct AuthorizationError;

// ============================================================================
// Controller
// ============================================================================

pub struct ListController<S: PageSource> {
    source: S,
    state: ListState<S::Item>,
    generation: u64,
}

impl<S: PageSource> ListController<S> {
    pub fn new(source: S, page: u32, page_size: PageSize) -> Self {
        Self {
            source,
            state: ListState::new(page, page_size),
            generation: 0,
        }
    }

    /// Start with some rows already selected (e.g. re-rendering a form).
    pub fn with_selection<I: IntoIterator<Item = i64>>(mut self, ids: I) -> Self {
        self.state.selection.extend(ids);
        self
    }

    pub fn state(&self) -> &ListState<S::Item> {
        &self.state
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.state.is_loading = true;
        LoadTicket {
            generation: self.generation,
            request: PageRequest::new(self.state.page, self.state.page_size),
        }
    }

    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: bourse_api::Result<Page<S::Item>>,
    ) -> Result<LoadOutcome, AuthorizationError> {
        if ticket.generation != self.generation {
            debug!(
                generation = ticket.generation,
                current = self.generation,
                "Dropping stale page response"
            );
            return Ok(LoadOutcome::Stale);
        }
        self.state.is_loading = false;

        let page = match result {
            Ok(page) => page,
            Err(e) if e.is_unauthorized() => return Err(AuthorizationError),
            Err(e) => {
                warn!(page = ticket.request.page, "Failed to load page: {e}");
                self.state.notice = Some(Notice::error(e.user_message()));
                return Ok(LoadOutcome::Failed);
            }
        };

        let mut rows = page.content;
        let size = self.state.page_size.get() as usize;
        if rows.len() > size {
            warn!(
                returned = rows.len(),
                size, "Backend returned more rows than requested, truncating"
            );
            rows.truncate(size);
        }

        self.state.rows = rows;
        self.state.total_pages = page.total_pages;
        self.state.total_elements = page.total_elements;
        if self.state.notice.as_ref().is_some_and(Notice::is_error) {
            self.state.notice = None;
        }

        if self.state.total_pages > 0 && self.state.page >= self.state.total_pages {
            let clamped_to = self.state.total_pages - 1;
            debug!(
                from = self.state.page,
                to = clamped_to,
                "Page index past the end, clamping"
            );
            self.state.page = clamped_to;
            return Ok(LoadOutcome::OutOfRange { clamped_to });
        }

        Ok(LoadOutcome::Loaded)
    }

    /// Fetch the current page once.
    pub async fn load(&mut self) -> Result<LoadOutcome, AuthorizationError> {
        let ticket = self.begin_load();
        let result = self.source.fetch_page(ticket.request).await;
        self.finish_load(ticket, result)
    }

    /// Load, then reload once more if the page had to be clamped. A second
    /// out-of-range answer is returned as is.
    pub async fn refresh(&mut self) -> Result<LoadOutcome, AuthorizationError> {
        match self.load().await? {
            LoadOutcome::OutOfRange { .. } => self.load().await,
            outcome => Ok(outcome),
        }
    }

    pub async fn set_page(&mut self, page: u32) -> Result<LoadOutcome, AuthorizationError> {
        if self.state.total_pages > 0 && page >= self.state.total_pages {
            return Ok(LoadOutcome::Ignored);
        }
        self.state.page = page;
        self.refresh().await
    }

    pub async fn next_page(&mut self) -> Result<LoadOutcome, AuthorizationError> {
        if !self.has_next() {
            return Ok(LoadOutcome::Ignored);
        }
        self.set_page(self.state.page + 1).await
    }

    pub async fn previous_page(&mut self) -> Result<LoadOutcome, AuthorizationError> {
        if !self.has_previous() {
            return Ok(LoadOutcome::Ignored);
        }
        self.set_page(self.state.page - 1).await
    }

    pub async fn set_page_size(
        &mut self,
        page_size: PageSize,
    ) -> Result<LoadOutcome, AuthorizationError> {
        self.state.page_size = page_size;
        self.state.page = 0;
        self.state.selection.clear();
        self.refresh().await
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    pub fn select(&mut self, id: i64) {
        self.state.selection.insert(id);
    }

    pub fn deselect(&mut self, id: i64) {
        self.state.selection.remove(&id);
    }

    pub fn toggle(&mut self, id: i64) {
        if !self.state.selection.remove(&id) {
            self.state.selection.insert(id);
        }
    }

    pub fn clear_selection(&mut self) {
        self.state.selection.clear();
    }

    pub fn is_selected(&self, id: i64) -> bool {
        self.state.selection.contains(&id)
    }

    // ------------------------------------------------------------------------
    // Derived values
    // ------------------------------------------------------------------------

    pub fn has_next(&self) -> bool {
        self.state.page + 1 < self.state.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.state.page > 0
    }

    /// One-based position of a row across all pages.
    pub fn row_number(&self, index: usize) -> u64 {
        row_number(self.state.page, self.state.page_size, index)
    }

    /// First and last row number on the current page, `(0, 0)` when empty.
    pub fn showing_range(&self) -> (u64, u64) {
        match self.state.rows.len() {
            0 => (0, 0),
            len => (self.row_number(0), self.row_number(len - 1)),
        }
    }

    pub fn display_page(&self) -> u32 {
        self.state.page + 1
    }

    pub fn display_total_pages(&self) -> u32 {
        self.state.total_pages.max(1)
    }
}

impl<S: PageSource + BulkRemover> ListController<S> {
    /// Remove all selected rows with a single backend call.
    pub async fn remove_selected(&mut self) -> Result<BulkOutcome, AuthorizationError> {
        if self.state.selection.is_empty() {
            return Ok(BulkOutcome::NothingSelected);
        }

        let ids: Vec<i64> = self.state.selection.iter().copied().collect();
        match self.source.remove(&ids).await {
            Ok(()) => {
                let removed = ids.len();
                self.state.selection.clear();
                self.state.notice = Some(Notice::success(format!(
                    "Removed {removed} {}",
                    if removed == 1 { "entry" } else { "entries" }
                )));
                self.refresh().await?;
                Ok(BulkOutcome::Removed(removed))
            }
            Err(e) if e.is_unauthorized() => Err(AuthorizationError),
            Err(e) => {
                warn!(count = ids.len(), "Bulk removal failed: {e}");
                self.state.notice = Some(Notice::error(e.user_message()));
                Ok(BulkOutcome::Failed)
            }
        }
    }
}

pub fn row_number(page: u32, page_size: PageSize, index: usize) -> u64 {
    u64::from(page) * u64::from(page_size.get()) + index as u64 + 1
}

// ============================================================================
// Row rendering
// ============================================================================

impl TableRow for Stock {
    const COLUMNS: &'static [&'static str] =
        &["Name", "Description", "Price", "Listed", "Last Update"];

    fn row_id(&self) -> i64 {
        self.stock_id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            or_placeholder(self.name.as_deref(), UNNAMED_STOCK),
            or_placeholder(self.description.as_deref(), NO_DESCRIPTION),
            format_price(self.current_price),
            format_optional_date(self.listing_date),
            format_optional_datetime(self.updated_at),
        ]
    }

    fn detail_href(&self) -> Option<String> {
        Some(format!("/dashboard/stocks/{}", self.stock_id))
    }

    fn actions(&self) -> Vec<RowAction> {
        vec![RowAction {
            label: "Delete",
            action: format!("/dashboard/stocks/{}/delete", self.stock_id),
            confirm: Some(format!(
                "Delete {}?",
                or_placeholder(self.name.as_deref(), UNNAMED_STOCK)
            )),
        }]
    }
}

impl TableRow for StockExchange {
    const COLUMNS: &'static [&'static str] = &["Name", "Description", "Status"];

    fn row_id(&self) -> i64 {
        self.stock_exchange_id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            or_placeholder(self.name.as_deref(), UNNAMED_EXCHANGE),
            or_placeholder(self.description.as_deref(), NO_DESCRIPTION),
            market_status(self.live_in_market).to_string(),
        ]
    }

    fn detail_href(&self) -> Option<String> {
        Some(format!("/dashboard/stock-exchanges/{}", self.stock_exchange_id))
    }

    fn actions(&self) -> Vec<RowAction> {
        vec![RowAction {
            label: "Delete",
            action: format!("/dashboard/stock-exchanges/{}/delete", self.stock_exchange_id),
            confirm: Some(format!(
                "Delete {}?",
                or_placeholder(self.name.as_deref(), UNNAMED_EXCHANGE)
            )),
        }]
    }
}

// ============================================================================
// Backend sources
// ============================================================================

/// All stocks.
pub struct StockPages {
    api: Arc<BourseApi>,
    session: SessionToken,
}

impl StockPages {
    pub fn new(api: Arc<BourseApi>, session: SessionToken) -> Self {
        Self { api, session }
    }
}

#[async_trait]
impl PageSource for StockPages {
    type Item = Stock;

    async fn fetch_page(&self, request: PageRequest) -> bourse_api::Result<Page<Stock>> {
        self.api.list_stocks(&self.session, request).await
    }
}

/// All stock exchanges.
pub struct ExchangePages {
    api: Arc<BourseApi>,
    session: SessionToken,
}

impl ExchangePages {
    pub fn new(api: Arc<BourseApi>, session: SessionToken) -> Self {
        Self { api, session }
    }
}

#[async_trait]
impl PageSource for ExchangePages {
    type Item = StockExchange;

    async fn fetch_page(&self, request: PageRequest) -> bourse_api::Result<Page<StockExchange>> {
        self.api.list_stock_exchanges(&self.session, request).await
    }
}

/// Exchanges currently live in the market.
pub struct LiveExchangePages {
    api: Arc<BourseApi>,
    session: SessionToken,
}

impl LiveExchangePages {
    pub fn new(api: Arc<BourseApi>, session: SessionToken) -> Self {
        Self { api, session }
    }
}

#[async_trait]
impl PageSource for LiveExchangePages {
    type Item = StockExchange;

    async fn fetch_page(&self, request: PageRequest) -> bourse_api::Result<Page<StockExchange>> {
        self.api.list_live_stock_exchanges(&self.session, request).await
    }
}

/// Exchanges listing one stock.
pub struct StockExchangePages {
    api: Arc<BourseApi>,
    session: SessionToken,
    stock_id: i64,
}

impl StockExchangePages {
    pub fn new(api: Arc<BourseApi>, session: SessionToken, stock_id: i64) -> Self {
        Self {
            api,
            session,
            stock_id,
        }
    }
}

#[async_trait]
impl PageSource for StockExchangePages {
    type Item = StockExchange;

    async fn fetch_page(&self, request: PageRequest) -> bourse_api::Result<Page<StockExchange>> {
        self.api
            .list_exchanges_for_stock(&self.session, self.stock_id, request)
            .await
    }
}

/// Stocks listed on one exchange. Supports bulk removal of listings.
pub struct ExchangeStockPages {
    api: Arc<BourseApi>,
    session: SessionToken,
    exchange_id: i64,
}

impl ExchangeStockPages {
    pub fn new(api: Arc<BourseApi>, session: SessionToken, exchange_id: i64) -> Self {
        Self {
            api,
            session,
            exchange_id,
        }
    }

    pub fn exchange_id(&self) -> i64 {
        self.exchange_id
    }
}

#[async_trait]
impl PageSource for ExchangeStockPages {
    type Item = Stock;

    async fn fetch_page(&self, request: PageRequest) -> bourse_api::Result<Page<Stock>> {
        self.api
            .list_stocks_in_exchange(&self.session, self.exchange_id, request)
            .await
    }
}

#[async_trait]
impl BulkRemover for ExchangeStockPages {
    async fn remove(&self, ids: &[i64]) -> bourse_api::Result<()> {
        self.api
            .remove_stocks_from_exchange(&self.session, self.exchange_id, ids)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bourse_api::{Error, StatusCode};
    use std::sync::Mutex;

    fn stock(id: i64) -> Stock {
        Stock {
            stock_id: id,
            name: Some(format!("Stock {id}")),
            description: None,
            current_price: Some(10.0 * id as f64),
            listing_date: None,
            updated_at: None,
        }
    }

    /// In-memory collection of `total` stocks, paged like the backend.
    #[derive(Default)]
    struct FakeStocks {
        ids: Mutex<Vec<i64>>,
        requests: Mutex<Vec<PageRequest>>,
        removals: Mutex<Vec<Vec<i64>>>,
        fail_with: Mutex<Option<Error>>,
    }

    impl FakeStocks {
        fn with_total(total: i64) -> Self {
            Self {
                ids: Mutex::new((1..=total).collect()),
                ..Default::default()
            }
        }

        fn fail_next(&self, error: Error) {
            *self.fail_with.lock().unwrap() = Some(error);
        }

        fn page(&self, request: PageRequest) -> Page<Stock> {
            let ids = self.ids.lock().unwrap();
            let size = request.size.get() as usize;
            let total_pages = ids.len().div_ceil(size) as u32;
            let content = ids
                .iter()
                .skip(request.page as usize * size)
                .take(size)
                .map(|id| stock(*id))
                .collect();
            Page {
                content,
                total_elements: ids.len() as u64,
                total_pages,
                size: size as u32,
                number: request.page,
            }
        }
    }

    #[async_trait]
    impl PageSource for FakeStocks {
        type Item = Stock;

        async fn fetch_page(&self, request: PageRequest) -> bourse_api::Result<Page<Stock>> {
            self.requests.lock().unwrap().push(request);
            if let Some(e) = self.fail_with.lock().unwrap().take() {
                return Err(e);
            }
            Ok(self.page(request))
        }
    }

    #[async_trait]
    impl BulkRemover for FakeStocks {
        async fn remove(&self, ids: &[i64]) -> bourse_api::Result<()> {
            self.removals.lock().unwrap().push(ids.to_vec());
            if let Some(e) = self.fail_with.lock().unwrap().take() {
                return Err(e);
            }
            self.ids.lock().unwrap().retain(|id| !ids.contains(id));
            Ok(())
        }
    }

    fn server_error() -> Error {
        Error::Http {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "database down".into(),
        }
    }

    #[tokio::test]
    async fn test_out_of_range_page_converges_with_one_reload() {
        // 11 rows at 5 per page = 3 pages, client asks for page 5
        let mut list = ListController::new(FakeStocks::with_total(11), 5, PageSize::Five);

        let outcome = list.refresh().await.unwrap();

        assert_eq!(outcome, LoadOutcome::Loaded);
        assert_eq!(list.state().page, 2);
        assert_eq!(list.state().rows.len(), 1);
        assert_eq!(
            *list.source().requests.lock().unwrap(),
            vec![
                PageRequest::new(5, PageSize::Five),
                PageRequest::new(2, PageSize::Five)
            ]
        );
    }

    #[tokio::test]
    async fn test_load_reports_clamp_without_refetching() {
        let mut list = ListController::new(FakeStocks::with_total(11), 5, PageSize::Five);

        let outcome = list.load().await.unwrap();

        assert_eq!(outcome, LoadOutcome::OutOfRange { clamped_to: 2 });
        assert_eq!(list.state().page, 2);
        assert_eq!(list.source().requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_collection_keeps_page_zero() {
        let mut list = ListController::new(FakeStocks::with_total(0), 0, PageSize::Ten);
        assert_eq!(list.refresh().await.unwrap(), LoadOutcome::Loaded);
        assert_eq!(list.state().page, 0);
        assert_eq!(list.display_total_pages(), 1);
        assert_eq!(list.showing_range(), (0, 0));
    }

    #[tokio::test]
    async fn test_rows_never_exceed_page_size() {
        for size in PageSize::ALL {
            let mut list = ListController::new(FakeStocks::with_total(73), 0, size);
            list.refresh().await.unwrap();
            assert!(list.state().rows.len() <= size.get() as usize);

            while list.has_next() {
                list.next_page().await.unwrap();
                assert!(list.state().rows.len() <= size.get() as usize);
            }
        }
    }

    #[test]
    fn test_oversized_page_is_truncated() {
        let mut list = ListController::new(FakeStocks::default(), 0, PageSize::Five);
        let ticket = list.begin_load();
        let page = Page {
            content: (1..=8).map(stock).collect(),
            total_elements: 8,
            total_pages: 1,
            size: 8,
            number: 0,
        };
        list.finish_load(ticket, Ok(page)).unwrap();
        assert_eq!(list.state().rows.len(), 5);
    }

    #[test]
    fn test_stale_response_is_discarded() {
        let source = FakeStocks::with_total(30);
        let first_page = source.page(PageRequest::new(0, PageSize::Ten));
        let second_page = source.page(PageRequest::new(1, PageSize::Ten));
        let mut list = ListController::new(source, 0, PageSize::Ten);

        let old = list.begin_load();
        list.state.page = 1;
        let new = list.begin_load();

        assert_eq!(list.finish_load(new, Ok(second_page)).unwrap(), LoadOutcome::Loaded);
        assert_eq!(list.finish_load(old, Ok(first_page)).unwrap(), LoadOutcome::Stale);

        assert_eq!(list.state().rows[0].stock_id, 11);
        assert!(!list.state().is_loading);
    }

    #[test]
    fn test_stale_response_leaves_loading_flag() {
        let mut list = ListController::new(FakeStocks::default(), 0, PageSize::Ten);
        let old = list.begin_load();
        let _new = list.begin_load();

        let outcome = list.finish_load(old, Err(server_error())).unwrap();
        assert_eq!(outcome, LoadOutcome::Stale);
        assert!(list.state().is_loading);
        assert!(list.state().notice.is_none());
    }

    #[tokio::test]
    async fn test_set_page_size_resets_page_and_selection() {
        let mut list = ListController::new(FakeStocks::with_total(40), 0, PageSize::Five);
        list.refresh().await.unwrap();
        list.set_page(3).await.unwrap();
        list.select(16);
        list.select(17);

        list.set_page_size(PageSize::Twenty).await.unwrap();

        assert_eq!(list.state().page, 0);
        assert_eq!(list.state().page_size, PageSize::Twenty);
        assert!(list.state().selection.is_empty());
        assert_eq!(list.state().rows.len(), 20);
    }

    #[tokio::test]
    async fn test_set_page_outside_range_is_ignored() {
        let mut list = ListController::new(FakeStocks::with_total(12), 0, PageSize::Five);
        list.refresh().await.unwrap();
        let fetches = list.source().requests.lock().unwrap().len();

        assert_eq!(list.set_page(3).await.unwrap(), LoadOutcome::Ignored);
        assert_eq!(list.previous_page().await.unwrap(), LoadOutcome::Ignored);
        assert_eq!(list.source().requests.lock().unwrap().len(), fetches);

        list.set_page(2).await.unwrap();
        assert!(!list.has_next());
        assert_eq!(list.next_page().await.unwrap(), LoadOutcome::Ignored);
        assert_eq!(list.state().page, 2);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_rows_and_sets_notice() {
        let mut list = ListController::new(FakeStocks::with_total(12), 0, PageSize::Five);
        list.refresh().await.unwrap();
        let before: Vec<i64> = list.state().rows.iter().map(|s| s.stock_id).collect();

        list.source().fail_next(server_error());
        let outcome = list.next_page().await.unwrap();

        assert_eq!(outcome, LoadOutcome::Failed);
        let after: Vec<i64> = list.state().rows.iter().map(|s| s.stock_id).collect();
        assert_eq!(before, after);
        assert!(!list.state().is_loading);
        let notice = list.state().notice.clone().unwrap();
        assert!(notice.is_error());
        assert!(notice.message.contains("database down"));

        // next successful load clears the error
        list.refresh().await.unwrap();
        assert!(list.state().notice.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized_escapes() {
        let mut list = ListController::new(FakeStocks::with_total(12), 0, PageSize::Five);
        list.source().fail_next(Error::Unauthorized);
        assert_eq!(list.refresh().await, Err(AuthorizationError));
    }

    #[tokio::test]
    async fn test_remove_selected_is_one_call() {
        let mut list = ListController::new(FakeStocks::with_total(5), 0, PageSize::Five);
        list.refresh().await.unwrap();
        list.select(2);
        list.select(4);

        let outcome = list.remove_selected().await.unwrap();

        assert_eq!(outcome, BulkOutcome::Removed(2));
        assert_eq!(*list.source().removals.lock().unwrap(), vec![vec![2, 4]]);
        assert!(list.state().selection.is_empty());
        let ids: Vec<i64> = list.state().rows.iter().map(|s| s.stock_id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
        assert_eq!(list.state().notice, Some(Notice::success("Removed 2 entries")));
    }

    #[tokio::test]
    async fn test_remove_selected_with_nothing_selected() {
        let mut list = ListController::new(FakeStocks::with_total(5), 0, PageSize::Five);
        assert_eq!(
            list.remove_selected().await.unwrap(),
            BulkOutcome::NothingSelected
        );
        assert!(list.source().removals.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_removal_keeps_selection() {
        let mut list = ListController::new(FakeStocks::with_total(5), 0, PageSize::Five)
            .with_selection([1, 3]);
        list.refresh().await.unwrap();

        list.source().fail_next(server_error());
        let outcome = list.remove_selected().await.unwrap();

        assert_eq!(outcome, BulkOutcome::Failed);
        assert_eq!(list.state().selection, BTreeSet::from([1, 3]));
        assert_eq!(list.state().rows.len(), 5);
        assert!(list.state().notice.as_ref().unwrap().is_error());
    }

    #[test]
    fn test_selection_ops() {
        let mut list = ListController::new(FakeStocks::default(), 0, PageSize::Ten);
        list.toggle(7);
        assert!(list.is_selected(7));
        list.toggle(7);
        assert!(!list.is_selected(7));
        list.select(1);
        list.select(2);
        list.deselect(1);
        assert_eq!(list.state().selection, BTreeSet::from([2]));
        list.clear_selection();
        assert!(list.state().selection.is_empty());
    }

    #[tokio::test]
    async fn test_derived_values() {
        let mut list = ListController::new(FakeStocks::with_total(23), 2, PageSize::Ten);
        list.refresh().await.unwrap();

        assert_eq!(list.row_number(0), 21);
        assert_eq!(list.showing_range(), (21, 23));
        assert_eq!(list.display_page(), 3);
        assert_eq!(list.display_total_pages(), 3);
        assert!(list.has_previous());
        assert!(!list.has_next());
    }

    #[test]
    fn test_row_rendering_uses_placeholders() {
        let stock = Stock {
            stock_id: 3,
            name: None,
            description: Some(" ".into()),
            current_price: Some(1_500_000_000.0),
            listing_date: None,
            updated_at: None,
        };
        assert_eq!(
            stock.cells(),
            vec!["Unnamed Stock", "No description available", "$1.50B", "N/A", "Never"]
        );
        assert_eq!(stock.cells().len(), Stock::COLUMNS.len());
        assert_eq!(stock.detail_href().unwrap(), "/dashboard/stocks/3");

        let exchange = StockExchange {
            stock_exchange_id: 8,
            name: Some("NYSE".into()),
            description: None,
            live_in_market: true,
        };
        assert_eq!(exchange.cells(), vec!["NYSE", "No description available", "Live"]);
        assert_eq!(exchange.actions()[0].action, "/dashboard/stock-exchanges/8/delete");
    }
}
