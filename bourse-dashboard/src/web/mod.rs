//! HTTP surface of the dashboard: pages, forms and the `/api` pass-through.

pub mod error;
pub mod middleware;
pub mod proxy;
pub mod routes;
pub mod session;
pub mod templates;

pub use error::WebError;
pub use middleware::AppState;
pub use routes::app_router;
