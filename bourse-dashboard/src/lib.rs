//! Stock exchange dashboard library
//!
//! Server-rendered pages for browsing and editing stocks and stock
//! exchanges held by the REST backend. The binary entry point is in main.rs.

pub mod config;
pub mod format;
pub mod forms;
pub mod gate;
pub mod listing;
pub mod web;
