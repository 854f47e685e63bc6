//! HTTP API Module
//!
//! Provides a REST API for transition delivery and participant diagnostics.

mod http;

pub use http::{AppState, HttpServer};
