//! HTTP surface of the Etherscan exporter.
//!
//! The binary in `main.rs` parses the command line, builds the collector and
//! serves the router returned by [`create_router`].

pub mod config;
pub mod routes;
pub mod state;

use axum::{Router, routing::get};

use crate::routes::{health, metrics};
use crate::state::SharedState;

/// Builds the exporter router: `/metrics` and `/health`.
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/metrics", get(metrics::metrics))
        .route("/health", get(health::health))
        .with_state(state)
}
