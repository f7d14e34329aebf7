//! Collection orchestrator.
//!
//! This module turns a [`crate::config::CollectorConfig`] into one
//! [`crate::metrics::Snapshot`] per scrape:
//!
//! - [`plan::NetworkPlan`] decides which facts apply to a network,
//! - [`engine::Collector`] walks networks in order, gates each burst through
//!   the [`crate::governor::RateGovernor`], calls the
//!   [`crate::client::ChainDataSource`] and records what succeeded.

pub mod engine;
pub mod plan;

pub use engine::{ChainSizeWindow, Collector};
pub use plan::{NetworkPlan, is_applicable};

use crate::metrics::Snapshot;

/// Something that can produce a fresh snapshot on demand.
///
/// The serving layer holds its collector behind `Arc<dyn Scrape>` so it
/// does not need to know the data source or pauser types.
pub trait Scrape: Send + Sync {
    fn scrape(&self) -> Snapshot;
}
