//! Collector library crate.
//!
//! This crate provides the building blocks of the Etherscan exporter:
//!
//! - strongly-typed domain types (`types`),
//! - startup configuration and its validation (`config`),
//! - the upstream API client (`client`),
//! - a coarse request rate governor (`governor`),
//! - the metric schema, snapshots and text exposition (`metrics`),
//! - and the per-scrape collection orchestrator (`orchestrator`).
//!
//! The `exporter` binary composes these pieces behind an HTTP `/metrics`
//! endpoint.

pub mod client;
pub mod config;
pub mod governor;
pub mod metrics;
pub mod orchestrator;
pub mod types;

// Re-export top-level configuration types.
pub use config::{
    ClientConfig, CollectorConfig, ConfigurationError, EnabledFacts, ExporterConfig,
    GovernorConfig, NetworkConfig,
};

// Re-export the upstream interface and the HTTP client.
pub use client::{ChainDataSource, EtherscanClient, UpstreamError};

// Re-export the governor and the orchestrator.
pub use governor::{Pause, RateGovernor, ThreadSleep};
pub use orchestrator::{Collector, Scrape};

// Re-export snapshot and exposition helpers.
pub use metrics::{CONTENT_TYPE, ExpositionError, MetricFamily, Snapshot, encode_text};

// Re-export domain types at the crate root for convenience.
pub use types::*;

/// Collector stack used by the exporter binary.
pub type DefaultCollector = Collector<EtherscanClient, ThreadSleep>;

/// Builds the production collector from a validated configuration.
pub fn build_collector(cfg: &ExporterConfig) -> Result<DefaultCollector, ConfigurationError> {
    cfg.validate()?;
    let client = EtherscanClient::new(cfg.api_key.clone(), &cfg.client)?;
    let governor = RateGovernor::new(cfg.governor.clone());
    Ok(Collector::new(cfg.collector.clone(), client, governor))
}
