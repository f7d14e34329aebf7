//! Text exposition of a [`Snapshot`].
//!
//! Each scrape builds a throwaway `prometheus-client` registry from the
//! snapshot and encodes it. Families without samples still produce their
//! `# HELP` / `# TYPE` lines.

use std::sync::atomic::AtomicU64;

use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use thiserror::Error;

use super::schema::Snapshot;

/// Content type of [`encode_text`] output.
pub const CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

type GaugeFamily = Family<Vec<(String, String)>, Gauge<f64, AtomicU64>>;

/// Failure to serialize a snapshot. Indicates a bug, not an upstream problem.
#[derive(Debug, Error)]
pub enum ExpositionError {
    #[error("failed to encode metrics: {0}")]
    Encode(#[from] std::fmt::Error),
}

/// Encodes every family of `snapshot` in the OpenMetrics text format.
pub fn encode_text(snapshot: &Snapshot) -> Result<String, ExpositionError> {
    let mut registry = Registry::default();

    for family in snapshot.families() {
        let gauges = GaugeFamily::default();
        for sample in family.samples() {
            let labels: Vec<(String, String)> = sample
                .labels
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect();
            gauges.get_or_create(&labels).set(sample.value);
        }
        registry.register(family.name(), family.help(), gauges);
    }

    let mut body = String::new();
    encode(&mut body, &registry)?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::schema::SCHEMA;
    use crate::types::Fact;

    #[test]
    fn empty_snapshot_still_describes_every_family() {
        let body = encode_text(&Snapshot::new()).expect("encode");

        for spec in SCHEMA.iter() {
            assert!(
                body.contains(&format!("# HELP {} ", spec.name)),
                "missing HELP for {}:\n{body}",
                spec.name
            );
            assert!(
                body.contains(&format!("# TYPE {} gauge", spec.name)),
                "missing TYPE for {}:\n{body}",
                spec.name
            );
        }
        assert!(!body.contains("{network="));
    }

    #[test]
    fn samples_are_rendered_with_their_labels() {
        let mut snapshot = Snapshot::new();
        snapshot.record(Fact::LatestBlock, vec!["mainnet".into()], 26.0);
        snapshot.record(
            Fact::ChainSize,
            vec!["kovan".into(), "geth".into(), "100".into()],
            500.0,
        );

        let body = encode_text(&snapshot).expect("encode");
        assert!(body.contains("etherscan_latest_block{network=\"mainnet\"} 26"));
        assert!(body.contains(
            "etherscan_chain_size_bytes{network=\"kovan\",client=\"geth\",block_num=\"100\"} 500"
        ));
    }
}
