//! Metric schema registry and per-scrape snapshot.
//!
//! [`SCHEMA`] is the static catalog mapping each [`Fact`] to one gauge
//! family: name, help text and label names. [`Snapshot::new`] turns the
//! catalog into a fresh set of empty families; the orchestrator fills it in
//! during one scrape and the exposition layer encodes it afterwards.
//!
//! Every family is present in every snapshot, whether or not its fact is
//! enabled, so metric names stay stable for consumers.

use std::collections::BTreeMap;

use crate::types::Fact;

/// Static description of one metric family.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FamilySpec {
    fact: Fact,
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
}

/// One entry per [`Fact`], in [`Fact::ALL`] order.
pub const SCHEMA: [FamilySpec; 6] = [
    FamilySpec {
        fact: Fact::LatestBlock,
        name: "etherscan_latest_block",
        help: "Number of the most recent block",
        labels: &["network"],
    },
    FamilySpec {
        fact: Fact::GasPrice,
        name: "etherscan_gas_price_wei",
        help: "Current gas price in wei",
        labels: &["network"],
    },
    FamilySpec {
        fact: Fact::AccountBalance,
        name: "etherscan_account_balance_wei",
        help: "Balance of a tracked account in wei",
        labels: &["network", "address"],
    },
    FamilySpec {
        fact: Fact::EtherSupply,
        name: "etherscan_ether_supply_wei",
        help: "Total supply of ether in wei",
        labels: &["network"],
    },
    FamilySpec {
        fact: Fact::LastPrice,
        name: "etherscan_last_price",
        help: "Last ether price against BTC and USD",
        labels: &["network", "pair"],
    },
    FamilySpec {
        fact: Fact::ChainSize,
        name: "etherscan_chain_size_bytes",
        help: "Size of a fully synced chain in bytes, per client",
        labels: &["network", "client", "block_num"],
    },
];

impl Fact {
    fn index(self) -> usize {
        self as usize
    }

    /// Schema entry of the family this fact is recorded in.
    pub fn spec(self) -> &'static FamilySpec {
        let spec = &SCHEMA[self.index()];
        debug_assert_eq!(spec.fact, self, "SCHEMA is out of Fact::ALL order");
        spec
    }
}

/// One labeled observation.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample<'a> {
    /// `(label name, label value)` pairs in schema order.
    pub labels: Vec<(&'static str, &'a str)>,
    pub value: f64,
}

/// One gauge family and the samples written to it during a scrape.
///
/// Samples are keyed by their label values, so writing the same label tuple
/// twice overwrites rather than appends.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricFamily {
    spec: &'static FamilySpec,
    samples: BTreeMap<Vec<String>, f64>,
}

impl MetricFamily {
    fn new(spec: &'static FamilySpec) -> Self {
        Self {
            spec,
            samples: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn help(&self) -> &'static str {
        self.spec.help
    }

    pub fn label_names(&self) -> &'static [&'static str] {
        self.spec.labels
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Value recorded for the given label values (schema order), if any.
    pub fn get(&self, label_values: &[&str]) -> Option<f64> {
        let key: Vec<String> = label_values.iter().map(|v| v.to_string()).collect();
        self.samples.get(&key).copied()
    }

    /// Samples ordered by label values.
    pub fn samples(&self) -> impl Iterator<Item = Sample<'_>> + '_ {
        self.samples.iter().map(|(values, value)| Sample {
            labels: self
                .spec
                .labels
                .iter()
                .copied()
                .zip(values.iter().map(String::as_str))
                .collect(),
            value: *value,
        })
    }

    fn set(&mut self, label_values: Vec<String>, value: f64) {
        debug_assert_eq!(
            label_values.len(),
            self.spec.labels.len(),
            "label arity mismatch for {}",
            self.spec.name
        );
        self.samples.insert(label_values, value);
    }
}

/// Complete set of metric families produced by one scrape.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    families: Vec<MetricFamily>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl Snapshot {
    /// Fresh snapshot with one empty family per schema entry.
    pub fn new() -> Self {
        Self {
            families: SCHEMA.iter().map(MetricFamily::new).collect(),
        }
    }

    /// Family the given fact is recorded in.
    pub fn family(&self, fact: Fact) -> &MetricFamily {
        &self.families[fact.index()]
    }

    pub fn family_by_name(&self, name: &str) -> Option<&MetricFamily> {
        self.families.iter().find(|f| f.name() == name)
    }

    /// Families in schema order.
    pub fn families(&self) -> impl Iterator<Item = &MetricFamily> + '_ {
        self.families.iter()
    }

    /// Total number of samples across all families.
    pub fn sample_count(&self) -> usize {
        self.families.iter().map(MetricFamily::len).sum()
    }

    /// Writes one sample into the family of `fact`, overwriting any sample
    /// with the same label values.
    pub fn record(&mut self, fact: Fact, label_values: Vec<String>, value: f64) {
        self.families[fact.index()].set(label_values, value);
    }
}
