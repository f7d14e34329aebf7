//! Per-network fetch plans.

use crate::config::{EnabledFacts, NetworkConfig};
use crate::types::{ClientType, Fact};

/// Returns `true` if `fact` can be collected for `network` at all.
///
/// Only `AccountBalance` depends on the network: it needs an address.
pub fn is_applicable(fact: Fact, network: &NetworkConfig) -> bool {
    match fact {
        Fact::AccountBalance => network.address.is_some(),
        _ => true,
    }
}

/// Facts to fetch for one network during one scrape, in collection order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NetworkPlan {
    facts: Vec<Fact>,
}

impl NetworkPlan {
    /// Enabled facts that are applicable to `network`.
    pub fn new(enabled: &EnabledFacts, network: &NetworkConfig) -> Self {
        Self {
            facts: enabled.iter().filter(|f| is_applicable(*f, network)).collect(),
        }
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    /// Number of facts in the plan. This is what the rate governor is fed.
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Number of upstream calls the plan issues; chain size costs one call
    /// per client.
    pub fn upstream_calls(&self) -> usize {
        self.facts
            .iter()
            .map(|f| match f {
                Fact::ChainSize => ClientType::ALL.len(),
                _ => 1,
            })
            .sum()
    }
}
