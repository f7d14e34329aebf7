//! Scrape engine.
//!
//! One call to [`Collector::collect`] is one stateless pass over
//! `networks × enabled facts`:
//!
//! 1. Build an empty [`Snapshot`] from the schema.
//! 2. For each network, in configured order:
//!    - plan the enabled, applicable facts,
//!    - pause first if the plan is larger than the rate ceiling,
//!    - fetch each fact, recording successes and skipping failures,
//!    - pause once more before the next network.
//! 3. Return the snapshot.
//!
//! Upstream failures never abort the pass; they only leave the affected
//! sample out of the snapshot.

use std::slice;
use std::time::Instant;

use chrono::{NaiveDate, Utc};

use super::Scrape;
use super::plan::NetworkPlan;
use crate::client::{ChainDataSource, UpstreamError};
use crate::config::{CollectorConfig, NetworkConfig};
use crate::governor::{Pause, RateGovernor, ThreadSleep};
use crate::metrics::Snapshot;
use crate::types::{ClientType, Fact, Network};

/// Date range chain size statistics are requested for: yesterday through
/// today, relative to the start of the scrape.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChainSizeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ChainSizeWindow {
    pub fn ending(today: NaiveDate) -> Self {
        Self {
            start: today.pred_opt().unwrap_or(today),
            end: today,
        }
    }
}

/// Orchestrates one scrape across all configured networks.
///
/// Generic over:
///
/// - `S`: the upstream data source implementing [`ChainDataSource`],
/// - `P`: the pause implementation used by the [`RateGovernor`].
pub struct Collector<S, P = ThreadSleep> {
    config: CollectorConfig,
    source: S,
    governor: RateGovernor<P>,
}

impl<S, P> Collector<S, P>
where
    S: ChainDataSource,
    P: Pause,
{
    pub fn new(config: CollectorConfig, source: S, governor: RateGovernor<P>) -> Self {
        Self {
            config,
            source,
            governor,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn governor(&self) -> &RateGovernor<P> {
        &self.governor
    }

    /// Runs one scrape using today's UTC date for the chain size window.
    pub fn collect(&self) -> Snapshot {
        self.collect_at(Utc::now().date_naive())
    }

    /// Runs one scrape with an explicit collection date.
    pub fn collect_at(&self, today: NaiveDate) -> Snapshot {
        let started = Instant::now();
        let window = ChainSizeWindow::ending(today);
        let mut snapshot = Snapshot::new();
        let mut failures = 0usize;

        for entry in &self.config.networks {
            let plan = NetworkPlan::new(&self.config.facts, entry);
            tracing::debug!(
                network = %entry.network,
                facts = plan.len(),
                upstream_calls = plan.upstream_calls(),
                "collecting network"
            );

            self.governor.throttle(plan.len());

            for fact in plan.facts() {
                failures += self.collect_fact(&mut snapshot, entry, *fact, window);
            }

            self.governor.space();
        }

        tracing::info!(
            networks = self.config.networks.len(),
            samples = snapshot.sample_count(),
            failures,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scrape complete"
        );

        snapshot
    }

    /// Fetches one fact for one network. Returns the number of failed
    /// upstream calls.
    fn collect_fact(
        &self,
        snapshot: &mut Snapshot,
        entry: &NetworkConfig,
        fact: Fact,
        window: ChainSizeWindow,
    ) -> usize {
        let network = entry.network;
        let net = network.as_str().to_string();

        match fact {
            Fact::LatestBlock => {
                let Some(height) = ok_or_warn(network, fact, self.source.latest_block_number(network))
                else {
                    return 1;
                };
                snapshot.record(fact, vec![net], height as f64);
            }
            Fact::GasPrice => {
                let Some(wei) = ok_or_warn(network, fact, self.source.gas_price(network)) else {
                    return 1;
                };
                snapshot.record(fact, vec![net], wei as f64);
            }
            Fact::AccountBalance => {
                let Some(address) = &entry.address else {
                    return 0;
                };
                let result = self
                    .source
                    .account_balances(network, slice::from_ref(address));
                let Some(balances) = ok_or_warn(network, fact, result) else {
                    return 1;
                };
                for (account, wei) in balances {
                    snapshot.record(fact, vec![net.clone(), account.to_string()], wei as f64);
                }
            }
            Fact::EtherSupply => {
                let Some(wei) = ok_or_warn(network, fact, self.source.ether_supply(network)) else {
                    return 1;
                };
                snapshot.record(fact, vec![net], wei as f64);
            }
            Fact::LastPrice => {
                let Some(price) = ok_or_warn(network, fact, self.source.last_price(network)) else {
                    return 1;
                };
                snapshot.record(fact, vec![net.clone(), "ethbtc".to_string()], price.ethbtc);
                snapshot.record(fact, vec![net, "ethusd".to_string()], price.ethusd);
            }
            Fact::ChainSize => {
                let mut failed = 0;
                for client in ClientType::ALL {
                    let result = self
                        .source
                        .chain_size(network, client, window.start, window.end);
                    let Some(points) = ok_or_warn(network, fact, result) else {
                        failed += 1;
                        continue;
                    };
                    match points.first() {
                        Some(latest) => {
                            let labels = vec![
                                net.clone(),
                                client.as_str().to_string(),
                                latest.block_number.to_string(),
                            ];
                            snapshot.record(fact, labels, latest.chain_size as f64);
                        }
                        None => {
                            tracing::debug!(%network, %client, "no chain size data in window");
                        }
                    }
                }
                return failed;
            }
        }

        0
    }
}

fn ok_or_warn<T>(network: Network, fact: Fact, result: Result<T, UpstreamError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(%network, %fact, error = %e, "upstream fetch failed, skipping sample");
            None
        }
    }
}

impl<S, P> Scrape for Collector<S, P>
where
    S: ChainDataSource,
    P: Pause,
{
    fn scrape(&self) -> Snapshot {
        self.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::config::{EnabledFacts, GovernorConfig};
    use crate::types::{Address, ChainSizePoint, EthPrice};

    /// Deterministic data source. Fails for the configured pairs and records
    /// which calls were made.
    #[derive(Default)]
    struct StubSource {
        failing: HashSet<(Network, Fact)>,
        geth_points: Vec<ChainSizePoint>,
        parity_points: Vec<ChainSizePoint>,
        calls: Mutex<Vec<(Network, Fact)>>,
        windows: Mutex<Vec<(NaiveDate, NaiveDate)>>,
    }

    impl StubSource {
        fn failing(pairs: &[(Network, Fact)]) -> Self {
            Self {
                failing: pairs.iter().copied().collect(),
                ..Self::default()
            }
        }

        fn check(&self, network: Network, fact: Fact) -> Result<(), UpstreamError> {
            self.calls.lock().unwrap().push((network, fact));
            if self.failing.contains(&(network, fact)) {
                Err(UpstreamError::Api("stubbed failure".to_string()))
            } else {
                Ok(())
            }
        }

        fn calls_for(&self, fact: Fact) -> Vec<Network> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, f)| *f == fact)
                .map(|(n, _)| *n)
                .collect()
        }
    }

    impl ChainDataSource for StubSource {
        fn latest_block_number(&self, network: Network) -> Result<u64, UpstreamError> {
            self.check(network, Fact::LatestBlock)?;
            Ok(26)
        }

        fn gas_price(&self, network: Network) -> Result<u128, UpstreamError> {
            self.check(network, Fact::GasPrice)?;
            Ok(20_000_000_000)
        }

        fn account_balances(
            &self,
            network: Network,
            addresses: &[Address],
        ) -> Result<BTreeMap<Address, u128>, UpstreamError> {
            self.check(network, Fact::AccountBalance)?;
            Ok(addresses.iter().map(|a| (a.clone(), 1_000)).collect())
        }

        fn ether_supply(&self, network: Network) -> Result<u128, UpstreamError> {
            self.check(network, Fact::EtherSupply)?;
            Ok(120_000_000)
        }

        fn last_price(&self, network: Network) -> Result<EthPrice, UpstreamError> {
            self.check(network, Fact::LastPrice)?;
            Ok(EthPrice {
                ethbtc: 0.05,
                ethusd: 2000.5,
            })
        }

        fn chain_size(
            &self,
            network: Network,
            client: ClientType,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<ChainSizePoint>, UpstreamError> {
            self.check(network, Fact::ChainSize)?;
            self.windows.lock().unwrap().push((start, end));
            Ok(match client {
                ClientType::Geth => self.geth_points.clone(),
                ClientType::Parity => self.parity_points.clone(),
            })
        }
    }

    #[derive(Default)]
    struct CountingPause {
        count: AtomicUsize,
    }

    impl Pause for CountingPause {
        fn pause(&self, _duration: std::time::Duration) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn address() -> Address {
        "0xde0b295669a9fd93d5f28d9ec85e40f4cb697bae".parse().unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn collector(
        facts: EnabledFacts,
        networks: Vec<NetworkConfig>,
        source: StubSource,
    ) -> Collector<StubSource, CountingPause> {
        let governor = RateGovernor::with_pauser(GovernorConfig::default(), CountingPause::default());
        Collector::new(CollectorConfig { facts, networks }, source, governor)
    }

    fn pauses(c: &Collector<StubSource, CountingPause>) -> usize {
        c.governor().pauser().count.load(Ordering::SeqCst)
    }

    #[test]
    fn no_enabled_facts_yields_all_families_empty() {
        let c = collector(
            EnabledFacts::none(),
            vec![
                NetworkConfig::new(Network::Mainnet).with_address(address()),
                NetworkConfig::new(Network::Kovan),
            ],
            StubSource::default(),
        );

        let snapshot = c.collect_at(today());

        assert_eq!(snapshot, Snapshot::new());
        assert!(snapshot.families().all(|f| f.is_empty()));
        assert!(c.source().calls.lock().unwrap().is_empty());
        // Only the inter-network spacing.
        assert_eq!(pauses(&c), 2);
    }

    #[test]
    fn balance_is_only_collected_where_an_address_is_configured() {
        let c = collector(
            EnabledFacts::all(),
            vec![
                NetworkConfig::new(Network::Mainnet).with_address(address()),
                NetworkConfig::new(Network::Ropsten),
            ],
            StubSource::default(),
        );

        let snapshot = c.collect_at(today());

        let balances = snapshot.family(Fact::AccountBalance);
        assert_eq!(balances.len(), 1);
        assert_eq!(balances.get(&["mainnet", address().as_str()]), Some(1_000.0));
        assert_eq!(c.source().calls_for(Fact::AccountBalance), vec![Network::Mainnet]);

        // Other facts still ran for the network without an address.
        assert_eq!(snapshot.family(Fact::LatestBlock).get(&["ropsten"]), Some(26.0));
        assert_eq!(snapshot.family(Fact::GasPrice).get(&["ropsten"]), Some(2e10));
    }

    #[test]
    fn one_failing_pair_only_drops_that_sample() {
        let c = collector(
            EnabledFacts::all(),
            vec![
                NetworkConfig::new(Network::Mainnet).with_address(address()),
                NetworkConfig::new(Network::Goerli).with_address(address()),
            ],
            StubSource::failing(&[(Network::Goerli, Fact::GasPrice)]),
        );

        let snapshot = c.collect_at(today());

        let gas = snapshot.family(Fact::GasPrice);
        assert_eq!(gas.get(&["mainnet"]), Some(2e10));
        assert_eq!(gas.get(&["goerli"]), None);

        for network in ["mainnet", "goerli"] {
            assert_eq!(snapshot.family(Fact::LatestBlock).get(&[network]), Some(26.0));
            assert_eq!(snapshot.family(Fact::EtherSupply).get(&[network]), Some(1.2e8));
            assert_eq!(
                snapshot.family(Fact::AccountBalance).get(&[network, address().as_str()]),
                Some(1_000.0)
            );
            assert_eq!(snapshot.family(Fact::LastPrice).get(&[network, "ethbtc"]), Some(0.05));
            assert_eq!(snapshot.family(Fact::LastPrice).get(&[network, "ethusd"]), Some(2000.5));
        }
    }

    #[test]
    fn every_fact_failing_still_returns_the_full_schema() {
        let failing: Vec<(Network, Fact)> = Fact::ALL.iter().map(|f| (Network::Mainnet, *f)).collect();
        let c = collector(
            EnabledFacts::all(),
            vec![NetworkConfig::new(Network::Mainnet).with_address(address())],
            StubSource::failing(&failing),
        );

        let snapshot = c.collect_at(today());

        assert_eq!(snapshot.sample_count(), 0);
        assert_eq!(snapshot.families().count(), Fact::ALL.len());
    }

    #[test]
    fn empty_chain_size_yields_no_sample() {
        let c = collector(
            EnabledFacts {
                chain_size: true,
                ..EnabledFacts::none()
            },
            vec![NetworkConfig::new(Network::Mainnet)],
            StubSource::default(),
        );

        let snapshot = c.collect_at(today());

        assert!(snapshot.family(Fact::ChainSize).is_empty());
        // Both clients were still asked.
        assert_eq!(c.source().calls_for(Fact::ChainSize).len(), 2);
    }

    #[test]
    fn chain_size_keeps_only_the_most_recent_point() {
        let source = StubSource {
            geth_points: vec![
                ChainSizePoint {
                    block_number: 100,
                    chain_size: 500,
                },
                ChainSizePoint {
                    block_number: 90,
                    chain_size: 450,
                },
            ],
            ..StubSource::default()
        };
        let c = collector(
            EnabledFacts {
                chain_size: true,
                ..EnabledFacts::none()
            },
            vec![NetworkConfig::new(Network::Mainnet)],
            source,
        );

        let snapshot = c.collect_at(today());

        let family = snapshot.family(Fact::ChainSize);
        assert_eq!(family.len(), 1);
        assert_eq!(family.get(&["mainnet", "geth", "100"]), Some(500.0));
    }

    #[test]
    fn chain_size_window_is_yesterday_through_today() {
        let c = collector(
            EnabledFacts {
                chain_size: true,
                ..EnabledFacts::none()
            },
            vec![NetworkConfig::new(Network::Mainnet)],
            StubSource::default(),
        );

        c.collect_at(today());

        let expected = (NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(), today());
        assert_eq!(*c.source().windows.lock().unwrap(), vec![expected, expected]);
    }

    #[test]
    fn large_plans_pause_before_each_network() {
        let c = collector(
            EnabledFacts::all(),
            vec![
                NetworkConfig::new(Network::Mainnet).with_address(address()),
                NetworkConfig::new(Network::Rinkeby).with_address(address()),
            ],
            StubSource::default(),
        );

        c.collect_at(today());

        // One throttle pause plus one spacing pause per network.
        assert_eq!(pauses(&c), 4);
    }

    #[test]
    fn small_plans_only_pause_between_networks() {
        let c = collector(
            EnabledFacts::all(),
            vec![NetworkConfig::new(Network::Mainnet)],
            StubSource::default(),
        );

        c.collect_at(today());

        // Five applicable facts do not exceed the ceiling.
        assert_eq!(pauses(&c), 1);
    }

    #[test]
    fn repeated_collection_is_identical() {
        let c = collector(
            EnabledFacts::all(),
            vec![
                NetworkConfig::new(Network::Mainnet).with_address(address()),
                NetworkConfig::new(Network::Kovan),
            ],
            StubSource {
                geth_points: vec![ChainSizePoint {
                    block_number: 7,
                    chain_size: 70,
                }],
                ..StubSource::failing(&[(Network::Kovan, Fact::EtherSupply)])
            },
        );

        let first = c.collect_at(today());
        let second = c.collect_at(today());
        assert_eq!(first, second);
        assert!(first.sample_count() > 0);
    }

    #[test]
    fn chain_size_window_handles_the_earliest_date() {
        let window = ChainSizeWindow::ending(NaiveDate::MIN);
        assert_eq!(window.start, NaiveDate::MIN);
        assert_eq!(window.end, NaiveDate::MIN);
    }
}
