//! Off-chain pool and reserve topology caches.
//!
//! Each cache holds an immutable snapshot behind an [`ArcSwap`]. Refreshes
//! build a complete new table and swap it in, so readers on the sampling
//! path never see a half-updated table and never wait on the network.

pub mod aave_v2;
pub mod balancer;
pub mod balancer_v2;
pub mod compound;
pub mod pair_cache;
pub mod subgraph;

pub use aave_v2::{AaveReserve, AaveV2ReservesCache};
pub use balancer::BalancerPoolsCache;
pub use balancer_v2::{build_swap_info_table, BalancerSwaps, BalancerV2SwapInfoCache, SwapInfoTable};
pub use compound::{CToken, CompoundCTokenCache};
pub use pair_cache::{PairCache, PairFetcher};
pub use subgraph::SubgraphClient;

use anyhow::Result;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::metrics;

/// What a cache does with its current snapshot when a refresh fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Drop to an empty table. For venues where a stale entry could build an
    /// invalid fill.
    Clear,
    /// Keep serving the previous table. For append-only listings.
    RetainStale,
}

/// Produces a complete replacement table for a [`RefreshingTable`].
#[async_trait]
pub trait TableFetcher: Send + Sync + 'static {
    type Table: Default + Send + Sync + 'static;

    /// Name used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn fetch(&self) -> Result<Self::Table>;

    fn entry_count(table: &Self::Table) -> usize;
}

/// A snapshot refreshed on a fixed interval by a background task.
///
/// The first refresh runs immediately when the task starts. Dropping the
/// table stops the task.
pub struct RefreshingTable<F: TableFetcher> {
    snapshot: Arc<ArcSwap<F::Table>>,
    task: Option<JoinHandle<()>>,
}

impl<F: TableFetcher> RefreshingTable<F> {
    /// Starts the refresh loop. Must be called within a Tokio runtime.
    pub fn spawn(fetcher: F, refresh_interval: Duration, policy: RefreshPolicy) -> Self {
        let snapshot = Arc::new(ArcSwap::from_pointee(F::Table::default()));
        let task_snapshot = snapshot.clone();
        let task = tokio::spawn(async move {
            let mut ticker = interval(refresh_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                refresh_once(&fetcher, &task_snapshot, policy).await;
            }
        });
        Self {
            snapshot,
            task: Some(task),
        }
    }

    /// A table that never refreshes.
    pub fn fixed(table: F::Table) -> Self {
        Self {
            snapshot: Arc::new(ArcSwap::from_pointee(table)),
            task: None,
        }
    }

    pub fn snapshot(&self) -> Arc<F::Table> {
        self.snapshot.load_full()
    }
}

impl<F: TableFetcher> Drop for RefreshingTable<F> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// One refresh cycle. Failures never escape; the snapshot is cleared or kept
/// according to `policy`.
pub async fn refresh_once<F: TableFetcher>(
    fetcher: &F,
    snapshot: &ArcSwap<F::Table>,
    policy: RefreshPolicy,
) {
    match fetcher.fetch().await {
        Ok(table) => {
            let count = F::entry_count(&table);
            snapshot.store(Arc::new(table));
            info!("{} cache refreshed with {} entries", fetcher.name(), count);
            metrics::record_cache_refresh(fetcher.name(), "success");
            metrics::set_cache_entries(fetcher.name(), count);
        }
        Err(e) => {
            metrics::record_cache_refresh(fetcher.name(), "failure");
            match policy {
                RefreshPolicy::Clear => {
                    warn!("{} cache refresh failed, clearing: {:#}", fetcher.name(), e);
                    snapshot.store(Arc::new(F::Table::default()));
                    metrics::set_cache_entries(fetcher.name(), 0);
                }
                RefreshPolicy::RetainStale => {
                    warn!(
                        "{} cache refresh failed, keeping previous snapshot: {:#}",
                        fetcher.name(),
                        e
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Succeeds on the first fetch, fails afterwards.
    struct FlakyFetcher {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TableFetcher for FlakyFetcher {
        type Table = HashMap<u8, u8>;

        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn fetch(&self) -> Result<Self::Table> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(HashMap::from([(1, 2)]))
            } else {
                Err(anyhow!("subgraph unavailable"))
            }
        }

        fn entry_count(table: &Self::Table) -> usize {
            table.len()
        }
    }

    async fn run_two_cycles(policy: RefreshPolicy) -> Arc<HashMap<u8, u8>> {
        let fetcher = FlakyFetcher {
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let snapshot = ArcSwap::from_pointee(HashMap::new());
        refresh_once(&fetcher, &snapshot, policy).await;
        assert_eq!(snapshot.load().get(&1), Some(&2));
        refresh_once(&fetcher, &snapshot, policy).await;
        snapshot.load_full()
    }

    #[tokio::test]
    async fn clear_policy_empties_on_failure() {
        assert!(run_two_cycles(RefreshPolicy::Clear).await.is_empty());
    }

    #[tokio::test]
    async fn retain_policy_keeps_previous_snapshot() {
        assert_eq!(run_two_cycles(RefreshPolicy::RetainStale).await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn first_refresh_is_eager_and_loop_keeps_ticking() {
        let calls = Arc::new(AtomicUsize::new(0));
        let table = RefreshingTable::spawn(
            FlakyFetcher { calls: calls.clone() },
            Duration::from_secs(1800),
            RefreshPolicy::RetainStale,
        );
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(table.snapshot().len(), 1);

        tokio::time::sleep(Duration::from_secs(1801)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(table.snapshot().len(), 1);
    }

    #[test]
    fn fixed_table_serves_its_contents() {
        let table: RefreshingTable<FlakyFetcher> = RefreshingTable::fixed(HashMap::from([(3, 4)]));
        assert_eq!(table.snapshot().get(&3), Some(&4));
    }
}
