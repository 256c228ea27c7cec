//! Trade discovery: polls watched wallets and queues their new trades.
//!
//! The first time a wallet is polled its current history is recorded as seen
//! without being copied. From then on, any trade whose transaction hash is not
//! yet in the store is recorded and queued for execution.

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::TradeFeed;
use crate::db::Database;
use crate::models::{ObservedTrade, Trade};

use super::TradeQueue;

/// Trades fetched per wallet per pass.
pub const DEFAULT_FETCH_LIMIT: u32 = 5;

/// Discovers new trades of watched wallets.
pub struct TradeDiscovery<F> {
    feed: F,
    db: Database,
    queue: Arc<TradeQueue>,
    fetch_limit: u32,
}

impl<F: TradeFeed> TradeDiscovery<F> {
    pub fn new(feed: F, db: Database, queue: Arc<TradeQueue>) -> Self {
        Self {
            feed,
            db,
            queue,
            fetch_limit: DEFAULT_FETCH_LIMIT,
        }
    }

    pub fn with_fetch_limit(mut self, limit: u32) -> Self {
        self.fetch_limit = limit.max(1);
        self
    }

    /// Poll every wallet once and return the trades that were queued.
    ///
    /// A wallet whose fetch fails is logged and skipped. A store failure
    /// aborts the pass; wallets committed before it keep their writes.
    pub async fn discover(&self, wallets: &[String], cancel: &CancellationToken) -> Result<Vec<Trade>> {
        debug!(wallets = wallets.len(), "Checking trades from wallets");

        let mut queued = Vec::new();

        for wallet in wallets {
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                fetched = self.feed.fetch_trades(wallet, self.fetch_limit) => fetched,
            };

            let observed = match fetched {
                Ok(observed) => observed,
                Err(e) => {
                    error!(wallet = %wallet, error = %e, "Error fetching trades");
                    continue;
                }
            };

            if observed.is_empty() {
                continue;
            }

            let fresh = self.record_wallet(wallet, &observed).await?;
            for trade in fresh {
                self.queue.enqueue(trade.clone()).await;
                queued.push(trade);
            }
        }

        if !queued.is_empty() {
            info!(count = queued.len(), "Queued new trades for copying");
        }

        Ok(queued)
    }

    /// Apply one wallet's observations in a single transaction.
    ///
    /// Returns the trades to copy; empty for a wallet seen for the first time.
    async fn record_wallet(&self, wallet: &str, observed: &[ObservedTrade]) -> Result<Vec<Trade>> {
        let mut pass = self.db.begin_pass().await?;
        let mut fresh = Vec::new();

        if !pass.is_watched(wallet).await? {
            info!(
                wallet = %wallet,
                trades = observed.len(),
                "New wallet detected, recording history without copying"
            );
            pass.mark_watched(wallet).await?;
            for o in observed {
                pass.mark_seen(&o.transaction_hash, wallet, &o.payload).await?;
            }
        } else {
            for o in observed {
                if pass.is_seen(&o.transaction_hash).await? {
                    continue;
                }

                pass.mark_seen(&o.transaction_hash, wallet, &o.payload).await?;

                let Some(trade) = &o.trade else {
                    warn!(
                        wallet = %wallet,
                        tx = %o.transaction_hash,
                        "New trade record is malformed, recorded without copying"
                    );
                    continue;
                };

                info!(
                    wallet = %wallet,
                    tx = %trade.short_hash(),
                    side = %trade.side,
                    price = %trade.price,
                    size = %trade.size,
                    notional = %trade.notional(),
                    "New trade found"
                );
                fresh.push(trade.clone());
            }
        }

        pass.commit().await?;
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{malformed, observed, FakeFeed};

    async fn setup() -> (TradeDiscovery<FakeFeed>, Database, Arc<TradeQueue>) {
        let db = Database::in_memory().await.unwrap();
        let queue = Arc::new(TradeQueue::new());
        let discovery = TradeDiscovery::new(FakeFeed::new(), db.clone(), queue.clone());
        (discovery, db, queue)
    }

    fn wallets(addrs: &[&str]) -> Vec<String> {
        addrs.iter().map(|a| a.to_string()).collect()
    }

    fn hashes(trades: &[Trade]) -> Vec<&str> {
        trades.iter().map(|t| t.transaction_hash.as_str()).collect()
    }

    #[tokio::test]
    async fn test_new_wallet_is_baselined_without_queueing() {
        let (discovery, db, queue) = setup().await;
        discovery.feed.set_trades("W1", &["T2", "T1"]);

        let queued = discovery.discover(&wallets(&["W1"]), &CancellationToken::new()).await.unwrap();

        assert!(queued.is_empty());
        assert!(queue.is_empty().await);
        assert!(db.is_watched("W1").await.unwrap());
        assert!(db.is_seen("T1").await.unwrap());
        assert!(db.is_seen("T2").await.unwrap());
    }

    #[tokio::test]
    async fn test_only_unseen_trades_of_watched_wallet_are_queued() {
        let (discovery, db, queue) = setup().await;
        let token = CancellationToken::new();

        discovery.feed.set_trades("W1", &["T2", "T1"]);
        discovery.discover(&wallets(&["W1"]), &token).await.unwrap();

        discovery.feed.set_trades("W1", &["T3", "T2", "T1"]);
        let queued = discovery.discover(&wallets(&["W1"]), &token).await.unwrap();

        assert_eq!(hashes(&queued), vec!["T3"]);
        assert_eq!(hashes(&queue.snapshot().await), vec!["T3"]);
        assert!(db.is_seen("T3").await.unwrap());
        assert_eq!(db.seen_trade_count("W1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_repeated_discovery_queues_once() {
        let (discovery, db, queue) = setup().await;
        let token = CancellationToken::new();

        db.mark_watched("W1").await.unwrap();
        discovery.feed.set_trades("W1", &["T1"]);

        let first = discovery.discover(&wallets(&["W1"]), &token).await.unwrap();
        let second = discovery.discover(&wallets(&["W1"]), &token).await.unwrap();

        assert_eq!(hashes(&first), vec!["T1"]);
        assert!(second.is_empty());
        assert_eq!(queue.len().await, 1);
        assert_eq!(db.seen_trade_count("W1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_hash_within_one_response_is_queued_once() {
        let (discovery, _db, queue) = setup().await;
        discovery.db.mark_watched("W1").await.unwrap();
        discovery.feed.set_trades("W1", &["T1", "T1"]);

        discovery.discover(&wallets(&["W1"]), &CancellationToken::new()).await.unwrap();

        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn test_failing_wallet_does_not_block_the_others() {
        let (discovery, db, queue) = setup().await;
        let token = CancellationToken::new();

        for w in ["W1", "W2", "W3"] {
            db.mark_watched(w).await.unwrap();
        }
        discovery.feed.set_trades("W1", &["A1"]);
        discovery.feed.set_trades("W2", &["B1"]);
        discovery.feed.set_trades("W3", &["C1"]);
        discovery.feed.fail("W2");

        let queued = discovery.discover(&wallets(&["W1", "W2", "W3"]), &token).await.unwrap();

        assert_eq!(hashes(&queued), vec!["A1", "C1"]);
        assert_eq!(queue.len().await, 2);
        assert!(!db.is_seen("B1").await.unwrap());
        assert_eq!(discovery.feed.calls(), vec!["W1", "W2", "W3"]);
    }

    #[tokio::test]
    async fn test_trade_seen_on_another_wallet_is_not_requeued() {
        let (discovery, db, queue) = setup().await;
        db.mark_watched("W2").await.unwrap();
        db.mark_seen("T1", "W1", "{}").await.unwrap();
        discovery.feed.set_trades("W2", &["T1"]);

        discovery.discover(&wallets(&["W2"]), &CancellationToken::new()).await.unwrap();

        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_malformed_record_is_recorded_once_and_not_queued() {
        let (discovery, db, queue) = setup().await;
        let token = CancellationToken::new();
        db.mark_watched("W1").await.unwrap();
        discovery
            .feed
            .set_records("W1", vec![malformed("T2"), observed("T1", "W1")]);

        let first = discovery.discover(&wallets(&["W1"]), &token).await.unwrap();
        assert_eq!(hashes(&first), vec!["T1"]);
        assert!(db.is_seen("T2").await.unwrap());
        assert!(db.get_seen_trade("T2").await.unwrap().unwrap().data.contains("n/a"));

        let second = discovery.discover(&wallets(&["W1"]), &token).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn test_baseline_includes_malformed_records() {
        let (discovery, db, queue) = setup().await;
        discovery.feed.set_records("W1", vec![malformed("T1")]);

        discovery.discover(&wallets(&["W1"]), &CancellationToken::new()).await.unwrap();

        assert!(db.is_watched("W1").await.unwrap());
        assert!(db.is_seen("T1").await.unwrap());
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_history_does_not_baseline() {
        let (discovery, db, _queue) = setup().await;
        discovery.feed.set_trades("W1", &[]);

        discovery.discover(&wallets(&["W1"]), &CancellationToken::new()).await.unwrap();

        assert!(!db.is_watched("W1").await.unwrap());
    }

    #[tokio::test]
    async fn test_fetch_limit_bounds_the_page() {
        let (discovery, db, _queue) = setup().await;
        let discovery = discovery.with_fetch_limit(2);
        discovery.feed.set_trades("W1", &["T4", "T3", "T2", "T1"]);

        discovery.discover(&wallets(&["W1"]), &CancellationToken::new()).await.unwrap();

        assert!(db.is_seen("T4").await.unwrap());
        assert!(db.is_seen("T3").await.unwrap());
        assert!(!db.is_seen("T2").await.unwrap());
    }

    #[tokio::test]
    async fn test_cancelled_pass_stops_before_fetching() {
        let (discovery, _db, _queue) = setup().await;
        let token = CancellationToken::new();
        token.cancel();

        let queued = discovery.discover(&wallets(&["W1", "W2"]), &token).await.unwrap();

        assert!(queued.is_empty());
        assert!(discovery.feed.calls().is_empty());
    }
}
