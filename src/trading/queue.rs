//! Trades accepted for copying but not yet executed.

use tokio::sync::Mutex;

use crate::models::Trade;

/// Pending trades shared by the poller (appends) and the executor (removes).
///
/// Unordered; execution follows snapshot order. The executor works from a
/// [`TradeQueue::snapshot`] so the lock is never held across network calls.
#[derive(Default)]
pub struct TradeQueue {
    trades: Mutex<Vec<Trade>>,
}

impl TradeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn enqueue(&self, trade: Trade) {
        self.trades.lock().await.push(trade);
    }

    /// Copy of the pending trades.
    pub async fn snapshot(&self) -> Vec<Trade> {
        self.trades.lock().await.clone()
    }

    /// Remove one occurrence of `trade`. Returns whether it was present.
    pub async fn remove(&self, trade: &Trade) -> bool {
        let mut trades = self.trades.lock().await;
        match trades.iter().position(|t| t == trade) {
            Some(idx) => {
                trades.remove(idx);
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.trades.lock().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.trades.lock().await.is_empty()
    }
}
