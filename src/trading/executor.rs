//! Order execution: turns queued trades into orders on our account.
//!
//! Each trade gets exactly one placement attempt. Limit orders are posted GTC
//! and cancelled if still resting after the configured timeout; market orders
//! are posted fill-or-kill for a fixed amount. Failures are logged and the
//! trade is dropped, never retried.

use std::panic::AssertUnwindSafe;

use anyhow::{Context, Result};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api::{LimitOrderArgs, MarketOrderArgs, OrderSide, OrderType, TradingApi};
use crate::models::{Order, OrderKind, Trade};

use crate::bot::panic_message;

use super::sizing::limit_order_size;
use super::{TradeQueue, TradingConfig};

/// What happened to a single execution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Limit order was still open after the timeout and got cancelled
    Cancelled { order_id: String },
    /// Limit order was no longer open after the timeout (filled or removed)
    Closed { order_id: String },
    /// Market order was accepted by the exchange
    Submitted {
        order_id: Option<String>,
        status: Option<String>,
    },
    /// The attempt failed; the trade is dropped
    Failed { reason: String },
}

/// Places orders for queued trades.
pub struct OrderExecutor<T> {
    api: T,
    config: TradingConfig,
}

impl<T: TradingApi> OrderExecutor<T> {
    pub fn new(api: T, config: TradingConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &TradingConfig {
        &self.config
    }

    /// Execute every trade currently queued, removing each once attempted.
    ///
    /// Stops between trades when `cancel` fires. Returns how many trades
    /// were attempted.
    pub async fn drain(&self, queue: &TradeQueue, cancel: &CancellationToken) -> usize {
        let trades = queue.snapshot().await;
        if trades.is_empty() {
            return 0;
        }

        info!(count = trades.len(), "Executing queued trades");

        let mut attempted = 0;
        for trade in trades {
            if cancel.is_cancelled() {
                break;
            }

            info!(asset = %trade.short_asset(), tx = %trade.short_hash(), "Processing trade");
            // A panicking attempt still counts as the trade's one attempt
            let outcome = AssertUnwindSafe(self.execute(&trade, cancel))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    let reason = format!("execution panicked: {}", panic_message(panic.as_ref()));
                    error!(
                        tx = %trade.transaction_hash,
                        wallet = %trade.wallet,
                        error = %reason,
                        "Order execution failed, trade dropped"
                    );
                    ExecutionOutcome::Failed { reason }
                });
            debug!(tx = %trade.short_hash(), outcome = ?outcome, "Execution finished");

            queue.remove(&trade).await;
            attempted += 1;
        }

        attempted
    }

    /// Run one placement cycle for `trade`. Never fails.
    pub async fn execute(&self, trade: &Trade, cancel: &CancellationToken) -> ExecutionOutcome {
        let result = match self.config.order_type {
            OrderKind::Limit => self.execute_limit(trade, cancel).await,
            OrderKind::Market => self.execute_market(trade).await,
        };

        result.unwrap_or_else(|e| {
            error!(
                kind = %self.config.order_type,
                tx = %trade.transaction_hash,
                wallet = %trade.wallet,
                error = %format!("{:#}", e),
                "Order execution failed, trade dropped"
            );
            ExecutionOutcome::Failed {
                reason: format!("{:#}", e),
            }
        })
    }

    async fn execute_limit(&self, trade: &Trade, cancel: &CancellationToken) -> Result<ExecutionOutcome> {
        let size = limit_order_size(trade, self.config.min_share_possible)?;
        let args = LimitOrderArgs {
            token_id: trade.asset.clone(),
            price: trade.price,
            size,
            side: OrderSide::from(trade.side),
        };

        info!(
            token = %trade.short_asset(),
            price = %args.price,
            size = %args.size,
            side = %trade.side,
            "Placing LIMIT order"
        );

        let signed = self.api.create_order(&args).await.context("Failed to build limit order")?;
        let resp = self
            .api
            .post_order(signed, OrderType::Gtc)
            .await
            .context("Failed to post limit order")?;
        let order_id = resp
            .order_id
            .filter(|id| !id.is_empty())
            .context("Limit order accepted without an order ID")?;

        let mut order = Order::limit(order_id, args.token_id, args.price, args.size, trade.side);
        let timeout = self.config.limit_order_timeout();

        info!(
            order_id = %order.order_id,
            order = %order,
            wait_secs = timeout.as_secs(),
            "Order placed, waiting before cancel check"
        );

        tokio::select! {
            _ = tokio::time::sleep(timeout) => {}
            _ = cancel.cancelled() => {
                warn!(order_id = %order.order_id, "Shutting down, checking order before timeout");
            }
        }

        let open_orders = self
            .api
            .get_open_orders()
            .await
            .context("Failed to list open orders")?;
        order.mark_queried();

        let Some(open) = open_orders.iter().find(|o| o.id == order.order_id) else {
            order.resolve(false);
            info!(order = %order, "Order no longer open");
            return Ok(ExecutionOutcome::Closed {
                order_id: order.order_id,
            });
        };

        info!(
            order_id = %order.order_id,
            status = %open.status,
            matched = %open.size_matched,
            original = %open.original_size,
            "Cancelling order"
        );
        self.api
            .cancel(&order.order_id)
            .await
            .with_context(|| format!("Failed to cancel order {}", order.order_id))?;
        order.resolve(true);
        debug!(order = %order, "Order cancelled");

        Ok(ExecutionOutcome::Cancelled {
            order_id: order.order_id,
        })
    }

    async fn execute_market(&self, trade: &Trade) -> Result<ExecutionOutcome> {
        let args = MarketOrderArgs {
            token_id: trade.asset.clone(),
            amount: self.config.market_order_fixed_amount,
            side: OrderSide::from(trade.side),
        };

        info!(
            token = %trade.short_asset(),
            amount = %args.amount,
            side = %trade.side,
            "Placing MARKET order"
        );

        let signed = self
            .api
            .create_market_order(&args)
            .await
            .context("Failed to build market order")?;
        let resp = self
            .api
            .post_order(signed, OrderType::Fok)
            .await
            .context("Failed to post market order")?;

        let mut order = Order::market(
            resp.order_id.clone().unwrap_or_default(),
            args.token_id,
            args.amount,
            trade.side,
        );
        order.resolve(false);

        info!(
            order = %order,
            status = resp.status.as_deref().unwrap_or("unknown"),
            tx_count = resp.transaction_hashes.len(),
            "Market order response"
        );

        Ok(ExecutionOutcome::Submitted {
            order_id: resp.order_id,
            status: resp.status,
        })
    }
}
