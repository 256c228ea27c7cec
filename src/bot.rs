//! Bot runner: schedules the three copier loops.
//!
//! - wallet loader: re-reads the wallets file
//! - trade checker: polls watched wallets and queues new trades
//! - trade executor: places orders for queued trades
//!
//! Each loop runs as its own task on a fixed interval. A failed or panicking
//! iteration is logged and followed by a short backoff; it never ends the
//! loop. Only the shutdown token stops them.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use futures::FutureExt;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api::{TradeFeed, TradingApi};
use crate::db::Database;
use crate::trading::{OrderExecutor, TradeDiscovery, TradeQueue, TradingConfig, DEFAULT_FETCH_LIMIT};
use crate::wallets::WalletRegistry;

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Newline-delimited list of wallets to copy
    pub wallets_path: PathBuf,

    /// Local file, no API rate limit involved
    pub wallet_reload_interval: Duration,

    /// Keeps the Data API /trades usage under its 200 req / 10 s limit
    pub discovery_interval: Duration,

    /// Keeps order placement well under the CLOB POST /order limit
    pub execution_interval: Duration,

    /// Pause after a failed iteration
    pub error_backoff: Duration,

    /// Trades fetched per wallet per discovery pass
    pub fetch_limit: u32,

    pub trading_config: TradingConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            wallets_path: PathBuf::from("wallets.txt"),
            wallet_reload_interval: Duration::from_secs(30),
            discovery_interval: Duration::from_secs(5),
            execution_interval: Duration::from_secs(2),
            error_backoff: Duration::from_secs(5),
            fetch_limit: DEFAULT_FETCH_LIMIT,
            trading_config: TradingConfig::default(),
        }
    }
}

/// Main bot runner.
pub struct Bot<F, T> {
    config: BotConfig,
    wallets: Arc<WalletRegistry>,
    queue: Arc<TradeQueue>,
    discovery: Arc<TradeDiscovery<F>>,
    executor: Arc<OrderExecutor<T>>,
}

impl<F, T> Bot<F, T>
where
    F: TradeFeed + 'static,
    T: TradingApi + 'static,
{
    /// Create a new bot instance.
    pub fn new(config: BotConfig, db: Database, feed: F, api: T) -> Self {
        let wallets = Arc::new(WalletRegistry::new(config.wallets_path.clone()));
        let queue = Arc::new(TradeQueue::new());
        let discovery = Arc::new(
            TradeDiscovery::new(feed, db, queue.clone()).with_fetch_limit(config.fetch_limit),
        );
        let executor = Arc::new(OrderExecutor::new(api, config.trading_config.clone()));

        Self {
            config,
            wallets,
            queue,
            discovery,
            executor,
        }
    }

    /// Pending trades, shared with the running loops.
    #[cfg(test)]
    pub fn queue(&self) -> Arc<TradeQueue> {
        self.queue.clone()
    }

    /// Run all loops until `shutdown` is cancelled.
    ///
    /// Returns once every loop has stopped.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        let trading = self.executor.config();
        info!(
            wallets_file = %self.wallets.path().display(),
            order_type = %trading.order_type,
            limit_timeout_secs = trading.limit_order_timeout_secs,
            market_amount = %trading.market_order_fixed_amount,
            min_share_possible = trading.min_share_possible,
            "Starting concurrent task loops"
        );

        // The first discovery pass needs a populated wallet set
        self.wallets.reload().await;

        // Already loaded above, so the first reload waits a full interval
        let wallets = self.wallets.clone();
        let wallet_loader = tokio::spawn(run_loop(
            "wallet_loader",
            self.config.wallet_reload_interval,
            self.config.wallet_reload_interval,
            self.config.error_backoff,
            shutdown.clone(),
            move || {
                let wallets = wallets.clone();
                async move {
                    wallets.reload().await;
                    Ok(())
                }
            },
        ));

        let wallets = self.wallets.clone();
        let discovery = self.discovery.clone();
        let token = shutdown.clone();
        let trade_checker = tokio::spawn(run_loop(
            "trade_checker",
            Duration::ZERO,
            self.config.discovery_interval,
            self.config.error_backoff,
            shutdown.clone(),
            move || {
                let wallets = wallets.clone();
                let discovery = discovery.clone();
                let token = token.clone();
                async move {
                    let snapshot = wallets.snapshot().await;
                    discovery.discover(&snapshot, &token).await?;
                    Ok(())
                }
            },
        ));

        let queue = self.queue.clone();
        let executor = self.executor.clone();
        let token = shutdown.clone();
        let trade_executor = tokio::spawn(run_loop(
            "trade_executor",
            Duration::ZERO,
            self.config.execution_interval,
            self.config.error_backoff,
            shutdown.clone(),
            move || {
                let queue = queue.clone();
                let executor = executor.clone();
                let token = token.clone();
                async move {
                    executor.drain(&queue, &token).await;
                    Ok(())
                }
            },
        ));

        info!(
            wallet_loader_secs = self.config.wallet_reload_interval.as_secs(),
            trade_checker_secs = self.config.discovery_interval.as_secs(),
            trade_executor_secs = self.config.execution_interval.as_secs(),
            "Launched 3 concurrent tasks"
        );

        for result in join_all([wallet_loader, trade_checker, trade_executor]).await {
            if let Err(e) = result {
                warn!(error = %e, "Task ended abnormally during shutdown");
            }
        }

        let pending = self.queue.len().await;
        if pending > 0 {
            warn!(pending = pending, "Shut down with trades still queued; they will not be copied");
        }
        info!("All tasks shut down");

        Ok(())
    }
}

/// Run `body` every `every` until `shutdown` fires, starting after `first`.
///
/// Errors and panics from an iteration are logged and followed by `backoff`
/// instead of the regular interval.
async fn run_loop<B, Fut>(
    name: &'static str,
    first: Duration,
    every: Duration,
    backoff: Duration,
    shutdown: CancellationToken,
    mut body: B,
) where
    B: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut pause = first;
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = sleep(pause) => {}
        }

        pause = match AssertUnwindSafe(body()).catch_unwind().await {
            Ok(Ok(())) => every,
            Ok(Err(e)) => {
                error!(task = name, error = %format!("{:#}", e), "Error in loop iteration");
                backoff
            }
            Err(panic) => {
                error!(task = name, panic = %panic_message(panic.as_ref()), "Loop iteration panicked");
                backoff
            }
        };
    }

    info!(task = name, "Loop cancelled");
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
