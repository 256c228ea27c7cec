//! Trading logic: trade discovery, the pending queue, sizing and execution.

mod config;
mod discovery;
mod executor;
mod queue;
mod sizing;

pub use config::TradingConfig;
pub use discovery::{TradeDiscovery, DEFAULT_FETCH_LIMIT};
pub use executor::OrderExecutor;
pub use queue::TradeQueue;
