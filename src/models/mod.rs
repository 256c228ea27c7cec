//! Data models for observed trades and the orders that copy them.

mod order;
mod trade;

pub use order::{Order, OrderKind};
pub use trade::{ObservedTrade, Trade, TradeSide};
