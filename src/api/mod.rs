//! Polymarket API clients and the capabilities the copier needs from them.

mod auth;
mod clob_client;
mod data_client;
mod types;

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;

use crate::models::ObservedTrade;

pub use auth::ApiCreds;
pub use clob_client::{
    ClobClient, ClobSettings, LimitOrderArgs, MarketOrderArgs, OpenOrder, OrderResponse,
    OrderSide, OrderType, SignatureType, SignedOrder, CLOB_URL, POLYGON_CHAIN_ID,
};
pub use data_client::{DataClient, DATA_API_BASE};

/// Read access to a wallet's recent trade history.
pub trait TradeFeed: Send + Sync {
    /// Newest-first page of at most `limit` trades made by `wallet`.
    fn fetch_trades(
        &self,
        wallet: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<ObservedTrade>>> + Send;
}

/// Order placement on our own account.
///
/// Signing and authentication are the implementor's business.
pub trait TradingApi: Send + Sync {
    fn create_order(&self, args: &LimitOrderArgs) -> impl Future<Output = Result<SignedOrder>> + Send;

    fn create_market_order(
        &self,
        args: &MarketOrderArgs,
    ) -> impl Future<Output = Result<SignedOrder>> + Send;

    fn post_order(
        &self,
        order: SignedOrder,
        order_type: OrderType,
    ) -> impl Future<Output = Result<OrderResponse>> + Send;

    fn get_open_orders(&self) -> impl Future<Output = Result<Vec<OpenOrder>>> + Send;

    fn cancel(&self, order_id: &str) -> impl Future<Output = Result<()>> + Send;
}

impl<F: TradeFeed> TradeFeed for Arc<F> {
    fn fetch_trades(
        &self,
        wallet: &str,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<ObservedTrade>>> + Send {
        (**self).fetch_trades(wallet, limit)
    }
}

impl<T: TradingApi> TradingApi for Arc<T> {
    fn create_order(&self, args: &LimitOrderArgs) -> impl Future<Output = Result<SignedOrder>> + Send {
        (**self).create_order(args)
    }

    fn create_market_order(
        &self,
        args: &MarketOrderArgs,
    ) -> impl Future<Output = Result<SignedOrder>> + Send {
        (**self).create_market_order(args)
    }

    fn post_order(
        &self,
        order: SignedOrder,
        order_type: OrderType,
    ) -> impl Future<Output = Result<OrderResponse>> + Send {
        (**self).post_order(order, order_type)
    }

    fn get_open_orders(&self) -> impl Future<Output = Result<Vec<OpenOrder>>> + Send {
        (**self).get_open_orders()
    }

    fn cancel(&self, order_id: &str) -> impl Future<Output = Result<()>> + Send {
        (**self).cancel(order_id)
    }
}
