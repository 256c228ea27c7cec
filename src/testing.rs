//! In-process fakes for the remote APIs, shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use rust_decimal_macros::dec;

use crate::api::{
    LimitOrderArgs, MarketOrderArgs, OpenOrder, OrderResponse, OrderType, SignedOrder, TradeFeed,
    TradingApi,
};
use crate::models::{ObservedTrade, Trade, TradeSide};

pub fn trade(hash: &str, wallet: &str) -> Trade {
    Trade {
        transaction_hash: hash.to_string(),
        wallet: wallet.to_string(),
        asset: format!("token-{}", hash),
        price: dec!(0.25),
        size: dec!(12),
        side: TradeSide::Buy,
    }
}

pub fn observed(hash: &str, wallet: &str) -> ObservedTrade {
    ObservedTrade::decoded(
        trade(hash, wallet),
        format!(r#"{{"transactionHash":"{}"}}"#, hash),
    )
}

/// A record with a hash that did not decode into a trade.
pub fn malformed(hash: &str) -> ObservedTrade {
    ObservedTrade::malformed(
        hash.to_string(),
        format!(r#"{{"transactionHash":"{}","price":"n/a"}}"#, hash),
    )
}

/// Trade feed serving canned responses per wallet.
#[derive(Default)]
pub struct FakeFeed {
    responses: Mutex<HashMap<String, Vec<ObservedTrade>>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `hashes` (newest first) for `wallet`.
    pub fn set_trades(&self, wallet: &str, hashes: &[&str]) {
        let trades = hashes.iter().map(|h| observed(h, wallet)).collect();
        self.set_records(wallet, trades);
    }

    pub fn set_records(&self, wallet: &str, records: Vec<ObservedTrade>) {
        self.responses.lock().unwrap().insert(wallet.to_string(), records);
    }

    pub fn fail(&self, wallet: &str) {
        self.failing.lock().unwrap().insert(wallet.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl TradeFeed for FakeFeed {
    async fn fetch_trades(&self, wallet: &str, limit: u32) -> Result<Vec<ObservedTrade>> {
        self.calls.lock().unwrap().push(wallet.to_string());

        if self.failing.lock().unwrap().contains(wallet) {
            return Err(anyhow!("connection reset fetching {}", wallet));
        }

        let trades = self
            .responses
            .lock()
            .unwrap()
            .get(wallet)
            .cloned()
            .unwrap_or_default();
        Ok(trades.into_iter().take(limit as usize).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    CreateOrder(LimitOrderArgs),
    CreateMarketOrder(MarketOrderArgs),
    PostOrder(OrderType),
    GetOpenOrders,
    Cancel(String),
}

/// Trading API that records every call.
pub struct FakeTradingApi {
    calls: Mutex<Vec<ApiCall>>,
    next_order_id: Mutex<u64>,
    /// Order ids reported open by `get_open_orders`; `None` means "every
    /// order we placed is still open"
    open_orders: Mutex<Option<Vec<String>>>,
    fail_post: bool,
    fail_cancel: bool,
    panic_on_open_orders: bool,
}

impl Default for FakeTradingApi {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_order_id: Mutex::new(0),
            open_orders: Mutex::new(None),
            fail_post: false,
            fail_cancel: false,
            panic_on_open_orders: false,
        }
    }
}

impl FakeTradingApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_post() -> Self {
        Self {
            fail_post: true,
            ..Self::default()
        }
    }

    pub fn failing_cancel() -> Self {
        Self {
            fail_cancel: true,
            ..Self::default()
        }
    }

    /// Panic while listing open orders, after the order was posted.
    pub fn panicking_open_orders() -> Self {
        Self {
            panic_on_open_orders: true,
            ..Self::default()
        }
    }

    /// Report no open orders, as if everything filled.
    pub fn all_filled(self) -> Self {
        *self.open_orders.lock().unwrap() = Some(Vec::new());
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::Cancel(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn placed_ids(&self) -> Vec<String> {
        let n = *self.next_order_id.lock().unwrap();
        (1..=n).map(|i| format!("order-{}", i)).collect()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl TradingApi for FakeTradingApi {
    async fn create_order(&self, args: &LimitOrderArgs) -> Result<SignedOrder> {
        self.record(ApiCall::CreateOrder(args.clone()));
        Ok(SignedOrder {
            token_id: args.token_id.clone(),
            ..Default::default()
        })
    }

    async fn create_market_order(&self, args: &MarketOrderArgs) -> Result<SignedOrder> {
        self.record(ApiCall::CreateMarketOrder(args.clone()));
        Ok(SignedOrder {
            token_id: args.token_id.clone(),
            ..Default::default()
        })
    }

    async fn post_order(&self, _order: SignedOrder, order_type: OrderType) -> Result<OrderResponse> {
        self.record(ApiCall::PostOrder(order_type));
        if self.fail_post {
            return Err(anyhow!("Order placement failed: 400 Bad Request - not enough balance"));
        }

        let mut next = self.next_order_id.lock().unwrap();
        *next += 1;
        Ok(OrderResponse {
            success: true,
            order_id: Some(format!("order-{}", *next)),
            status: Some("live".to_string()),
            ..Default::default()
        })
    }

    async fn get_open_orders(&self) -> Result<Vec<OpenOrder>> {
        self.record(ApiCall::GetOpenOrders);
        if self.panic_on_open_orders {
            panic!("order book state corrupted");
        }
        let ids = self
            .open_orders
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| self.placed_ids());

        Ok(ids
            .into_iter()
            .map(|id| OpenOrder {
                id,
                status: "LIVE".to_string(),
                ..Default::default()
            })
            .collect())
    }

    async fn cancel(&self, order_id: &str) -> Result<()> {
        self.record(ApiCall::Cancel(order_id.to_string()));
        if self.fail_cancel {
            return Err(anyhow!("Cancel failed: 500 Internal Server Error"));
        }
        Ok(())
    }
}
