//! Orders placed on our own account to mirror a source trade.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TradeSide;

/// How copied trades are submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    /// GTC limit order at the source price, cancelled after a timeout
    Limit,
    /// Fill-or-kill order for a fixed USDC amount
    Market,
}

impl OrderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Limit => "limit",
            OrderKind::Market => "market",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "limit" => Ok(OrderKind::Limit),
            "market" => Ok(OrderKind::Market),
            other => anyhow::bail!("unknown order type '{}'", other),
        }
    }
}

/// Lifecycle of an order we placed.
///
/// Limit orders go `Placed -> Queried -> Cancelled | Done`.
/// Market orders go straight from `Placed` to `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Placed,
    Queried,
    Cancelled,
    Done,
}

/// An order placed for a copied trade.
#[derive(Debug, Clone)]
pub struct Order {
    pub order_id: String,
    pub kind: OrderKind,
    pub token_id: String,
    /// Limit price; `None` for market orders
    pub price: Option<Decimal>,
    /// Shares for limit orders, USDC notional for market buys
    pub size: Decimal,
    pub side: TradeSide,
    pub status: OrderStatus,
}

impl Order {
    pub fn limit(
        order_id: String,
        token_id: String,
        price: Decimal,
        size: Decimal,
        side: TradeSide,
    ) -> Self {
        Self {
            order_id,
            kind: OrderKind::Limit,
            token_id,
            price: Some(price),
            size,
            side,
            status: OrderStatus::Placed,
        }
    }

    pub fn market(order_id: String, token_id: String, amount: Decimal, side: TradeSide) -> Self {
        Self {
            order_id,
            kind: OrderKind::Market,
            token_id,
            price: None,
            size: amount,
            side,
            status: OrderStatus::Placed,
        }
    }

    /// Record that open orders were listed after the timeout.
    pub fn mark_queried(&mut self) {
        if self.status == OrderStatus::Placed {
            self.status = OrderStatus::Queried;
        }
    }

    /// Resolve a queried order: cancelled if it was still resting, done otherwise.
    pub fn resolve(&mut self, cancelled: bool) {
        self.status = if cancelled {
            OrderStatus::Cancelled
        } else {
            OrderStatus::Done
        };
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.kind, self.side, self.size)?;
        if let Some(price) = self.price {
            write!(f, " @ {}", price)?;
        }
        write!(f, " on {} ({:?})", self.token_id, self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_limit_lifecycle() {
        let mut order = Order::limit(
            "0xorder".to_string(),
            "123".to_string(),
            dec!(0.5),
            dec!(10),
            TradeSide::Buy,
        );
        assert_eq!(order.status, OrderStatus::Placed);

        order.mark_queried();
        assert_eq!(order.status, OrderStatus::Queried);

        order.resolve(true);
        assert_eq!(order.status, OrderStatus::Cancelled);

        // A terminal order is not moved back to Queried
        order.mark_queried();
        assert_eq!(order.status, OrderStatus::Cancelled);
    }

    #[test]
    fn test_market_order_has_no_price() {
        let order = Order::market("id".to_string(), "123".to_string(), dec!(1), TradeSide::Sell);
        assert_eq!(order.kind, OrderKind::Market);
        assert!(order.price.is_none());
        assert_eq!(order.to_string(), "market SELL 1 on 123 (Placed)");
    }

    #[test]
    fn test_order_kind_parsing() {
        assert_eq!("limit".parse::<OrderKind>().unwrap(), OrderKind::Limit);
        assert_eq!(" Market ".parse::<OrderKind>().unwrap(), OrderKind::Market);
        assert!("fok".parse::<OrderKind>().is_err());
        assert!("".parse::<OrderKind>().is_err());
    }
}
