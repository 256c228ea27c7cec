//! Trading configuration.

use std::time::Duration;

use anyhow::{bail, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::models::OrderKind;

/// How copied trades are turned into orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Limit orders at the source price, or fixed-amount market orders
    pub order_type: OrderKind,

    /// Seconds a limit order may rest before it is cancelled
    pub limit_order_timeout_secs: u64,

    /// USDC spent (or shares sold) per copied trade in market mode
    pub market_order_fixed_amount: Decimal,

    /// Size limit orders so that price * size >= 1 USDC instead of mirroring
    /// the source size
    pub min_share_possible: bool,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            order_type: OrderKind::Limit,
            limit_order_timeout_secs: 10,
            market_order_fixed_amount: dec!(1),
            min_share_possible: false,
        }
    }
}

impl TradingConfig {
    pub fn limit_order_timeout(&self) -> Duration {
        Duration::from_secs(self.limit_order_timeout_secs)
    }

    /// Reject settings the executor cannot work with.
    pub fn validate(&self) -> Result<()> {
        match self.order_type {
            OrderKind::Limit if self.limit_order_timeout_secs == 0 => {
                bail!("limit order timeout must be a positive number of seconds")
            }
            OrderKind::Market if self.market_order_fixed_amount <= Decimal::ZERO => {
                bail!(
                    "market order fixed amount must be positive, got {}",
                    self.market_order_fixed_amount
                )
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults_are_valid() {
        let config = TradingConfig::default();
        assert_ok!(config.validate());
        assert_eq!(config.limit_order_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_rejects_zero_timeout_for_limit() {
        let config = TradingConfig {
            limit_order_timeout_secs: 0,
            ..Default::default()
        };
        assert_err!(config.validate());

        // Irrelevant in market mode
        let config = TradingConfig {
            order_type: OrderKind::Market,
            limit_order_timeout_secs: 0,
            ..Default::default()
        };
        assert_ok!(config.validate());
    }

    #[test]
    fn test_rejects_non_positive_market_amount() {
        let config = TradingConfig {
            order_type: OrderKind::Market,
            market_order_fixed_amount: dec!(0),
            ..Default::default()
        };
        assert_err!(config.validate());
    }
}
