//! API response types for the Polymarket Data API.

use anyhow::{bail, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Trade;

/// Trade response from the /trades endpoint.
///
/// Only the fields the copier needs are required; everything else the API
/// returns is kept verbatim in the raw payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeResponse {
    pub transaction_hash: String,
    pub asset: String,
    pub price: Decimal,
    pub size: Decimal,
    pub side: String,
}

impl TradeResponse {
    /// Convert into a typed trade for `wallet`.
    pub fn into_trade(self, wallet: &str) -> Result<Trade> {
        if self.transaction_hash.is_empty() {
            bail!("trade has an empty transactionHash");
        }
        if self.asset.is_empty() {
            bail!("trade {} has an empty asset", self.transaction_hash);
        }

        Ok(Trade {
            side: self.side.parse()?,
            transaction_hash: self.transaction_hash,
            wallet: wallet.to_string(),
            asset: self.asset,
            price: self.price,
            size: self.size,
        })
    }
}

/// Query parameters for /trades.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesParams<'a> {
    pub user: &'a str,
    pub limit: u32,
    pub offset: u32,
    pub sort_direction: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TradeSide;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decode_numeric_fields() {
        let raw = serde_json::json!({
            "proxyWallet": "0xabc",
            "side": "BUY",
            "asset": "71321045679252212594626385532706912750332728571942532289631379312455583992563",
            "conditionId": "0xcond",
            "size": 12.5,
            "price": 0.52,
            "timestamp": 1718000000,
            "title": "Will it rain?",
            "outcome": "Yes",
            "transactionHash": "0xhash"
        });

        let response: TradeResponse = serde_json::from_value(raw).unwrap();
        let trade = response.into_trade("0xabc").unwrap();

        assert_eq!(trade.transaction_hash, "0xhash");
        assert_eq!(trade.side, TradeSide::Buy);
        assert_eq!(trade.price, dec!(0.52));
        assert_eq!(trade.size, dec!(12.5));
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let raw = serde_json::json!({
            "side": "SELL",
            "asset": "123",
            "size": 1,
            "transactionHash": "0xhash"
        });

        assert!(serde_json::from_value::<TradeResponse>(raw).is_err());
    }

    #[test]
    fn test_unknown_side_is_rejected() {
        let raw = serde_json::json!({
            "side": "MERGE",
            "asset": "123",
            "size": 1,
            "price": 0.5,
            "transactionHash": "0xhash"
        });

        let response: TradeResponse = serde_json::from_value(raw).unwrap();
        assert!(response.into_trade("0xabc").is_err());
    }
}
