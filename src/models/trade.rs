//! Trade model representing a trade observed on a watched wallet.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeSide {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(TradeSide::Buy),
            "SELL" => Ok(TradeSide::Sell),
            other => anyhow::bail!("unknown trade side '{}'", other),
        }
    }
}

/// A trade made by a watched wallet, decoded from the trade feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trade {
    /// On-chain transaction hash, the dedup key
    pub transaction_hash: String,

    /// Wallet the trade was fetched for
    pub wallet: String,

    /// Outcome token id (the CLOB `token_id`)
    pub asset: String,

    /// Price per share in USDC (0.0 to 1.0)
    pub price: Decimal,

    /// Number of shares traded
    pub size: Decimal,

    pub side: TradeSide,
}

impl Trade {
    /// Short form of the hash for log lines.
    pub fn short_hash(&self) -> &str {
        truncate(&self.transaction_hash, 10)
    }

    /// Short form of the token id for log lines.
    pub fn short_asset(&self) -> &str {
        truncate(&self.asset, 20)
    }

    /// Notional value of the source trade in USDC.
    pub fn notional(&self) -> Decimal {
        self.price * self.size
    }
}

/// A trade record from the feed together with its raw payload.
///
/// The raw payload is what gets persisted in the seen-trades table. A record
/// that has a transaction hash but fails to decode is still observed so its
/// hash can be recorded; it is never copied.
#[derive(Debug, Clone)]
pub struct ObservedTrade {
    pub transaction_hash: String,
    pub trade: Option<Trade>,
    pub payload: String,
}

impl ObservedTrade {
    pub fn decoded(trade: Trade, payload: String) -> Self {
        Self {
            transaction_hash: trade.transaction_hash.clone(),
            trade: Some(trade),
            payload,
        }
    }

    pub fn malformed(transaction_hash: String, payload: String) -> Self {
        Self {
            transaction_hash,
            trade: None,
            payload,
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_side_parsing_is_case_insensitive() {
        assert_eq!("buy".parse::<TradeSide>().unwrap(), TradeSide::Buy);
        assert_eq!(" SELL ".parse::<TradeSide>().unwrap(), TradeSide::Sell);
        assert!("HOLD".parse::<TradeSide>().is_err());
    }

    #[test]
    fn test_short_fields() {
        let trade = Trade {
            transaction_hash: "0xabcdef0123456789".to_string(),
            wallet: "0x123".to_string(),
            asset: "12345".to_string(),
            price: dec!(0.40),
            size: dec!(25),
            side: TradeSide::Buy,
        };

        assert_eq!(trade.short_hash(), "0xabcdef01");
        assert_eq!(trade.short_asset(), "12345");
        assert_eq!(trade.notional(), dec!(10));
    }
}
