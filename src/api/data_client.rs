//! Polymarket Data API client for fetching the recent trades of a wallet.

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::ObservedTrade;

use super::types::{TradeResponse, TradesParams};
use super::TradeFeed;

pub const DATA_API_BASE: &str = "https://data-api.polymarket.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for Polymarket Data API (read-only operations).
pub struct DataClient {
    client: Client,
    base_url: String,
}

impl DataClient {
    /// Create with custom base URL.
    pub fn with_base_url(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    /// Fetch the newest `limit` trades of a wallet.
    ///
    /// Records that fail to decode are skipped with a warning; a non-2xx
    /// status or an unparseable body fails the whole call.
    pub async fn get_trades(&self, address: &str, limit: u32) -> Result<Vec<ObservedTrade>> {
        let url = format!("{}/trades", self.base_url);
        let params = TradesParams {
            user: address,
            limit,
            offset: 0,
            sort_direction: "DESC",
        };

        debug!(url = %url, wallet = %address, limit = limit, "Fetching trades");

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .context("Failed to fetch trades")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Trades request failed: {} - {}", status, body);
        }

        let items: Vec<serde_json::Value> = response
            .json()
            .await
            .context("Failed to parse trades response")?;

        Ok(decode_trades(address, items))
    }
}

impl TradeFeed for DataClient {
    async fn fetch_trades(&self, wallet: &str, limit: u32) -> Result<Vec<ObservedTrade>> {
        self.get_trades(wallet, limit).await
    }
}

/// Decode a page of raw records.
///
/// Records with a transaction hash are always kept so the hash can be
/// recorded, even when the rest fails to decode. Records without one are
/// dropped.
fn decode_trades(address: &str, items: Vec<serde_json::Value>) -> Vec<ObservedTrade> {
    items
        .into_iter()
        .filter_map(|raw| {
            let payload = raw.to_string();
            let hash = raw
                .get("transactionHash")
                .and_then(|h| h.as_str())
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string);

            let decoded = serde_json::from_value::<TradeResponse>(raw)
                .map_err(anyhow::Error::from)
                .and_then(|t| t.into_trade(address));

            match (decoded, hash) {
                (Ok(trade), _) => Some(ObservedTrade::decoded(trade, payload)),
                (Err(e), Some(hash)) => {
                    debug!(wallet = %address, tx = %hash, error = %e, "Malformed trade record");
                    Some(ObservedTrade::malformed(hash, payload))
                }
                (Err(e), None) => {
                    warn!(wallet = %address, error = %e, "Skipping trade record without a transactionHash");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_keeps_hash_of_malformed_records() {
        let items = vec![
            serde_json::json!({
                "transactionHash": "0x1", "asset": "111", "price": 0.4, "size": 10, "side": "BUY"
            }),
            serde_json::json!({ "transactionHash": "0x2", "asset": "222" }),
            serde_json::json!({
                "transactionHash": "0x3", "asset": "333", "price": "0.9", "size": "3", "side": "sell"
            }),
            serde_json::json!({ "asset": "444", "price": 0.5, "size": 1, "side": "BUY" }),
        ];

        let trades = decode_trades("0xwallet", items);
        let hashes: Vec<_> = trades.iter().map(|t| t.transaction_hash.as_str()).collect();

        assert_eq!(hashes, vec!["0x1", "0x2", "0x3"]);
        assert!(trades[1].trade.is_none());
        assert!(trades[1].payload.contains("\"asset\":\"222\""));

        let decoded: Vec<_> = trades.iter().filter_map(|t| t.trade.as_ref()).collect();
        assert_eq!(decoded.len(), 2);
        assert!(decoded.iter().all(|t| t.wallet == "0xwallet"));
        assert!(trades[0].payload.contains("\"transactionHash\":\"0x1\""));
    }
}
