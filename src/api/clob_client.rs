//! Polymarket CLOB (Central Limit Order Book) client for order execution.
//!
//! The CLOB is Polymarket's off-chain order matching engine that settles on Polygon.
//! This client handles:
//! - API credential derivation (L1 headers signed with the wallet key)
//! - Request authentication (L2 HMAC headers)
//! - Order signing using EIP-712 typed data
//! - Order submission, open-order listing and cancellation

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Mutex;

use alloy_primitives::{keccak256, Address, U256};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::TradeSide;

use super::auth::ApiCreds;
use super::TradingApi;

/// CLOB API base URL
pub const CLOB_URL: &str = "https://clob.polymarket.com";

/// Polygon mainnet
pub const POLYGON_CHAIN_ID: u64 = 137;

/// Polymarket CTF Exchange contract on Polygon
pub const CTF_EXCHANGE: &str = "0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E";
/// Neg Risk CTF Exchange for multi-outcome markets
pub const NEG_RISK_CTF_EXCHANGE: &str = "0xC5d563A36AE78145C45a50134d48A1215220f80a";

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";
const CLOB_AUTH_MESSAGE: &str = "This message attests that I control the given wallet";
const END_CURSOR: &str = "LTE=";
const USDC_DECIMALS: u32 = 6;

/// Order side in the CLOB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_u8(&self) -> u8 {
        match self {
            OrderSide::Buy => 0,
            OrderSide::Sell => 1,
        }
    }
}

impl From<TradeSide> for OrderSide {
    fn from(side: TradeSide) -> Self {
        match side {
            TradeSide::Buy => OrderSide::Buy,
            TradeSide::Sell => OrderSide::Sell,
        }
    }
}

/// Order type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Good-til-cancelled limit order
    Gtc,
    /// Fill-or-kill market order
    Fok,
}

/// Signature type for CLOB orders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureType {
    /// EOA signature
    Eoa = 0,
    /// Polymarket proxy signature
    Poly = 1,
    /// Polymarket proxy signature (gnosis safe)
    PolyGnosisSafe = 2,
}

impl TryFrom<u8> for SignatureType {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(SignatureType::Eoa),
            1 => Ok(SignatureType::Poly),
            2 => Ok(SignatureType::PolyGnosisSafe),
            other => Err(anyhow!("Unknown signature type {}", other)),
        }
    }
}

/// Arguments for a limit order.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitOrderArgs {
    pub token_id: String,
    pub price: Decimal,
    /// Size in shares
    pub size: Decimal,
    pub side: OrderSide,
}

/// Arguments for a market order.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketOrderArgs {
    pub token_id: String,
    /// USDC to spend on a buy, shares to sell on a sell
    pub amount: Decimal,
    pub side: OrderSide,
}

/// Signed order ready for submission
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedOrder {
    pub salt: u64,
    pub maker: String,
    pub signer: String,
    pub taker: String,
    pub token_id: String,
    pub maker_amount: String,
    pub taker_amount: String,
    pub side: String,
    pub expiration: String,
    pub nonce: String,
    pub fee_rate_bps: String,
    pub signature_type: u8,
    pub signature: String,
}

/// Order submission request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderPayload {
    pub order: SignedOrder,
    pub owner: String,
    pub order_type: OrderType,
}

/// Response from order placement
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error_msg: String,
    #[serde(rename = "orderID", default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "transactionsHashes", default)]
    pub transaction_hashes: Vec<String>,
}

/// Resting order owned by this account.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenOrder {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub original_size: String,
    #[serde(default)]
    pub size_matched: String,
}

#[derive(Debug, Deserialize)]
struct OpenOrdersPage {
    #[serde(default)]
    data: Vec<OpenOrder>,
    #[serde(default)]
    next_cursor: String,
}

#[derive(Debug, Deserialize)]
struct CancelResponse {
    #[serde(default)]
    canceled: Vec<String>,
    #[serde(default)]
    not_canceled: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct NegRiskResponse {
    #[serde(default)]
    neg_risk: bool,
}

/// Order book entry
#[derive(Debug, Clone, Deserialize)]
pub struct BookLevel {
    pub price: String,
    pub size: String,
}

/// Order book response
#[derive(Debug, Clone, Deserialize)]
pub struct OrderBook {
    #[serde(default)]
    pub bids: Vec<BookLevel>,
    #[serde(default)]
    pub asks: Vec<BookLevel>,
}

/// Connection settings for [`ClobClient::connect`].
#[derive(Debug, Clone)]
pub struct ClobSettings {
    pub host: String,
    /// Hex private key, with or without 0x prefix
    pub private_key: String,
    /// Address holding the funds (the Polymarket proxy wallet)
    pub funder: String,
    pub signature_type: SignatureType,
    pub chain_id: u64,
    /// Derived from the private key when absent
    pub creds: Option<ApiCreds>,
}

/// CLOB API client for executing trades on Polymarket.
pub struct ClobClient {
    http: Client,
    host: String,
    signer: PrivateKeySigner,
    funder: Address,
    signature_type: SignatureType,
    chain_id: u64,
    creds: ApiCreds,
    neg_risk: Mutex<HashMap<String, bool>>,
}

impl ClobClient {
    /// Build a client and make sure it holds valid API credentials.
    pub async fn connect(settings: ClobSettings) -> Result<Self> {
        let pk = settings
            .private_key
            .strip_prefix("0x")
            .unwrap_or(&settings.private_key);
        let signer = PrivateKeySigner::from_str(pk).context("Invalid private key")?;
        let funder = Address::from_str(&settings.funder).context("Invalid funder address")?;

        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let host = settings.host.trim_end_matches('/').to_string();

        let creds = match settings.creds {
            Some(creds) => creds,
            None => {
                derive_api_creds(&http, &host, &signer, settings.chain_id).await?
            }
        };

        info!(
            signer = ?signer.address(),
            funder = ?funder,
            "CLOB client initialized"
        );

        Ok(Self {
            http,
            host,
            signer,
            funder,
            signature_type: settings.signature_type,
            chain_id: settings.chain_id,
            creds,
            neg_risk: Mutex::new(HashMap::new()),
        })
    }

    /// Get the signing wallet address.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Get order book for a token.
    pub async fn get_order_book(&self, token_id: &str) -> Result<OrderBook> {
        let url = format!("{}/book", self.host);
        let resp = self
            .http
            .get(&url)
            .query(&[("token_id", token_id)])
            .send()
            .await
            .context("Failed to fetch order book")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Failed to get order book: {} - {}", status, text));
        }

        resp.json().await.context("Failed to parse order book")
    }

    /// Best price we could take on the other side of the book.
    async fn best_price(&self, token_id: &str, side: OrderSide) -> Result<Decimal> {
        let book = self.get_order_book(token_id).await?;
        best_level_price(&book, side).ok_or_else(|| match side {
            OrderSide::Buy => anyhow!("No asks available for {}", token_id),
            OrderSide::Sell => anyhow!("No bids available for {}", token_id),
        })
    }

    /// Whether the token trades on the neg-risk exchange. Cached per token.
    async fn is_neg_risk(&self, token_id: &str) -> Result<bool> {
        if let Some(cached) = self.neg_risk_cache().get(token_id) {
            return Ok(*cached);
        }

        let url = format!("{}/neg-risk", self.host);
        let resp = self
            .http
            .get(&url)
            .query(&[("token_id", token_id)])
            .send()
            .await
            .context("Failed to fetch neg-risk flag")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("Failed to get neg-risk flag: {} - {}", status, text);
        }

        let flag: NegRiskResponse = resp.json().await.context("Failed to parse neg-risk flag")?;
        self.neg_risk_cache().insert(token_id.to_string(), flag.neg_risk);
        Ok(flag.neg_risk)
    }

    fn neg_risk_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, bool>> {
        self.neg_risk.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Build and sign a limit order.
    pub async fn build_limit_order(&self, args: &LimitOrderArgs) -> Result<SignedOrder> {
        if args.price <= Decimal::ZERO || args.price >= Decimal::ONE {
            bail!("Limit price {} outside (0, 1)", args.price);
        }

        let size = round_down(args.size, 2);
        if size <= Decimal::ZERO {
            bail!("Order size {} rounds to zero", args.size);
        }
        let notional = round_down(size * args.price, 4);

        // BUY: we pay USDC and receive shares. SELL: the reverse.
        let (maker_amount, taker_amount) = match args.side {
            OrderSide::Buy => (notional, size),
            OrderSide::Sell => (size, notional),
        };

        self.build_signed_order(&args.token_id, args.side, maker_amount, taker_amount)
            .await
    }

    /// Build and sign a market order priced off the current book.
    pub async fn build_market_order(&self, args: &MarketOrderArgs) -> Result<SignedOrder> {
        if args.amount <= Decimal::ZERO {
            bail!("Market order amount must be positive, got {}", args.amount);
        }

        let price = self.best_price(&args.token_id, args.side).await?;
        let amount = round_down(args.amount, 2);

        let (maker_amount, taker_amount) = match args.side {
            OrderSide::Buy => (amount, round_down(amount / price, 4)),
            OrderSide::Sell => (amount, round_down(amount * price, 4)),
        };

        debug!(
            token = %args.token_id,
            price = %price,
            maker_amount = %maker_amount,
            taker_amount = %taker_amount,
            "Priced market order"
        );

        self.build_signed_order(&args.token_id, args.side, maker_amount, taker_amount)
            .await
    }

    /// Build a signed order for submission.
    async fn build_signed_order(
        &self,
        token_id: &str,
        side: OrderSide,
        maker_amount: Decimal,
        taker_amount: Decimal,
    ) -> Result<SignedOrder> {
        let maker = format!("{:?}", self.funder);
        let signer = format!("{:?}", self.address());
        let taker = ZERO_ADDRESS.to_string();

        let maker_amount = Self::to_base_units(maker_amount);
        let taker_amount = Self::to_base_units(taker_amount);

        let salt = Self::generate_salt();
        let expiration = "0".to_string();
        let nonce = "0".to_string();
        let fee_rate_bps = "0".to_string();

        let exchange = if self.is_neg_risk(token_id).await? {
            NEG_RISK_CTF_EXCHANGE
        } else {
            CTF_EXCHANGE
        };

        let order_hash = Self::compute_order_hash(
            &salt.to_string(),
            &maker,
            &signer,
            &taker,
            token_id,
            &maker_amount,
            &taker_amount,
            &expiration,
            &nonce,
            &fee_rate_bps,
            side.as_u8(),
            self.signature_type as u8,
        )?;
        let domain_hash = Self::compute_domain_separator(self.chain_id, exchange)?;

        // keccak256("\x19\x01" + domainSeparator + orderHash)
        let mut message = vec![0x19, 0x01];
        message.extend_from_slice(&domain_hash);
        message.extend_from_slice(&order_hash);

        let digest = keccak256(&message);
        let signature = self
            .signer
            .sign_hash(&digest)
            .await
            .context("Failed to sign order")?;

        let side_str = match side {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        };

        Ok(SignedOrder {
            salt,
            maker,
            signer,
            taker,
            token_id: token_id.to_string(),
            maker_amount,
            taker_amount,
            side: side_str.to_string(),
            expiration,
            nonce,
            fee_rate_bps,
            signature_type: self.signature_type as u8,
            signature: format!("0x{}", hex::encode(signature.as_bytes())),
        })
    }

    /// Compute the EIP-712 order struct hash.
    #[allow(clippy::too_many_arguments)]
    fn compute_order_hash(
        salt: &str,
        maker: &str,
        signer: &str,
        taker: &str,
        token_id: &str,
        maker_amount: &str,
        taker_amount: &str,
        expiration: &str,
        nonce: &str,
        fee_rate_bps: &str,
        side: u8,
        signature_type: u8,
    ) -> Result<[u8; 32]> {
        let type_hash = keccak256(
            b"Order(uint256 salt,address maker,address signer,address taker,uint256 tokenId,uint256 makerAmount,uint256 takerAmount,uint256 expiration,uint256 nonce,uint256 feeRateBps,uint8 side,uint8 signatureType)"
        );

        let mut encoded = Vec::with_capacity(13 * 32);
        encoded.extend_from_slice(type_hash.as_slice());
        encoded.extend_from_slice(&Self::encode_uint256(salt)?);
        encoded.extend_from_slice(&Self::encode_address(maker)?);
        encoded.extend_from_slice(&Self::encode_address(signer)?);
        encoded.extend_from_slice(&Self::encode_address(taker)?);
        encoded.extend_from_slice(&Self::encode_uint256(token_id)?);
        encoded.extend_from_slice(&Self::encode_uint256(maker_amount)?);
        encoded.extend_from_slice(&Self::encode_uint256(taker_amount)?);
        encoded.extend_from_slice(&Self::encode_uint256(expiration)?);
        encoded.extend_from_slice(&Self::encode_uint256(nonce)?);
        encoded.extend_from_slice(&Self::encode_uint256(fee_rate_bps)?);
        encoded.extend_from_slice(&Self::encode_uint8(side));
        encoded.extend_from_slice(&Self::encode_uint8(signature_type));

        Ok(keccak256(&encoded).0)
    }

    /// Compute the EIP-712 domain separator for an exchange contract.
    fn compute_domain_separator(chain_id: u64, exchange: &str) -> Result<[u8; 32]> {
        let type_hash = keccak256(
            b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
        );
        let name_hash = keccak256(b"Polymarket CTF Exchange");
        let version_hash = keccak256(b"1");

        let mut encoded = Vec::with_capacity(5 * 32);
        encoded.extend_from_slice(type_hash.as_slice());
        encoded.extend_from_slice(name_hash.as_slice());
        encoded.extend_from_slice(version_hash.as_slice());
        encoded.extend_from_slice(&Self::encode_uint256(&chain_id.to_string())?);
        encoded.extend_from_slice(&Self::encode_address(exchange)?);

        Ok(keccak256(&encoded).0)
    }

    /// Submit a signed order.
    pub async fn submit_order(&self, order: SignedOrder, order_type: OrderType) -> Result<OrderResponse> {
        let payload = OrderPayload {
            order,
            owner: self.creds.api_key.clone(),
            order_type,
        };
        let body = serde_json::to_string(&payload).context("Failed to encode order")?;

        let resp = self.send_l2(Method::POST, "/order", &[], Some(body)).await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Order placement failed: {} - {}", status, text));
        }

        let response: OrderResponse = resp.json().await.context("Failed to parse order response")?;
        if !response.success {
            bail!("Order rejected: {}", response.error_msg);
        }

        Ok(response)
    }

    /// Get all open orders for this account, following pagination.
    pub async fn list_open_orders(&self) -> Result<Vec<OpenOrder>> {
        let mut orders = Vec::new();
        let mut cursor = "MA==".to_string();

        loop {
            let resp = self
                .send_l2(Method::GET, "/data/orders", &[("next_cursor", cursor.as_str())], None)
                .await?;

            if !resp.status().is_success() {
                let status = resp.status();
                let text = resp.text().await.unwrap_or_default();
                return Err(anyhow!("Failed to get orders: {} - {}", status, text));
            }

            let page: OpenOrdersPage = resp.json().await.context("Failed to parse orders")?;
            orders.extend(page.data);

            if page.next_cursor.is_empty() || page.next_cursor == END_CURSOR {
                break;
            }
            cursor = page.next_cursor;
        }

        Ok(orders)
    }

    /// Cancel an order by ID.
    pub async fn cancel_order(&self, order_id: &str) -> Result<()> {
        let body = serde_json::json!({ "orderID": order_id }).to_string();
        let resp = self.send_l2(Method::DELETE, "/order", &[], Some(body)).await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow!("Cancel failed: {} - {}", status, text));
        }

        let result: CancelResponse = resp.json().await.context("Failed to parse cancel response")?;
        if result.canceled.iter().any(|id| id == order_id) {
            return Ok(());
        }

        match result.not_canceled.get(order_id) {
            Some(reason) => Err(anyhow!("Order {} not cancelled: {}", order_id, reason)),
            None => Err(anyhow!("Order {} missing from cancel response", order_id)),
        }
    }

    /// Send an authenticated request. The signature covers the path without query.
    async fn send_l2(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<String>,
    ) -> Result<reqwest::Response> {
        let body_str = body.as_deref().unwrap_or("");
        let headers = self.build_l2_headers(method.as_str(), path, body_str)?;

        let url = format!("{}{}", self.host, path);
        let mut request = self.http.request(method, &url).headers(headers);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        request
            .send()
            .await
            .with_context(|| format!("Request to {} failed", path))
    }

    /// Build L2 authentication headers (API key + HMAC of the request).
    fn build_l2_headers(&self, method: &str, path: &str, body: &str) -> Result<HeaderMap> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.creds.sign(&timestamp, method, path, body)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("poly_address"),
            HeaderValue::from_str(&format!("{:?}", self.address()))?,
        );
        headers.insert(
            HeaderName::from_static("poly_signature"),
            HeaderValue::from_str(&signature)?,
        );
        headers.insert(
            HeaderName::from_static("poly_timestamp"),
            HeaderValue::from_str(&timestamp)?,
        );
        headers.insert(
            HeaderName::from_static("poly_api_key"),
            HeaderValue::from_str(&self.creds.api_key)?,
        );
        headers.insert(
            HeaderName::from_static("poly_passphrase"),
            HeaderValue::from_str(&self.creds.passphrase)?,
        );

        Ok(headers)
    }

    /// Convert a decimal amount to 6-decimal base units, truncating.
    fn to_base_units(amount: Decimal) -> String {
        let units = (amount * Decimal::from(10u64.pow(USDC_DECIMALS))).trunc();
        units.normalize().to_string()
    }

    /// Encode address to 32-byte padded format.
    fn encode_address(addr: &str) -> Result<[u8; 32]> {
        let addr = Address::from_str(addr)?;
        let mut buf = [0u8; 32];
        buf[12..].copy_from_slice(addr.as_slice());
        Ok(buf)
    }

    /// Encode uint256 from a decimal string.
    fn encode_uint256(value: &str) -> Result<[u8; 32]> {
        let n = U256::from_str_radix(value, 10)
            .map_err(|e| anyhow!("Invalid uint256 '{}': {}", value, e))?;
        Ok(n.to_be_bytes())
    }

    /// Encode uint8 to 32-byte padded format.
    fn encode_uint8(value: u8) -> [u8; 32] {
        let mut buf = [0u8; 32];
        buf[31] = value;
        buf
    }

    /// Random salt small enough to survive a round trip through a JS number.
    fn generate_salt() -> u64 {
        (uuid::Uuid::new_v4().as_u128() >> 80) as u64
    }
}

impl TradingApi for ClobClient {
    async fn create_order(&self, args: &LimitOrderArgs) -> Result<SignedOrder> {
        self.build_limit_order(args).await
    }

    async fn create_market_order(&self, args: &MarketOrderArgs) -> Result<SignedOrder> {
        self.build_market_order(args).await
    }

    async fn post_order(&self, order: SignedOrder, order_type: OrderType) -> Result<OrderResponse> {
        self.submit_order(order, order_type).await
    }

    async fn get_open_orders(&self) -> Result<Vec<OpenOrder>> {
        self.list_open_orders().await
    }

    async fn cancel(&self, order_id: &str) -> Result<()> {
        self.cancel_order(order_id).await
    }
}

/// Fetch the API key for this signer, creating one if none exists yet.
async fn derive_api_creds(
    http: &Client,
    host: &str,
    signer: &PrivateKeySigner,
    chain_id: u64,
) -> Result<ApiCreds> {
    let derive_url = format!("{}/auth/derive-api-key", host);
    let headers = build_l1_headers(signer, chain_id, 0).await?;
    let resp = http
        .get(&derive_url)
        .headers(headers)
        .send()
        .await
        .context("Failed to derive API key")?;

    if resp.status().is_success() {
        info!("Derived existing CLOB API key");
        return resp.json().await.context("Failed to parse derived API key");
    }

    warn!(status = %resp.status(), "No API key to derive, creating one");

    let create_url = format!("{}/auth/api-key", host);
    let headers = build_l1_headers(signer, chain_id, 0).await?;
    let resp = http
        .post(&create_url)
        .headers(headers)
        .send()
        .await
        .context("Failed to create API key")?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        bail!("API key creation failed: {} - {}", status, text);
    }

    resp.json().await.context("Failed to parse created API key")
}

/// Build L1 authentication headers: an EIP-712 `ClobAuth` signature.
async fn build_l1_headers(signer: &PrivateKeySigner, chain_id: u64, nonce: u64) -> Result<HeaderMap> {
    let address = format!("{:?}", signer.address());
    let timestamp = Utc::now().timestamp().to_string();

    let digest = clob_auth_digest(&address, &timestamp, nonce, chain_id)?;
    let signature = signer
        .sign_hash(&keccak256(digest))
        .await
        .context("Failed to sign ClobAuth message")?;

    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("poly_address"),
        HeaderValue::from_str(&address)?,
    );
    headers.insert(
        HeaderName::from_static("poly_signature"),
        HeaderValue::from_str(&format!("0x{}", hex::encode(signature.as_bytes())))?,
    );
    headers.insert(
        HeaderName::from_static("poly_timestamp"),
        HeaderValue::from_str(&timestamp)?,
    );
    headers.insert(
        HeaderName::from_static("poly_nonce"),
        HeaderValue::from_str(&nonce.to_string())?,
    );

    Ok(headers)
}

/// `"\x19\x01" || domainSeparator || structHash` for the `ClobAuth` message.
fn clob_auth_digest(address: &str, timestamp: &str, nonce: u64, chain_id: u64) -> Result<Vec<u8>> {
    let domain_type = keccak256(b"EIP712Domain(string name,string version,uint256 chainId)");
    let mut domain = Vec::with_capacity(4 * 32);
    domain.extend_from_slice(domain_type.as_slice());
    domain.extend_from_slice(keccak256(b"ClobAuthDomain").as_slice());
    domain.extend_from_slice(keccak256(b"1").as_slice());
    domain.extend_from_slice(&ClobClient::encode_uint256(&chain_id.to_string())?);
    let domain_hash = keccak256(&domain);

    let struct_type = keccak256(b"ClobAuth(address address,string timestamp,uint256 nonce,string message)");
    let mut data = Vec::with_capacity(5 * 32);
    data.extend_from_slice(struct_type.as_slice());
    data.extend_from_slice(&ClobClient::encode_address(address)?);
    data.extend_from_slice(keccak256(timestamp.as_bytes()).as_slice());
    data.extend_from_slice(&ClobClient::encode_uint256(&nonce.to_string())?);
    data.extend_from_slice(keccak256(CLOB_AUTH_MESSAGE.as_bytes()).as_slice());
    let struct_hash = keccak256(&data);

    let mut message = Vec::with_capacity(66);
    message.extend_from_slice(&[0x19, 0x01]);
    message.extend_from_slice(domain_hash.as_slice());
    message.extend_from_slice(struct_hash.as_slice());
    Ok(message)
}

/// Round toward zero at `dp` decimal places.
fn round_down(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::ToZero)
}

/// Lowest ask for a buy, highest bid for a sell. Empty levels are ignored.
fn best_level_price(book: &OrderBook, side: OrderSide) -> Option<Decimal> {
    let levels = match side {
        OrderSide::Buy => &book.asks,
        OrderSide::Sell => &book.bids,
    };

    let prices = levels
        .iter()
        .filter(|level| Decimal::from_str(&level.size).map_or(false, |size| size > Decimal::ZERO))
        .filter_map(|level| Decimal::from_str(&level.price).ok());
    match side {
        OrderSide::Buy => prices.min(),
        OrderSide::Sell => prices.max(),
    }
}
