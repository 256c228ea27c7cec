//! Polymarket Copy-Trading Bot
//!
//! Watches a list of wallets and mirrors every new trade they make with an
//! order on our own account.

mod api;
mod bot;
mod db;
mod models;
mod trading;
mod wallets;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::str::FromStr;

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use anyhow::{bail, Context, Result};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::api::{
    ApiCreds, ClobClient, ClobSettings, DataClient, SignatureType, CLOB_URL, DATA_API_BASE,
    POLYGON_CHAIN_ID,
};
use crate::bot::{Bot, BotConfig};
use crate::db::Database;
use crate::models::OrderKind;
use crate::trading::{TradingConfig, DEFAULT_FETCH_LIMIT};
use crate::wallets::WalletRegistry;

/// Polymarket copy-trading bot CLI.
#[derive(Parser)]
#[command(name = "polycopy")]
#[command(about = "Mirror the trades of watched Polymarket wallets", long_about = None)]
struct Cli {
    /// Database URL
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:./trades.db?mode=rwc")]
    database: String,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start copying trades until Ctrl+C
    Run(CopierArgs),

    /// Validate the configuration without trading
    Check(CopierArgs),

    /// Show what the dedup store has recorded
    Status {
        /// Only report on this wallet
        #[arg(short, long)]
        wallet: Option<String>,

        /// Print the stored record of one transaction
        #[arg(short, long)]
        trade: Option<String>,
    },

    /// Print the wallets currently listed in the wallets file
    Wallets {
        /// Newline-delimited wallet list
        #[arg(long, env = "WALLETS_TXT_PATH")]
        wallets: PathBuf,
    },
}

/// Settings shared by `run` and `check`.
///
/// Everything is optional at parse time so `check` can report every problem
/// at once instead of stopping at the first missing value.
#[derive(Args)]
struct CopierArgs {
    /// Private key of the signing wallet
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    private_key: Option<String>,

    /// Address holding the funds (Polymarket proxy wallet)
    #[arg(long, env = "FUNDER_ADDRESS")]
    funder: Option<String>,

    /// Newline-delimited list of wallets to copy
    #[arg(long, env = "WALLETS_TXT_PATH")]
    wallets: Option<PathBuf>,

    /// How copied trades are submitted: limit or market
    #[arg(long, env = "ORDER_TYPE")]
    order_type: Option<String>,

    /// Seconds a limit order may rest before it is cancelled [default: 10]
    #[arg(long, env = "LIMIT_ORDER_TIMEOUT")]
    limit_order_timeout: Option<String>,

    /// USDC amount of every market order [default: 1]
    #[arg(long, env = "MARKET_ORDER_FIXED_AMOUNT")]
    market_order_fixed_amount: Option<String>,

    /// Misspelled name of MARKET_ORDER_FIXED_AMOUNT read by older setups
    #[arg(long = "market-order-fixed-ammount", env = "MARKET_ORDER_FIXED_AMMOUNT", hide = true)]
    legacy_market_order_fixed_amount: Option<String>,

    /// Size limit orders at the smallest share count instead of the source size [default: false]
    #[arg(long, env = "MIN_SHARE_POSSIBLE", action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    min_share_possible: Option<bool>,

    /// CLOB API key; derived from the private key when unset
    #[arg(long, env = "CLOB_API_KEY", hide_env_values = true)]
    clob_api_key: Option<String>,

    #[arg(long, env = "CLOB_API_SECRET", hide_env_values = true)]
    clob_api_secret: Option<String>,

    #[arg(long, env = "CLOB_API_PASSPHRASE", hide_env_values = true)]
    clob_api_passphrase: Option<String>,

    /// 0 = EOA, 1 = Polymarket proxy, 2 = Gnosis safe
    #[arg(long, env = "SIGNATURE_TYPE", default_value_t = 1)]
    signature_type: u8,

    #[arg(long, env = "CHAIN_ID", default_value_t = POLYGON_CHAIN_ID)]
    chain_id: u64,

    #[arg(long, env = "CLOB_HOST", default_value = CLOB_URL)]
    clob_host: String,

    #[arg(long, env = "DATA_API_HOST", default_value = DATA_API_BASE)]
    data_api_host: String,

    /// Trades fetched per wallet on each poll
    #[arg(long, default_value_t = DEFAULT_FETCH_LIMIT)]
    fetch_limit: u32,
}

/// Outcome of validating [`CopierArgs`].
#[derive(Debug, Default)]
struct Validation {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Validation {
    fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl CopierArgs {
    fn order_kind(&self) -> Result<OrderKind> {
        match non_empty(&self.order_type) {
            None => bail!("ORDER_TYPE is not set, must be 'limit' or 'market'"),
            Some(raw) => raw
                .parse::<OrderKind>()
                .with_context(|| format!("Invalid ORDER_TYPE '{}', must be 'limit' or 'market'", raw)),
        }
    }

    fn limit_timeout_secs(&self) -> Result<u64> {
        match non_empty(&self.limit_order_timeout) {
            None => Ok(TradingConfig::default().limit_order_timeout_secs),
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .with_context(|| format!("LIMIT_ORDER_TIMEOUT '{}' is not a positive integer", raw)),
        }
    }

    /// Raw fixed amount; the current variable name wins over the legacy one.
    fn market_amount_raw(&self) -> Option<&str> {
        non_empty(&self.market_order_fixed_amount)
            .or_else(|| non_empty(&self.legacy_market_order_fixed_amount))
    }

    fn market_amount(&self) -> Result<Decimal> {
        match self.market_amount_raw() {
            None => Ok(TradingConfig::default().market_order_fixed_amount),
            Some(raw) => Decimal::from_str(raw)
                .ok()
                .filter(|amount| *amount > Decimal::ZERO)
                .with_context(|| {
                    format!("MARKET_ORDER_FIXED_AMOUNT '{}' is not a positive number", raw)
                }),
        }
    }

    /// Resolve the trading settings. Only the values the chosen order type
    /// uses must be valid; the others fall back to their defaults.
    fn trading_config(&self) -> Result<TradingConfig> {
        let defaults = TradingConfig::default();
        let order_type = self.order_kind()?;

        let (limit_order_timeout_secs, market_order_fixed_amount) = match order_type {
            OrderKind::Limit => (
                self.limit_timeout_secs()?,
                self.market_amount().unwrap_or(defaults.market_order_fixed_amount),
            ),
            OrderKind::Market => (
                self.limit_timeout_secs().unwrap_or(defaults.limit_order_timeout_secs),
                self.market_amount()?,
            ),
        };

        let config = TradingConfig {
            order_type,
            limit_order_timeout_secs,
            market_order_fixed_amount,
            min_share_possible: self.min_share_possible.unwrap_or(defaults.min_share_possible),
        };
        config.validate()?;
        Ok(config)
    }

    /// API credentials if all three parts are configured.
    fn api_creds(&self) -> Option<ApiCreds> {
        match (&self.clob_api_key, &self.clob_api_secret, &self.clob_api_passphrase) {
            (Some(key), Some(secret), Some(passphrase)) => {
                Some(ApiCreds::new(key.clone(), secret.clone(), passphrase.clone()))
            }
            _ => None,
        }
    }

    fn validate(&self) -> Validation {
        let mut v = Validation::default();

        match self.private_key.as_deref().map(str::trim) {
            None | Some("") => v.errors.push("PRIVATE_KEY is not set".to_string()),
            Some(key) => {
                if PrivateKeySigner::from_str(key.strip_prefix("0x").unwrap_or(key)).is_err() {
                    v.errors.push("PRIVATE_KEY is not a valid secp256k1 key".to_string());
                }
            }
        }

        match self.funder.as_deref().map(str::trim) {
            None | Some("") => v.errors.push("FUNDER_ADDRESS is not set".to_string()),
            Some(funder) => {
                if Address::from_str(funder).is_err() {
                    v.errors.push(format!("FUNDER_ADDRESS '{}' is not a valid address", funder));
                }
            }
        }

        match &self.wallets {
            None => v.errors.push("WALLETS_TXT_PATH is not set".to_string()),
            Some(path) if !path.is_file() => {
                v.errors.push(format!("Wallets file {} does not exist", path.display()))
            }
            Some(_) => {}
        }

        if SignatureType::try_from(self.signature_type).is_err() {
            v.errors.push(format!(
                "SIGNATURE_TYPE must be 0, 1 or 2, got {}",
                self.signature_type
            ));
        }

        let creds_set = [
            &self.clob_api_key,
            &self.clob_api_secret,
            &self.clob_api_passphrase,
        ]
        .iter()
        .filter(|c| c.is_some())
        .count();
        if creds_set != 0 && creds_set != 3 {
            v.errors.push(
                "CLOB_API_KEY, CLOB_API_SECRET and CLOB_API_PASSPHRASE must be set together"
                    .to_string(),
            );
        }

        match self.order_kind() {
            Err(e) => v.errors.push(e.to_string()),
            Ok(OrderKind::Limit) => {
                if non_empty(&self.limit_order_timeout).is_none() {
                    v.warnings.push("LIMIT_ORDER_TIMEOUT not set, defaulting to 10 seconds".to_string());
                }
                if let Err(e) = self.limit_timeout_secs() {
                    v.errors.push(e.to_string());
                }
            }
            Ok(OrderKind::Market) => {
                if self.market_amount_raw().is_none() {
                    v.warnings.push("MARKET_ORDER_FIXED_AMOUNT not set, defaulting to 1".to_string());
                } else if non_empty(&self.market_order_fixed_amount).is_none() {
                    v.warnings.push(
                        "MARKET_ORDER_FIXED_AMMOUNT is deprecated, rename it to MARKET_ORDER_FIXED_AMOUNT"
                            .to_string(),
                    );
                }
                if let Err(e) = self.market_amount() {
                    v.errors.push(e.to_string());
                }
            }
        }

        if self.min_share_possible.is_none() {
            v.warnings.push("MIN_SHARE_POSSIBLE not set, defaulting to false".to_string());
        }
        if creds_set == 0 {
            v.warnings
                .push("CLOB API credentials not set, they will be derived from the private key".to_string());
        }

        v
    }

    fn clob_settings(&self) -> Result<ClobSettings> {
        Ok(ClobSettings {
            host: self.clob_host.clone(),
            private_key: self.private_key.clone().context("PRIVATE_KEY is not set")?,
            funder: self.funder.clone().context("FUNDER_ADDRESS is not set")?,
            signature_type: SignatureType::try_from(self.signature_type)?,
            chain_id: self.chain_id,
            creds: self.api_creds(),
        })
    }

    fn bot_config(&self) -> Result<BotConfig> {
        Ok(BotConfig {
            wallets_path: self.wallets.clone().context("WALLETS_TXT_PATH is not set")?,
            fetch_limit: self.fetch_limit,
            trading_config: self.trading_config()?,
            ..BotConfig::default()
        })
    }
}

/// Trimmed value of an optional setting, treating blank as unset.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run(args) => {
            let validation = args.validate();
            for w in &validation.warnings {
                warn!("{}", w);
            }
            if !validation.is_valid() {
                for e in &validation.errors {
                    error!("{}", e);
                }
                bail!("Invalid configuration, run `polycopy check` for details");
            }

            let db = Database::new(&cli.database).await?;
            let feed = DataClient::with_base_url(args.data_api_host.clone())?;
            let clob = ClobClient::connect(args.clob_settings()?).await?;
            let bot_config = args.bot_config()?;

            println!("\n=== Polymarket Copy-Trading Bot ===");
            println!("Wallets file:  {}", bot_config.wallets_path.display());
            println!("Order type:    {}", bot_config.trading_config.order_type);
            println!("Signer:        {}", clob.address());
            println!("\nPress Ctrl+C to stop.\n");

            let bot = Bot::new(bot_config, db.clone(), feed, clob);

            let shutdown = CancellationToken::new();
            let ctrl_c = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received shutdown signal");
                    ctrl_c.cancel();
                }
            });

            if let Err(e) = bot.run(shutdown).await {
                error!(error = %e, "Bot error");
            }

            db.close().await;
            info!("Shutdown complete");
        }

        Commands::Check(args) => {
            let validation = args.validate();

            println!("\n=== Configuration ===\n");
            println!("Order Type:             {}", non_empty(&args.order_type).unwrap_or("<unset>"));
            println!(
                "Limit Order Timeout:    {}",
                non_empty(&args.limit_order_timeout).unwrap_or("10 (default)")
            );
            println!(
                "Market Order Amount:    {}",
                args.market_amount_raw().unwrap_or("1 (default)")
            );
            println!("Min Share Possible:     {}", args.min_share_possible.unwrap_or(false));
            println!("Signature Type:         {}", args.signature_type);
            println!("Chain ID:               {}", args.chain_id);
            println!("Database:               {}", cli.database);

            if !validation.warnings.is_empty() {
                println!("\nWarnings:");
                for w in &validation.warnings {
                    println!("  - {}", w);
                }
            }

            if !validation.is_valid() {
                println!("\nErrors:");
                for e in &validation.errors {
                    println!("  - {}", e);
                }
                bail!("{} configuration error(s)", validation.errors.len());
            }

            println!("\nConfiguration OK");
        }

        Commands::Status { wallet, trade } => {
            let db = Database::new(&cli.database).await?;

            if let Some(hash) = trade {
                match db.get_seen_trade(&hash).await? {
                    Some(seen) => {
                        println!("\nTransaction: {}", seen.transaction_hash);
                        println!("Wallet:      {}", seen.wallet);
                        println!("Seen at:     {}", seen.seen_at);
                        println!("Record:      {}", seen.data);
                    }
                    None => println!("Transaction {} has not been seen", hash),
                }
            } else if let Some(address) = wallet {
                let watched = db.is_watched(&address).await?;
                let seen = db.seen_trade_count(&address).await?;

                println!("\n=== Wallet {} ===", address);
                println!("Watched:     {}", if watched { "yes" } else { "no" });
                println!("Seen trades: {}", seen);
            } else {
                let stats = db.stats().await?;

                println!("\n=== Dedup Store ===");
                println!("Watched wallets: {}", stats.watched_wallets);
                println!("Seen trades:     {}", stats.seen_trades);
            }

            db.close().await;
        }

        Commands::Wallets { wallets } => {
            let registry = WalletRegistry::new(wallets);
            let listed = registry.reload().await;

            if listed.is_empty() {
                println!("No wallets listed in {}", registry.path().display());
                return Ok(());
            }

            let db = Database::new(&cli.database).await?;
            let watched = db.watched_addresses().await?;

            println!("\n{:<44} {:>8}", "ADDRESS", "WATCHED");
            println!("{}", "-".repeat(53));
            for address in &listed {
                let flag = if watched.contains(address) { "yes" } else { "no" };
                println!("{:<44} {:>8}", address, flag);
            }

            db.close().await;
        }
    }

    Ok(())
}
