//! Dedup store: which wallets have been baselined and which trades were seen.
//!
//! Two tables back the copier:
//! - `watched_wallets`: wallets whose history has been imported once
//! - `seen_trades`: every transaction hash ever observed, baseline or live
//!
//! The poller is the only writer. Everything it writes for one wallet goes
//! through a [`WalletPass`], which commits as a single transaction so a crash
//! cannot leave a wallet marked watched with half of its trades recorded.

use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Executor, Sqlite, SqlitePool, Transaction};

/// Database connection pool for the dedup tables.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

/// Stored seen-trade record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SeenTrade {
    pub transaction_hash: String,
    pub wallet: String,
    pub data: String,
    pub seen_at: String,
}

/// Aggregate counts for the `status` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreStats {
    pub watched_wallets: i64,
    pub seen_trades: i64,
}

impl Database {
    /// Open (or create) the database at `database_url` and run migrations.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Private in-memory database, used by tests.
    ///
    /// Every connection to `:memory:` is a separate database, so the pool is
    /// capped at one connection.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS watched_wallets (
                address TEXT PRIMARY KEY,
                first_seen_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS seen_trades (
                transaction_hash TEXT PRIMARY KEY,
                wallet TEXT NOT NULL,
                data TEXT NOT NULL,
                seen_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_seen_trades_wallet ON seen_trades(wallet)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ==================== Wallet passes ====================

    /// Start the transaction that holds one wallet's writes.
    pub async fn begin_pass(&self) -> Result<WalletPass> {
        let tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin wallet transaction")?;
        Ok(WalletPass { tx })
    }

    // ==================== Watched wallets ====================

    pub async fn is_watched(&self, address: &str) -> Result<bool> {
        is_watched(&self.pool, address).await
    }

    #[cfg(test)]
    pub async fn mark_watched(&self, address: &str) -> Result<()> {
        mark_watched(&self.pool, address).await
    }

    /// All baselined wallet addresses.
    pub async fn watched_addresses(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT address FROM watched_wallets ORDER BY first_seen_at, address")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|(a,)| a).collect())
    }

    // ==================== Seen trades ====================

    #[cfg(test)]
    pub async fn is_seen(&self, transaction_hash: &str) -> Result<bool> {
        is_seen(&self.pool, transaction_hash).await
    }

    /// Record a trade as seen. Inserting a known hash is a no-op.
    #[cfg(test)]
    pub async fn mark_seen(&self, transaction_hash: &str, wallet: &str, payload: &str) -> Result<()> {
        mark_seen(&self.pool, transaction_hash, wallet, payload).await
    }

    /// Get a stored seen trade by hash.
    pub async fn get_seen_trade(&self, transaction_hash: &str) -> Result<Option<SeenTrade>> {
        let row = sqlx::query_as::<_, SeenTrade>(
            "SELECT transaction_hash, wallet, data, seen_at FROM seen_trades WHERE transaction_hash = ?",
        )
        .bind(transaction_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Count seen trades for one wallet.
    pub async fn seen_trade_count(&self, wallet: &str) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM seen_trades WHERE wallet = ?")
            .bind(wallet)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        let (watched_wallets,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM watched_wallets")
            .fetch_one(&self.pool)
            .await?;
        let (seen_trades,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM seen_trades")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreStats {
            watched_wallets,
            seen_trades,
        })
    }

    /// Close the pool, flushing the WAL.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Writes for a single wallet, applied atomically on [`WalletPass::commit`].
///
/// Dropping a pass without committing rolls it back.
pub struct WalletPass {
    tx: Transaction<'static, Sqlite>,
}

impl WalletPass {
    pub async fn is_watched(&mut self, address: &str) -> Result<bool> {
        is_watched(&mut *self.tx, address).await
    }

    pub async fn mark_watched(&mut self, address: &str) -> Result<()> {
        mark_watched(&mut *self.tx, address).await
    }

    pub async fn is_seen(&mut self, transaction_hash: &str) -> Result<bool> {
        is_seen(&mut *self.tx, transaction_hash).await
    }

    pub async fn mark_seen(&mut self, transaction_hash: &str, wallet: &str, payload: &str) -> Result<()> {
        mark_seen(&mut *self.tx, transaction_hash, wallet, payload).await
    }

    pub async fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .await
            .context("Failed to commit wallet transaction")
    }
}

async fn is_watched<'e, E>(executor: E, address: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM watched_wallets WHERE address = ?")
        .bind(address)
        .fetch_optional(executor)
        .await?;

    Ok(result.is_some())
}

async fn mark_watched<'e, E>(executor: E, address: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT OR IGNORE INTO watched_wallets (address) VALUES (?)")
        .bind(address)
        .execute(executor)
        .await?;

    Ok(())
}

async fn is_seen<'e, E>(executor: E, transaction_hash: &str) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM seen_trades WHERE transaction_hash = ?")
        .bind(transaction_hash)
        .fetch_optional(executor)
        .await?;

    Ok(result.is_some())
}

async fn mark_seen<'e, E>(executor: E, transaction_hash: &str, wallet: &str, payload: &str) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("INSERT OR IGNORE INTO seen_trades (transaction_hash, wallet, data) VALUES (?, ?, ?)")
        .bind(transaction_hash)
        .bind(wallet)
        .bind(payload)
        .execute(executor)
        .await?;

    Ok(())
}
