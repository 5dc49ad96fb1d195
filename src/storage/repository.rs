use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tokio::runtime::Runtime;
use tracing::debug;

use crate::domain::{AccountId, PointBalance, PointHistory, Points, TransactionKind};

use super::{BalanceStore, HistoryStore, MIGRATION_001_INITIAL};

const MAX_CONNECTIONS: u32 = 4;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed balance and history store.
///
/// The store contract is synchronous, so the repository owns a small tokio
/// runtime and blocks on each query. It must not be called from inside
/// another async runtime.
pub struct SqliteRepository {
    pool: SqlitePool,
    runtime: Runtime,
}

impl SqliteRepository {
    fn runtime() -> Result<Runtime> {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("pointledger-sqlite")
            .enable_all()
            .build()
            .context("Failed to build tokio runtime for SQLite store")
    }

    fn open(path: &Path, create: bool) -> Result<Self> {
        let runtime = Self::runtime()?;
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = runtime
            .block_on(
                SqlitePoolOptions::new()
                    .max_connections(MAX_CONNECTIONS)
                    .connect_with(options),
            )
            .with_context(|| format!("Failed to connect to database {}", path.display()))?;

        debug!(path = %path.display(), "opened sqlite store");
        Ok(Self { pool, runtime })
    }

    /// Connect to an existing database file.
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path.as_ref(), false)
    }

    /// Create the database file if needed and run migrations.
    pub fn init(path: impl AsRef<Path>) -> Result<Self> {
        let repo = Self::open(path.as_ref(), true)?;
        repo.migrate()?;
        Ok(repo)
    }

    /// Run database migrations.
    pub fn migrate(&self) -> Result<()> {
        self.runtime
            .block_on(sqlx::query(MIGRATION_001_INITIAL).execute(&self.pool))
            .context("Failed to run migration 001")?;
        Ok(())
    }

    fn row_to_balance(row: &SqliteRow) -> Result<PointBalance> {
        let updated_at_str: String = row.get("updated_at");

        Ok(PointBalance {
            account_id: row.get("id"),
            point: row.get("point"),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .context("Invalid updated_at timestamp")?
                .with_timezone(&Utc),
        })
    }

    fn row_to_history(row: &SqliteRow) -> Result<PointHistory> {
        let kind_str: String = row.get("kind");

        Ok(PointHistory {
            id: row.get("id"),
            account_id: row.get("user_id"),
            amount: row.get("amount"),
            kind: TransactionKind::from_str(&kind_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction kind: {}", kind_str))?,
            timestamp_millis: row.get("updated_millis"),
        })
    }
}

impl Drop for SqliteRepository {
    fn drop(&mut self) {
        self.runtime.block_on(self.pool.close());
    }
}

impl BalanceStore for SqliteRepository {
    fn select_balance(&self, account_id: AccountId) -> Result<PointBalance> {
        let row = self
            .runtime
            .block_on(
                sqlx::query("SELECT id, point, updated_at FROM user_points WHERE id = ?")
                    .bind(account_id)
                    .fetch_optional(&self.pool),
            )
            .context("Failed to fetch balance")?;

        match row {
            Some(row) => Self::row_to_balance(&row),
            None => Ok(PointBalance::empty(account_id)),
        }
    }

    fn upsert_balance(&self, account_id: AccountId, point: Points) -> Result<PointBalance> {
        let row = self
            .runtime
            .block_on(
                sqlx::query(
                    r#"
                    INSERT INTO user_points (id, point, updated_at)
                    VALUES (?, ?, ?)
                    ON CONFLICT (id) DO UPDATE SET
                        point = excluded.point,
                        updated_at = excluded.updated_at
                    RETURNING id, point, updated_at
                    "#,
                )
                .bind(account_id)
                .bind(point)
                .bind(Utc::now().to_rfc3339())
                .fetch_one(&self.pool),
            )
            .context("Failed to save balance")?;

        Self::row_to_balance(&row)
    }
}

impl HistoryStore for SqliteRepository {
    fn append_history(
        &self,
        account_id: AccountId,
        amount: Points,
        kind: TransactionKind,
        timestamp_millis: i64,
    ) -> Result<PointHistory> {
        let row = self
            .runtime
            .block_on(
                sqlx::query(
                    r#"
                    INSERT INTO point_histories (user_id, amount, kind, updated_millis)
                    VALUES (?, ?, ?, ?)
                    RETURNING id, user_id, amount, kind, updated_millis
                    "#,
                )
                .bind(account_id)
                .bind(amount)
                .bind(kind.as_str())
                .bind(timestamp_millis)
                .fetch_one(&self.pool),
            )
            .context("Failed to save history record")?;

        Self::row_to_history(&row)
    }

    fn select_history(&self, account_id: AccountId) -> Result<Vec<PointHistory>> {
        let rows = self
            .runtime
            .block_on(
                sqlx::query(
                    r#"
                    SELECT id, user_id, amount, kind, updated_millis
                    FROM point_histories
                    WHERE user_id = ?
                    "#,
                )
                .bind(account_id)
                .fetch_all(&self.pool),
            )
            .context("Failed to list history")?;

        rows.iter().map(Self::row_to_history).collect()
    }
}
