mod memory;
mod repository;

pub use memory::*;
pub use repository::*;

use anyhow::Result;

use crate::domain::{AccountId, PointBalance, PointHistory, Points, TransactionKind};

/// SQL migration for initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// Storage for current balances.
///
/// Implementations provide no isolation of their own. Callers that mutate
/// balances must go through [`crate::application::PointService`], which
/// serializes access per account.
pub trait BalanceStore: Send + Sync {
    /// Current balance, or a zero record if the account has never been written.
    fn select_balance(&self, account_id: AccountId) -> Result<PointBalance>;

    /// Insert or replace the balance of an account.
    fn upsert_balance(&self, account_id: AccountId, point: Points) -> Result<PointBalance>;
}

/// Append-only storage for transaction history.
pub trait HistoryStore: Send + Sync {
    /// Append one record and return it with its assigned sequence number.
    fn append_history(
        &self,
        account_id: AccountId,
        amount: Points,
        kind: TransactionKind,
        timestamp_millis: i64,
    ) -> Result<PointHistory>;

    /// All records of an account, in no particular order.
    fn select_history(&self, account_id: AccountId) -> Result<Vec<PointHistory>>;
}
