use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Utc;

use crate::domain::{AccountId, PointBalance, PointHistory, Points, TransactionKind};

use super::{BalanceStore, HistoryStore};

#[derive(Debug, Default)]
struct HistoryLog {
    next_id: i64,
    records: Vec<PointHistory>,
}

/// In-process implementation of both stores.
///
/// Each call is individually thread-safe but calls are not isolated from
/// each other: a read followed by a write can interleave with another
/// caller's read and write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    balances: Mutex<HashMap<AccountId, PointBalance>>,
    history: Mutex<HistoryLog>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `latency` on every call, outside the store's own mutexes.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of history records across all accounts.
    pub fn history_len(&self) -> Result<usize> {
        Ok(self.history()?.records.len())
    }

    fn throttle(&self) {
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }
    }

    fn balances(&self) -> Result<MutexGuard<'_, HashMap<AccountId, PointBalance>>> {
        self.balances
            .lock()
            .map_err(|_| anyhow!("balance table mutex poisoned"))
    }

    fn history(&self) -> Result<MutexGuard<'_, HistoryLog>> {
        self.history
            .lock()
            .map_err(|_| anyhow!("history table mutex poisoned"))
    }
}

impl BalanceStore for MemoryStore {
    fn select_balance(&self, account_id: AccountId) -> Result<PointBalance> {
        self.throttle();
        let balances = self.balances()?;
        Ok(balances
            .get(&account_id)
            .cloned()
            .unwrap_or_else(|| PointBalance::empty(account_id)))
    }

    fn upsert_balance(&self, account_id: AccountId, point: Points) -> Result<PointBalance> {
        self.throttle();
        let balance = PointBalance::new(account_id, point, Utc::now());
        self.balances()?.insert(account_id, balance.clone());
        Ok(balance)
    }
}

impl HistoryStore for MemoryStore {
    fn append_history(
        &self,
        account_id: AccountId,
        amount: Points,
        kind: TransactionKind,
        timestamp_millis: i64,
    ) -> Result<PointHistory> {
        self.throttle();
        let mut log = self.history()?;
        log.next_id += 1;
        let record = PointHistory {
            id: log.next_id,
            account_id,
            amount,
            kind,
            timestamp_millis,
        };
        log.records.push(record.clone());
        Ok(record)
    }

    fn select_history(&self, account_id: AccountId) -> Result<Vec<PointHistory>> {
        self.throttle();
        Ok(self
            .history()?
            .records
            .iter()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_account_is_zero() {
        let store = MemoryStore::new();
        let balance = store.select_balance(42).unwrap();
        assert_eq!(balance.account_id, 42);
        assert_eq!(balance.point, 0);
    }

    #[test]
    fn test_upsert_replaces_balance() {
        let store = MemoryStore::new();
        store.upsert_balance(1, 500).unwrap();
        store.upsert_balance(1, 200).unwrap();
        assert_eq!(store.select_balance(1).unwrap().point, 200);
    }

    #[test]
    fn test_history_sequence_and_filter() {
        let store = MemoryStore::new();
        let first = store
            .append_history(1, 100, TransactionKind::Charge, 10)
            .unwrap();
        let second = store.append_history(2, 200, TransactionKind::Use, 11).unwrap();
        let third = store
            .append_history(1, 300, TransactionKind::Use, 12)
            .unwrap();

        assert_eq!((first.id, second.id, third.id), (1, 2, 3));
        assert_eq!(store.history_len().unwrap(), 3);

        let account_one = store.select_history(1).unwrap();
        assert_eq!(account_one.len(), 2);
        assert!(account_one.iter().all(|r| r.account_id == 1));
    }
}
