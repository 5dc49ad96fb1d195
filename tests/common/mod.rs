// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use pointledger::domain::{
    AccountId, AmountPolicy, PointBalance, PointHistory, Points, TransactionKind,
};
use pointledger::storage::{BalanceStore, HistoryStore, MemoryStore};
use pointledger::PointService;
use tempfile::TempDir;

/// Helper to create a service over a fresh in-memory store
pub fn memory_service() -> (PointService, Arc<CountingStore>) {
    let store = Arc::new(CountingStore::new(MemoryStore::new()));
    let service = PointService::with_store(store.clone(), AmountPolicy::default());
    (service, store)
}

/// Helper to create a test service with a temporary database
pub fn sqlite_service() -> Result<(PointService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = PointService::init(&db_path, AmountPolicy::default())?;
    Ok((service, temp_dir))
}

/// Bring an account to `target` with allowed charges of 10000 and 100.
pub fn fund(service: &PointService, id: AccountId, target: Points) -> Result<()> {
    let mut remaining = target;
    while remaining >= 10000 {
        service.charge(id, 10000)?;
        remaining -= 10000;
    }
    while remaining >= 100 {
        service.charge(id, 100)?;
        remaining -= 100;
    }
    assert_eq!(remaining, 0, "target must be a multiple of 100");
    Ok(())
}

/// Store wrapper that counts every call, for checking that rejected
/// operations never reach storage.
pub struct CountingStore {
    inner: MemoryStore,
    balance_calls: AtomicUsize,
    history_calls: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            balance_calls: AtomicUsize::new(0),
            history_calls: AtomicUsize::new(0),
        }
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.balance_calls() + self.history_calls()
    }

    /// Write a history record directly, bypassing the service.
    pub fn seed_history(
        &self,
        id: AccountId,
        amount: Points,
        kind: TransactionKind,
        timestamp_millis: i64,
    ) -> Result<PointHistory> {
        self.inner.append_history(id, amount, kind, timestamp_millis)
    }
}

impl BalanceStore for CountingStore {
    fn select_balance(&self, account_id: AccountId) -> Result<PointBalance> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.select_balance(account_id)
    }

    fn upsert_balance(&self, account_id: AccountId, point: Points) -> Result<PointBalance> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.upsert_balance(account_id, point)
    }
}

impl HistoryStore for CountingStore {
    fn append_history(
        &self,
        account_id: AccountId,
        amount: Points,
        kind: TransactionKind,
        timestamp_millis: i64,
    ) -> Result<PointHistory> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .append_history(account_id, amount, kind, timestamp_millis)
    }

    fn select_history(&self, account_id: AccountId) -> Result<Vec<PointHistory>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.select_history(account_id)
    }
}
