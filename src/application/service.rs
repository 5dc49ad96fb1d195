use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, warn};

use crate::domain::{
    page_newest_first, AccountId, AmountPolicy, PointBalance, PointHistory, Points,
    TransactionKind,
};
use crate::storage::{BalanceStore, HistoryStore, MemoryStore, SqliteRepository};

use super::{LedgerError, LockRegistry};

/// Application service providing the point ledger operations.
/// This is the only path that mutates balances; stores shared with other
/// code stay consistent only if every writer goes through the same service.
pub struct PointService {
    balances: Arc<dyn BalanceStore>,
    histories: Arc<dyn HistoryStore>,
    locks: LockRegistry,
    policy: AmountPolicy,
}

impl PointService {
    /// Create a service over separate balance and history stores.
    pub fn new(
        balances: Arc<dyn BalanceStore>,
        histories: Arc<dyn HistoryStore>,
        policy: AmountPolicy,
    ) -> Self {
        Self {
            balances,
            histories,
            locks: LockRegistry::new(),
            policy,
        }
    }

    /// Create a service over one store that implements both traits.
    pub fn with_store<S>(store: Arc<S>, policy: AmountPolicy) -> Self
    where
        S: BalanceStore + HistoryStore + 'static,
    {
        Self::new(store.clone(), store, policy)
    }

    /// Service over a fresh in-memory store with the default denominations.
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), AmountPolicy::default())
    }

    /// Initialize a new database at the given path.
    pub fn init(
        database_path: impl AsRef<Path>,
        policy: AmountPolicy,
    ) -> Result<Self, LedgerError> {
        let repo = SqliteRepository::init(database_path)?;
        Ok(Self::with_store(Arc::new(repo), policy))
    }

    /// Connect to an existing database.
    pub fn connect(
        database_path: impl AsRef<Path>,
        policy: AmountPolicy,
    ) -> Result<Self, LedgerError> {
        let repo = SqliteRepository::connect(database_path)?;
        Ok(Self::with_store(Arc::new(repo), policy))
    }

    pub fn policy(&self) -> &AmountPolicy {
        &self.policy
    }

    /// Current balance of an account. Unknown accounts have a zero balance.
    pub fn query(&self, account_id: AccountId) -> Result<PointBalance, LedgerError> {
        let handle = self.locks.acquire(account_id);
        let _guard = handle.read();
        Ok(self.balances.select_balance(account_id)?)
    }

    /// Add `amount` points to an account.
    pub fn charge(
        &self,
        account_id: AccountId,
        amount: Points,
    ) -> Result<PointBalance, LedgerError> {
        self.mutate(account_id, amount, TransactionKind::Charge, |current| {
            current
                .checked_charge(amount)
                .ok_or(LedgerError::MaxBalanceExceeded {
                    account_id,
                    balance: current.point,
                    amount,
                })
        })
    }

    /// Spend `amount` points from an account.
    pub fn spend(
        &self,
        account_id: AccountId,
        amount: Points,
    ) -> Result<PointBalance, LedgerError> {
        self.mutate(account_id, amount, TransactionKind::Use, |current| {
            current
                .checked_spend(amount)
                .ok_or(LedgerError::InsufficientBalance {
                    account_id,
                    balance: current.point,
                    amount,
                })
        })
    }

    /// One page of an account's history, most recent first.
    pub fn history(
        &self,
        account_id: AccountId,
        start_index: usize,
        page_size: usize,
    ) -> Result<Vec<PointHistory>, LedgerError> {
        let records = self.histories.select_history(account_id)?;
        Ok(page_newest_first(records, start_index, page_size))
    }

    /// Validate, then read, update and record under the account's write lock.
    /// `apply` computes the new balance from the current one or rejects it.
    fn mutate<F>(
        &self,
        account_id: AccountId,
        amount: Points,
        kind: TransactionKind,
        apply: F,
    ) -> Result<PointBalance, LedgerError>
    where
        F: FnOnce(&PointBalance) -> Result<Points, LedgerError>,
    {
        if !self.policy.is_allowed(kind, amount) {
            warn!(account_id, amount, %kind, "rejected amount outside denominations");
            return Err(LedgerError::InvalidAmount { amount, kind });
        }

        let handle = self.locks.acquire(account_id);
        let _guard = handle.write();

        let current = self.balances.select_balance(account_id)?;
        let updated = apply(&current).inspect_err(|err| {
            warn!(account_id, amount, %kind, balance = current.point, "{}", err);
        })?;

        // History is appended only once the balance write has succeeded.
        let balance = self.balances.upsert_balance(account_id, updated)?;
        let appended = self.histories.append_history(
            account_id,
            amount,
            kind,
            Utc::now().timestamp_millis(),
        );
        let record = match appended {
            Ok(record) => record,
            Err(err) => {
                // Put the previous balance back so balance and history stay in step.
                if let Err(restore) = self.balances.upsert_balance(account_id, current.point) {
                    error!(
                        account_id,
                        balance = current.point,
                        %restore,
                        "failed to restore balance after history append failed"
                    );
                }
                return Err(err.into());
            }
        };

        debug!(
            account_id,
            amount,
            %kind,
            balance = balance.point,
            history_id = record.id,
            "applied point transaction"
        );
        Ok(balance)
    }
}
