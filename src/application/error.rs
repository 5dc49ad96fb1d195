use thiserror::Error;

use crate::domain::{AccountId, Points, TransactionKind, MAX_BALANCE};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Invalid amount for {kind}: {amount} is not an allowed denomination")]
    InvalidAmount { amount: Points, kind: TransactionKind },

    #[error(
        "Max balance exceeded for account {account_id}: balance {balance} + {amount} > {max}",
        max = MAX_BALANCE
    )]
    MaxBalanceExceeded {
        account_id: AccountId,
        balance: Points,
        amount: Points,
    },

    #[error("Insufficient balance in account {account_id}: balance {balance}, required {amount}")]
    InsufficientBalance {
        account_id: AccountId,
        balance: Points,
        amount: Points,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}
