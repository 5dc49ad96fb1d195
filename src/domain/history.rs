use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use super::{AccountId, Points};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    /// Points added to the account
    Charge,
    /// Points spent from the account
    Use,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Charge => "CHARGE",
            TransactionKind::Use => "USE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CHARGE" => Some(TransactionKind::Charge),
            "USE" => Some(TransactionKind::Use),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single accepted charge or use. History records are immutable and
/// only ever appended by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointHistory {
    /// Sequence number assigned by the store on append
    pub id: i64,
    pub account_id: AccountId,
    /// Always positive; the direction comes from `kind`
    pub amount: Points,
    pub kind: TransactionKind,
    pub timestamp_millis: i64,
}

/// Sort most recent first. Records sharing a timestamp are ordered by
/// sequence number, later appends first.
pub fn sort_newest_first(records: &mut [PointHistory]) {
    records.sort_by_key(|r| (Reverse(r.timestamp_millis), Reverse(r.id)));
}

/// Return one page of `records`, newest first.
pub fn page_newest_first(
    mut records: Vec<PointHistory>,
    start_index: usize,
    page_size: usize,
) -> Vec<PointHistory> {
    sort_newest_first(&mut records);
    records
        .into_iter()
        .skip(start_index)
        .take(page_size)
        .collect()
}
