use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::{Points, TransactionKind};

/// Default denominations accepted for both charge and use.
pub const DEFAULT_DENOMINATIONS: [Points; 9] =
    [100, 200, 300, 1000, 3000, 5000, 10000, 20000, 30000];

/// A fixed set of permitted transaction amounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Denominations(BTreeSet<Points>);

impl Denominations {
    pub fn new(values: impl IntoIterator<Item = Points>) -> Self {
        Self(values.into_iter().collect())
    }

    pub fn contains(&self, amount: Points) -> bool {
        self.0.contains(&amount)
    }

    pub fn iter(&self) -> impl Iterator<Item = Points> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Denominations {
    fn default() -> Self {
        Self::new(DEFAULT_DENOMINATIONS)
    }
}

impl std::fmt::Display for Denominations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values: Vec<String> = self.iter().map(|v| v.to_string()).collect();
        write!(f, "{}", values.join(", "))
    }
}

/// Which amounts may be charged and which may be used. Pure data, no locking
/// required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountPolicy {
    pub charge: Denominations,
    pub spend: Denominations,
}

impl AmountPolicy {
    pub fn new(charge: Denominations, spend: Denominations) -> Self {
        Self { charge, spend }
    }

    /// One set shared by both operations.
    pub fn shared(denominations: Denominations) -> Self {
        Self {
            charge: denominations.clone(),
            spend: denominations,
        }
    }

    pub fn denominations(&self, kind: TransactionKind) -> &Denominations {
        match kind {
            TransactionKind::Charge => &self.charge,
            TransactionKind::Use => &self.spend,
        }
    }

    /// Only positive members of the operation's set are allowed, whatever
    /// the set itself contains.
    pub fn is_allowed(&self, kind: TransactionKind, amount: Points) -> bool {
        amount > 0 && self.denominations(kind).contains(amount)
    }
}
