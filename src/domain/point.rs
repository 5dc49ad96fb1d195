use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Points are whole integers. There is no fractional unit.
pub type Points = i64;

pub type AccountId = i64;

/// Upper bound for any account balance.
pub const MAX_BALANCE: Points = 100_000;

/// Current point balance of a single account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointBalance {
    pub account_id: AccountId,
    pub point: Points,
    pub updated_at: DateTime<Utc>,
}

impl PointBalance {
    pub fn new(account_id: AccountId, point: Points, updated_at: DateTime<Utc>) -> Self {
        Self {
            account_id,
            point,
            updated_at,
        }
    }

    /// The implicit record for an account that has never been charged.
    pub fn empty(account_id: AccountId) -> Self {
        Self::new(account_id, 0, Utc::now())
    }

    pub fn is_empty(&self) -> bool {
        self.point == 0
    }

    /// Balance after adding `amount`, or `None` if it would pass [`MAX_BALANCE`].
    pub fn checked_charge(&self, amount: Points) -> Option<Points> {
        self.point
            .checked_add(amount)
            .filter(|updated| *updated <= MAX_BALANCE)
    }

    /// Balance after removing `amount`, or `None` if it would go negative.
    pub fn checked_spend(&self, amount: Points) -> Option<Points> {
        if self.point < amount {
            return None;
        }
        Some(self.point - amount)
    }
}

/// Format a point amount with thousands separators.
/// Example: 100000 -> "100,000", 950 -> "950"
pub fn format_points(points: Points) -> String {
    let digits = points.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if points < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_balance() {
        let balance = PointBalance::empty(7);
        assert_eq!(balance.account_id, 7);
        assert_eq!(balance.point, 0);
        assert!(balance.is_empty());
    }

    #[test]
    fn test_checked_charge_respects_cap() {
        let balance = PointBalance::new(1, 95_000, Utc::now());
        assert_eq!(balance.checked_charge(5_000), Some(MAX_BALANCE));
        assert_eq!(balance.checked_charge(10_000), None);
    }

    #[test]
    fn test_checked_charge_overflow() {
        let balance = PointBalance::new(1, Points::MAX, Utc::now());
        assert_eq!(balance.checked_charge(1), None);
    }

    #[test]
    fn test_checked_spend() {
        let balance = PointBalance::new(1, 100, Utc::now());
        assert_eq!(balance.checked_spend(100), Some(0));
        assert_eq!(balance.checked_spend(300), None);
    }

    #[test]
    fn test_format_points() {
        assert_eq!(format_points(0), "0");
        assert_eq!(format_points(950), "950");
        assert_eq!(format_points(1000), "1,000");
        assert_eq!(format_points(100_000), "100,000");
        assert_eq!(format_points(1_234_567), "1,234,567");
        assert_eq!(format_points(-1000), "-1,000");
    }
}
