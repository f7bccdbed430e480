use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::BailInError;
use crate::hierarchy::{Bucket, Hierarchy};
use crate::types::*;
use crate::BailInResult;

/// Share of total assets set aside as the loss-absorption buffer when the
/// balance sheet carries no explicit figure for it.
pub const DEFAULT_BUFFER_RATE: Rate = dec!(0.08);

/// Caller-owned balance-sheet figures for a single bank.
///
/// Capacities are keyed by bucket name. They are edited freely between
/// allocation runs and never touched by the allocation itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankBalanceSheet {
    /// Bank identifier, e.g. "Bank A"
    pub name: String,
    /// Total assets on the balance sheet
    pub total_assets: Money,
    /// Loss-absorbing capacity per bucket
    #[serde(default)]
    pub capacities: BTreeMap<String, Money>,
}

impl BankBalanceSheet {
    pub fn new(name: impl Into<String>, total_assets: Money) -> Self {
        Self {
            name: name.into(),
            total_assets,
            capacities: BTreeMap::new(),
        }
    }

    /// Builder-style capacity setter.
    pub fn with_capacity(mut self, bucket: impl Into<String>, capacity: Money) -> Self {
        self.capacities.insert(bucket.into(), capacity);
        self
    }

    /// Capacity of `bucket`, zero if the balance sheet has no figure for it.
    pub fn capacity(&self, bucket: &str) -> Money {
        self.capacities.get(bucket).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn set_capacity(&mut self, bucket: impl Into<String>, capacity: Money) {
        self.capacities.insert(bucket.into(), capacity);
    }

    /// Sum of all capacities, negative figures counted as zero.
    pub fn total_capacity(&self) -> BailInResult<Money> {
        self.capacities
            .values()
            .copied()
            .map(non_negative)
            .try_fold(Decimal::ZERO, |acc, c| acc.checked_add(c))
            .ok_or_else(|| {
                BailInError::invalid("capacities", "Total capacity overflows the decimal range.")
            })
    }

    /// Buffer capacity implied by `rate` of total assets.
    pub fn buffer_capacity(&self, rate: Rate) -> BailInResult<Money> {
        non_negative(self.total_assets)
            .checked_mul(rate)
            .ok_or_else(|| {
                BailInError::invalid("buffer_rate", "Buffer capacity overflows the decimal range.")
            })
    }

    /// Bucket records for every entry of `hierarchy`.
    pub fn buckets(&self, hierarchy: &Hierarchy) -> Vec<Bucket> {
        hierarchy.buckets(&self.capacities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_defaults_to_zero() {
        let bank = BankBalanceSheet::new("Bank X", dec!(1000)).with_capacity("Equity", dec!(50));
        assert_eq!(bank.capacity("Equity"), dec!(50));
        assert_eq!(bank.capacity("Deposits"), Decimal::ZERO);
    }

    #[test]
    fn test_set_capacity_overwrites() {
        let mut bank = BankBalanceSheet::new("Bank X", dec!(1000)).with_capacity("Equity", dec!(50));
        bank.set_capacity("Equity", dec!(75));
        assert_eq!(bank.capacity("Equity"), dec!(75));
    }

    #[test]
    fn test_total_capacity_ignores_negative() {
        let bank = BankBalanceSheet::new("Bank X", dec!(1000))
            .with_capacity("A", dec!(100))
            .with_capacity("B", dec!(-40))
            .with_capacity("C", dec!(25));
        assert_eq!(bank.total_capacity().unwrap(), dec!(125));
    }

    #[test]
    fn test_buffer_capacity_is_share_of_assets() {
        let bank = BankBalanceSheet::new("Bank X", dec!(1_000_000_000));
        assert_eq!(bank.buffer_capacity(DEFAULT_BUFFER_RATE).unwrap(), dec!(80_000_000));
    }

    #[test]
    fn test_capacity_overflow_is_an_error() {
        let bank = BankBalanceSheet::new("Huge", Decimal::MAX)
            .with_capacity("A", Decimal::MAX)
            .with_capacity("B", Decimal::MAX);
        assert!(bank.total_capacity().is_err());
        assert!(bank.buffer_capacity(dec!(2)).is_err());
        assert_eq!(bank.buffer_capacity(Decimal::ONE).unwrap(), Decimal::MAX);
    }

    #[test]
    fn test_buckets_follow_hierarchy() {
        let bank = BankBalanceSheet::new("Bank X", dec!(1000))
            .with_capacity("Buffer", dec!(80))
            .with_capacity("Equity", dec!(50));
        let h = Hierarchy::new(
            vec!["Buffer".into(), "Equity".into(), "Senior".into()],
            Some("Buffer".into()),
        )
        .unwrap();
        let buckets = bank.buckets(&h);
        assert_eq!(buckets.len(), 3);
        assert!(buckets[0].is_system);
        assert_eq!(buckets[2].capacity, Decimal::ZERO);
    }
}
