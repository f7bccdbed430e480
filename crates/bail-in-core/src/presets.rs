//! Default creditor hierarchy and sample bank balance sheets (EUR).

use rust_decimal_macros::dec;

use crate::bank::{BankBalanceSheet, DEFAULT_BUFFER_RATE};
use crate::error::BailInError;
use crate::hierarchy::{Bucket, Hierarchy};
use crate::types::*;
use crate::BailInResult;

/// The loss-absorption buffer, sized at 8% of total assets.
pub const ASSET_ABSORPTION: &str = "Asset Absorption";
pub const SINGLE_RESOLUTION_FUND: &str = "Single Resolution Fund";
pub const SECURED_CREDITORS: &str = "Secured Creditors";
pub const LARGE_DEPOSITORS: &str = "Depositors > €100k";
pub const SENIOR_UNSECURED: &str = "Senior Unsecured Creditors";
pub const SUBORDINATED_DEBT: &str = "Subordinated Debt";
pub const SHAREHOLDERS: &str = "Shareholders";

/// Creditor classes below the buffer, in default priority order.
pub const CREDITOR_CLASSES: [&str; 6] = [
    SINGLE_RESOLUTION_FUND,
    SECURED_CREDITORS,
    LARGE_DEPOSITORS,
    SENIOR_UNSECURED,
    SUBORDINATED_DEBT,
    SHAREHOLDERS,
];

/// Buffer first, then the creditor classes in default order.
pub fn default_hierarchy() -> Hierarchy {
    let order = std::iter::once(ASSET_ABSORPTION)
        .chain(CREDITOR_CLASSES)
        .map(str::to_string)
        .collect();
    Hierarchy::from_validated(order, Some(ASSET_ABSORPTION.to_string()))
}

/// Bucket records for `bank` under the default hierarchy.
pub fn default_buckets(bank: &BankBalanceSheet) -> Vec<Bucket> {
    bank.buckets(&default_hierarchy())
}

/// The three sample banks, each scaled from its total assets.
pub fn sample_banks() -> Vec<BankBalanceSheet> {
    vec![
        scaled_bank("Bank A", dec!(1_000_000_000)),
        scaled_bank("Bank B", dec!(750_000_000)),
        scaled_bank("Bank C", dec!(500_000_000)),
    ]
}

/// Look up a sample bank by name (case-insensitive).
pub fn sample_bank(name: &str) -> BailInResult<BankBalanceSheet> {
    sample_banks()
        .into_iter()
        .find(|b| b.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| {
            BailInError::invalid(
                "bank",
                format!("Unknown sample bank '{name}'. Expected one of: Bank A, Bank B, Bank C."),
            )
        })
}

/// All sample banks share the same balance-sheet mix.
fn scaled_bank(name: &str, total_assets: Money) -> BankBalanceSheet {
    BankBalanceSheet::new(name, total_assets)
        .with_capacity(ASSET_ABSORPTION, total_assets * DEFAULT_BUFFER_RATE)
        .with_capacity(SINGLE_RESOLUTION_FUND, total_assets * dec!(0.05))
        .with_capacity(SECURED_CREDITORS, total_assets * dec!(0.30))
        .with_capacity(LARGE_DEPOSITORS, total_assets * dec!(0.25))
        .with_capacity(SENIOR_UNSECURED, total_assets * dec!(0.20))
        .with_capacity(SUBORDINATED_DEBT, total_assets * dec!(0.10))
        .with_capacity(SHAREHOLDERS, total_assets * dec!(0.10))
}
