use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use log::{info, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::bank::{BankBalanceSheet, DEFAULT_BUFFER_RATE};
use crate::error::BailInError;
use crate::hierarchy::Hierarchy;
use crate::types::*;
use crate::waterfall::allocation::{allocate_loss, Distribution};
use crate::BailInResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// How the hypothetical loss is specified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossSpec {
    /// Absolute loss amount
    Amount(Money),
    /// Loss as a percentage of total assets (10 = 10%)
    PercentOfAssets(Decimal),
}

/// Input for a single-bank bail-in analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BailInInput {
    /// Balance sheet supplying total assets and bucket capacities
    pub bank: BankBalanceSheet,
    /// Absorption priority, system buffer first when present
    pub hierarchy: Hierarchy,
    /// Buckets shielded from any loss
    #[serde(default)]
    pub exempt: BTreeSet<String>,
    /// Loss to distribute
    pub loss: LossSpec,
    /// When set, the system bucket's capacity is always `total_assets *
    /// buffer_rate`. When absent, the balance-sheet figure is used and the
    /// default rate only fills a missing figure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_rate: Option<Rate>,
}

/// Input for running the same percentage loss across several banks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareBanksInput {
    pub banks: Vec<BankBalanceSheet>,
    pub hierarchy: Hierarchy,
    #[serde(default)]
    pub exempt: BTreeSet<String>,
    /// Loss as a percentage of each bank's total assets (10 = 10%)
    pub loss_pct: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_rate: Option<Rate>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Outcome for one bucket of the hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketOutcome {
    pub name: String,
    /// Capacity used for the run (after buffer derivation and clamping)
    pub capacity: Money,
    pub absorbed: Money,
    /// Capacity left untouched
    pub remaining_capacity: Money,
    /// absorbed / total loss
    pub share_of_loss: Rate,
    /// absorbed / capacity
    pub utilisation: Rate,
    pub exempt: bool,
    pub is_system: bool,
}

/// Result of a single-bank bail-in analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BailInOutput {
    pub bank: String,
    pub total_assets: Money,
    pub total_loss: Money,
    /// Capacity of the system buffer, if the hierarchy has one
    pub buffer_capacity: Option<Money>,
    /// Loss taken by the system buffer
    pub buffer_absorbed: Money,
    /// Loss passed on to the creditor classes after the buffer
    pub loss_after_buffer: Money,
    pub allocations: Vec<BucketOutcome>,
    pub total_absorbed: Money,
    /// Loss left once every non-exempt bucket is exhausted
    pub uncovered_loss: Money,
    /// Last bucket reached by the loss
    pub fulcrum_bucket: Option<String>,
    /// Number of buckets with a nonzero write-down
    pub buckets_hit: usize,
}

/// Result of a multi-bank comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareBanksOutput {
    pub results: Vec<BailInOutput>,
    /// Sum of uncovered loss across all banks
    pub total_uncovered_loss: Money,
    /// Bank with the largest uncovered loss, if any bank has one
    pub most_exposed_bank: Option<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run a bail-in loss waterfall for one bank.
///
/// Resolves the loss amount and buffer capacity from the balance sheet,
/// allocates the loss down the hierarchy and reports per-bucket write-downs
/// together with buffer usage, uncovered loss and the fulcrum bucket.
pub fn analyze_bail_in(input: &BailInInput) -> BailInResult<ComputationOutput<BailInOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_bank(&input.bank, "bank")?;
    validate_buffer_rate(input.buffer_rate)?;
    let total_loss = resolve_loss(&input.loss, &input.bank)?;

    let output = run_scenario(
        &input.bank,
        &input.hierarchy,
        &input.exempt,
        total_loss,
        input.buffer_rate,
        &mut warnings,
    )?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Bail-in Loss Waterfall (sequential absorption)",
        &serde_json::json!({
            "bank": input.bank.name,
            "loss": loss_label(&input.loss),
            "num_buckets": input.hierarchy.len(),
            "system_bucket": input.hierarchy.system_bucket(),
            "exempt": input.exempt,
            "buffer_rate": input.buffer_rate.map(|r| r.to_string()),
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Apply the same percentage-of-assets loss to several banks.
pub fn compare_banks(
    input: &CompareBanksInput,
) -> BailInResult<ComputationOutput<CompareBanksOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.banks.is_empty() {
        return Err(BailInError::invalid(
            "banks",
            "At least one bank is required.",
        ));
    }
    validate_buffer_rate(input.buffer_rate)?;

    let loss = LossSpec::PercentOfAssets(input.loss_pct);
    let mut results: Vec<BailInOutput> = Vec::with_capacity(input.banks.len());

    for (idx, bank) in input.banks.iter().enumerate() {
        validate_bank(bank, &format!("banks[{idx}]"))?;
        let total_loss = resolve_loss(&loss, bank)?;

        let mut bank_warnings: Vec<String> = Vec::new();
        let output = run_scenario(
            bank,
            &input.hierarchy,
            &input.exempt,
            total_loss,
            input.buffer_rate,
            &mut bank_warnings,
        )?;
        warnings.extend(bank_warnings.into_iter().map(|w| format!("{}: {w}", bank.name)));
        results.push(output);
    }

    let total_uncovered_loss: Money = results
        .iter()
        .try_fold(Decimal::ZERO, |acc, r| acc.checked_add(r.uncovered_loss))
        .ok_or_else(|| {
            BailInError::invalid("banks", "Total uncovered loss overflows the decimal range.")
        })?;
    let most_exposed_bank = results
        .iter()
        .filter(|r| r.uncovered_loss > Decimal::ZERO)
        .fold(None::<&BailInOutput>, |best, r| match best {
            Some(b) if b.uncovered_loss >= r.uncovered_loss => Some(b),
            _ => Some(r),
        })
        .map(|r| r.bank.clone());

    let output = CompareBanksOutput {
        results,
        total_uncovered_loss,
        most_exposed_bank,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Bail-in Loss Waterfall (multi-bank comparison)",
        &serde_json::json!({
            "banks": input.banks.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(),
            "loss_pct": input.loss_pct.to_string(),
            "num_buckets": input.hierarchy.len(),
            "exempt": input.exempt,
            "buffer_rate": input.buffer_rate.map(|r| r.to_string()),
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Convert a loss specification into an absolute amount for `bank`.
pub fn resolve_loss(loss: &LossSpec, bank: &BankBalanceSheet) -> BailInResult<Money> {
    match loss {
        LossSpec::Amount(amount) => {
            if *amount < Decimal::ZERO {
                return Err(BailInError::invalid(
                    "loss.amount",
                    "Loss amount cannot be negative.",
                ));
            }
            Ok(*amount)
        }
        LossSpec::PercentOfAssets(pct) => {
            if *pct < Decimal::ZERO || *pct > dec!(100) {
                return Err(BailInError::invalid(
                    "loss.percent_of_assets",
                    "Loss percentage must be between 0 and 100.",
                ));
            }
            bank.total_assets
                .checked_mul(*pct / dec!(100))
                .map(|loss| loss.normalize())
                .ok_or_else(|| {
                    BailInError::invalid(
                        "loss.percent_of_assets",
                        "Loss amount overflows the decimal range.",
                    )
                })
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn run_scenario(
    bank: &BankBalanceSheet,
    hierarchy: &Hierarchy,
    exempt: &BTreeSet<String>,
    total_loss: Money,
    buffer_rate: Option<Rate>,
    warnings: &mut Vec<String>,
) -> BailInResult<BailInOutput> {
    let capacities = resolve_capacities(bank, hierarchy, buffer_rate, warnings)?;

    for name in exempt {
        if hierarchy.is_system(name) {
            warnings.push(format!(
                "System bucket '{name}' cannot be exempted; exemption ignored."
            ));
        } else if !hierarchy.contains(name) {
            warnings.push(format!(
                "Exempt bucket '{name}' is not in the hierarchy."
            ));
        }
    }

    let distribution = allocate_loss(total_loss, &capacities, hierarchy, exempt)?;
    let output = summarise(bank, hierarchy, exempt, total_loss, &capacities, &distribution);

    if output.uncovered_loss > Decimal::ZERO {
        warnings.push(format!(
            "Loss exceeds available capacity; {} remains uncovered.",
            output.uncovered_loss
        ));
    }
    if total_loss > bank.total_assets {
        warnings.push("Loss exceeds total assets.".into());
    }

    info!(
        "{}: loss {} absorbed {} uncovered {}",
        bank.name, total_loss, output.total_absorbed, output.uncovered_loss
    );

    Ok(output)
}

/// Capacities for every hierarchy bucket: negative figures clamped, the
/// system buffer derived from total assets where required.
fn resolve_capacities(
    bank: &BankBalanceSheet,
    hierarchy: &Hierarchy,
    buffer_rate: Option<Rate>,
    warnings: &mut Vec<String>,
) -> BailInResult<BTreeMap<String, Money>> {
    let mut capacities: BTreeMap<String, Money> = BTreeMap::new();

    for name in hierarchy.names() {
        let capacity = match (hierarchy.is_system(name), buffer_rate, bank.capacities.get(name)) {
            (true, Some(rate), _) => bank.buffer_capacity(rate)?,
            (true, None, None) => bank.buffer_capacity(DEFAULT_BUFFER_RATE)?,
            (_, _, Some(c)) if *c < Decimal::ZERO => {
                warn!("{}: negative capacity for '{name}' clamped", bank.name);
                warnings.push(format!(
                    "Negative capacity {c} for '{name}' treated as zero."
                ));
                Decimal::ZERO
            }
            (_, _, Some(c)) => *c,
            (false, _, None) => Decimal::ZERO,
        };
        capacities.insert(name.clone(), capacity);
    }

    Ok(capacities)
}

fn summarise(
    bank: &BankBalanceSheet,
    hierarchy: &Hierarchy,
    exempt: &BTreeSet<String>,
    total_loss: Money,
    capacities: &BTreeMap<String, Money>,
    distribution: &Distribution,
) -> BailInOutput {
    let allocations: Vec<BucketOutcome> = distribution
        .iter()
        .map(|a| {
            let capacity = capacities.get(&a.name).copied().unwrap_or(Decimal::ZERO);
            let is_system = hierarchy.is_system(&a.name);
            BucketOutcome {
                name: a.name.clone(),
                capacity,
                absorbed: a.absorbed,
                remaining_capacity: capacity - a.absorbed,
                share_of_loss: safe_divide(a.absorbed, total_loss),
                utilisation: safe_divide(a.absorbed, capacity),
                exempt: !is_system && exempt.contains(&a.name),
                is_system,
            }
        })
        .collect();

    let buffer_capacity = hierarchy
        .system_bucket()
        .map(|s| capacities.get(s).copied().unwrap_or(Decimal::ZERO));
    let buffer_absorbed = hierarchy
        .system_bucket()
        .map(|s| distribution.absorbed(s))
        .unwrap_or(Decimal::ZERO);

    let total_absorbed = distribution.total_absorbed();
    let fulcrum_bucket = allocations
        .iter()
        .rev()
        .find(|o| o.absorbed > Decimal::ZERO)
        .map(|o| o.name.clone());
    let buckets_hit = allocations
        .iter()
        .filter(|o| o.absorbed > Decimal::ZERO)
        .count();

    BailInOutput {
        bank: bank.name.clone(),
        total_assets: bank.total_assets,
        total_loss,
        buffer_capacity,
        buffer_absorbed,
        loss_after_buffer: total_loss - buffer_absorbed,
        allocations,
        total_absorbed,
        uncovered_loss: total_loss - total_absorbed,
        fulcrum_bucket,
        buckets_hit,
    }
}

fn loss_label(loss: &LossSpec) -> String {
    match loss {
        LossSpec::Amount(a) => format!("amount {a}"),
        LossSpec::PercentOfAssets(p) => format!("{p}% of total assets"),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_bank(bank: &BankBalanceSheet, field: &str) -> BailInResult<()> {
    if bank.name.trim().is_empty() {
        return Err(BailInError::invalid(
            format!("{field}.name"),
            "Bank name cannot be empty.",
        ));
    }
    if bank.total_assets < Decimal::ZERO {
        return Err(BailInError::invalid(
            format!("{field}.total_assets"),
            "Total assets cannot be negative.",
        ));
    }
    Ok(())
}

fn validate_buffer_rate(rate: Option<Rate>) -> BailInResult<()> {
    if let Some(r) = rate {
        if r < Decimal::ZERO || r > Decimal::ONE {
            return Err(BailInError::invalid(
                "buffer_rate",
                "Buffer rate must be between 0 and 1.",
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // --- Helpers -------------------------------------------------------------

    fn hierarchy() -> Hierarchy {
        Hierarchy::new(
            vec![
                "Buffer".into(),
                "Equity".into(),
                "Subordinated".into(),
                "Senior".into(),
            ],
            Some("Buffer".into()),
        )
        .unwrap()
    }

    fn bank() -> BankBalanceSheet {
        BankBalanceSheet::new("Test Bank", dec!(1000))
            .with_capacity("Buffer", dec!(80))
            .with_capacity("Equity", dec!(50))
            .with_capacity("Subordinated", dec!(70))
            .with_capacity("Senior", dec!(300))
    }

    fn input(loss: LossSpec) -> BailInInput {
        BailInInput {
            bank: bank(),
            hierarchy: hierarchy(),
            exempt: BTreeSet::new(),
            loss,
            buffer_rate: None,
        }
    }

    fn outcome<'a>(out: &'a BailInOutput, name: &str) -> &'a BucketOutcome {
        out.allocations.iter().find(|o| o.name == name).unwrap()
    }

    // --- Test cases ----------------------------------------------------------

    #[test]
    fn test_percent_loss_runs_through_buffer_and_creditors() {
        // 15% of 1000 = 150: buffer 80, equity 50, subordinated 20
        let result = analyze_bail_in(&input(LossSpec::PercentOfAssets(dec!(15)))).unwrap();
        let out = &result.result;

        assert_eq!(out.total_loss, dec!(150));
        assert_eq!(out.buffer_capacity, Some(dec!(80)));
        assert_eq!(out.buffer_absorbed, dec!(80));
        assert_eq!(out.loss_after_buffer, dec!(70));
        assert_eq!(outcome(out, "Equity").absorbed, dec!(50));
        assert_eq!(outcome(out, "Subordinated").absorbed, dec!(20));
        assert_eq!(outcome(out, "Senior").absorbed, Decimal::ZERO);
        assert_eq!(out.uncovered_loss, Decimal::ZERO);
        assert_eq!(out.fulcrum_bucket, Some("Subordinated".into()));
        assert_eq!(out.buckets_hit, 3);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_shares_and_utilisation() {
        let result = analyze_bail_in(&input(LossSpec::Amount(dec!(100)))).unwrap();
        let out = &result.result;

        let buffer = outcome(out, "Buffer");
        assert_eq!(buffer.share_of_loss, dec!(0.8));
        assert_eq!(buffer.utilisation, Decimal::ONE);
        assert!(buffer.is_system);

        let equity = outcome(out, "Equity");
        assert_eq!(equity.absorbed, dec!(20));
        assert_eq!(equity.utilisation, dec!(0.4));
        assert_eq!(equity.remaining_capacity, dec!(30));
    }

    #[test]
    fn test_uncovered_loss_warns() {
        let result = analyze_bail_in(&input(LossSpec::Amount(dec!(600)))).unwrap();
        let out = &result.result;
        assert_eq!(out.total_absorbed, dec!(500));
        assert_eq!(out.uncovered_loss, dec!(100));
        assert_eq!(out.fulcrum_bucket, Some("Senior".into()));
        assert!(result.warnings.iter().any(|w| w.contains("uncovered")));
    }

    #[test]
    fn test_buffer_derived_when_missing() {
        let mut inp = input(LossSpec::Amount(dec!(10)));
        inp.bank.capacities.remove("Buffer");
        let out = analyze_bail_in(&inp).unwrap().result;
        // 8% of 1000
        assert_eq!(out.buffer_capacity, Some(dec!(80)));
    }

    #[test]
    fn test_explicit_buffer_rate_overrides_balance_sheet() {
        let mut inp = input(LossSpec::Amount(dec!(100)));
        inp.buffer_rate = Some(dec!(0.05));
        let out = analyze_bail_in(&inp).unwrap().result;
        assert_eq!(out.buffer_capacity, Some(dec!(50)));
        assert_eq!(outcome(&out, "Equity").absorbed, dec!(50));
    }

    #[test]
    fn test_exemption_warnings() {
        let mut inp = input(LossSpec::Amount(dec!(100)));
        inp.exempt = ["Buffer", "Equity", "Unknown"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let result = analyze_bail_in(&inp).unwrap();
        let out = &result.result;

        assert_eq!(outcome(out, "Buffer").absorbed, dec!(80));
        assert!(!outcome(out, "Buffer").exempt);
        assert_eq!(outcome(out, "Equity").absorbed, Decimal::ZERO);
        assert!(outcome(out, "Equity").exempt);
        assert_eq!(outcome(out, "Subordinated").absorbed, dec!(20));
        assert!(result.warnings.iter().any(|w| w.contains("cannot be exempted")));
        assert!(result.warnings.iter().any(|w| w.contains("'Unknown'")));
    }

    #[test]
    fn test_negative_capacity_clamped_with_warning() {
        let mut inp = input(LossSpec::Amount(dec!(100)));
        inp.bank.set_capacity("Equity", dec!(-10));
        let result = analyze_bail_in(&inp).unwrap();
        assert_eq!(outcome(&result.result, "Equity").capacity, Decimal::ZERO);
        assert_eq!(outcome(&result.result, "Subordinated").absorbed, dec!(20));
        assert!(result.warnings.iter().any(|w| w.contains("Negative capacity")));
    }

    #[test]
    fn test_zero_loss_has_no_fulcrum() {
        let out = analyze_bail_in(&input(LossSpec::Amount(Decimal::ZERO)))
            .unwrap()
            .result;
        assert_eq!(out.fulcrum_bucket, None);
        assert_eq!(out.buckets_hit, 0);
        assert!(out.allocations.iter().all(|o| o.share_of_loss.is_zero()));
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        assert!(analyze_bail_in(&input(LossSpec::Amount(dec!(-1)))).is_err());
        assert!(analyze_bail_in(&input(LossSpec::PercentOfAssets(dec!(101)))).is_err());

        let mut inp = input(LossSpec::Amount(dec!(1)));
        inp.buffer_rate = Some(dec!(1.5));
        assert!(analyze_bail_in(&inp).is_err());

        let mut inp = input(LossSpec::Amount(dec!(1)));
        inp.bank.total_assets = dec!(-5);
        assert!(analyze_bail_in(&inp).is_err());
    }

    #[test]
    fn test_compare_banks_identifies_most_exposed() {
        let small = BankBalanceSheet::new("Small", dec!(100)).with_capacity("Equity", dec!(5));
        let input = CompareBanksInput {
            banks: vec![bank(), small],
            hierarchy: hierarchy(),
            exempt: BTreeSet::new(),
            loss_pct: dec!(20),
            buffer_rate: None,
        };
        let result = compare_banks(&input).unwrap();
        let out = &result.result;

        assert_eq!(out.results.len(), 2);
        // Test Bank: loss 200, fully absorbed
        assert_eq!(out.results[0].uncovered_loss, Decimal::ZERO);
        // Small: loss 20, buffer 8 + equity 5 => 7 uncovered
        assert_eq!(out.results[1].uncovered_loss, dec!(7));
        assert_eq!(out.total_uncovered_loss, dec!(7));
        assert_eq!(out.most_exposed_bank, Some("Small".into()));
        assert!(result.warnings.iter().all(|w| w.starts_with("Small: ")));
    }

    #[test]
    fn test_compare_banks_requires_banks() {
        let input = CompareBanksInput {
            banks: vec![],
            hierarchy: hierarchy(),
            exempt: BTreeSet::new(),
            loss_pct: dec!(10),
            buffer_rate: None,
        };
        assert!(compare_banks(&input).is_err());
    }

    #[test]
    fn test_maximum_assets_do_not_overflow_percent_loss() {
        let mut inp = input(LossSpec::PercentOfAssets(dec!(50)));
        inp.bank = BankBalanceSheet::new("Huge", Decimal::MAX);
        let out = analyze_bail_in(&inp).unwrap().result;

        assert!(out.total_loss > Decimal::ZERO);
        assert!(out.total_loss < Decimal::MAX);
        assert_eq!(out.buffer_absorbed, out.buffer_capacity.unwrap());
        assert_eq!(out.total_loss - out.total_absorbed, out.uncovered_loss);
    }

    #[test]
    fn test_compare_banks_rejects_overflowing_total() {
        let input = CompareBanksInput {
            banks: vec![
                BankBalanceSheet::new("Huge A", Decimal::MAX),
                BankBalanceSheet::new("Huge B", Decimal::MAX),
            ],
            hierarchy: hierarchy(),
            exempt: BTreeSet::new(),
            loss_pct: dec!(100),
            buffer_rate: None,
        };
        match compare_banks(&input).unwrap_err() {
            BailInError::InvalidInput { field, .. } => assert_eq!(field, "banks"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_input_deserialises_from_json() {
        let json = r#"{
            "bank": {"name": "Json Bank", "total_assets": 1000,
                     "capacities": {"Buffer": "80", "Equity": 50}},
            "hierarchy": {"order": ["Buffer", "Equity"], "system_bucket": "Buffer"},
            "exempt": [],
            "loss": {"PercentOfAssets": 10}
        }"#;
        let inp: BailInInput = serde_json::from_str(json).unwrap();
        let out = analyze_bail_in(&inp).unwrap().result;
        assert_eq!(out.total_loss, dec!(100));
        assert_eq!(out.buffer_absorbed, dec!(80));
    }
}
