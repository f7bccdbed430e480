use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use bail_in_core::hierarchy::Hierarchy;
use bail_in_core::presets;
use bail_in_core::waterfall::scenario::{self, BailInInput, CompareBanksInput, LossSpec};

use crate::input;

/// Arguments for a single-bank bail-in scenario
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct ScenarioArgs {
    /// Path to JSON/TOML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Sample bank to use (Bank A, Bank B, Bank C)
    #[arg(long, default_value = "Bank A")]
    pub bank: String,

    /// Loss as a percentage of total assets
    #[arg(long, conflicts_with = "loss")]
    pub loss_pct: Option<Decimal>,

    /// Absolute loss amount
    #[arg(long)]
    pub loss: Option<Decimal>,

    /// Creditor class to exempt (repeatable)
    #[arg(long)]
    pub exempt: Vec<String>,

    /// Override the buffer as a share of total assets (0.08 = 8%)
    #[arg(long)]
    pub buffer_rate: Option<Decimal>,

    /// Creditor order below the buffer, comma separated
    #[arg(long, value_delimiter = ',')]
    pub order: Vec<String>,
}

/// Arguments for a multi-bank comparison
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct CompareArgs {
    /// Path to JSON/TOML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Sample banks to compare, comma separated (default: all)
    #[arg(long, value_delimiter = ',')]
    pub banks: Vec<String>,

    /// Loss as a percentage of each bank's total assets
    #[arg(long, default_value = "10")]
    pub loss_pct: Decimal,

    /// Creditor class to exempt (repeatable)
    #[arg(long)]
    pub exempt: Vec<String>,

    /// Override the buffer as a share of total assets (0.08 = 8%)
    #[arg(long)]
    pub buffer_rate: Option<Decimal>,
}

pub fn run_scenario(args: ScenarioArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let bail_in_input: BailInInput = match input::read_input(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => BailInInput {
            bank: presets::sample_bank(&args.bank)?,
            hierarchy: hierarchy_from_flags(&args.order)?,
            exempt: super::exempt_set(&args.exempt),
            loss: match (args.loss, args.loss_pct) {
                (Some(amount), _) => LossSpec::Amount(amount),
                (None, Some(pct)) => LossSpec::PercentOfAssets(pct),
                (None, None) => LossSpec::PercentOfAssets(dec!(10)),
            },
            buffer_rate: args.buffer_rate,
        },
    };
    let result = scenario::analyze_bail_in(&bail_in_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_compare(args: CompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let compare_input: CompareBanksInput = match input::read_input(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => {
            let banks = if args.banks.is_empty() {
                presets::sample_banks()
            } else {
                args.banks
                    .iter()
                    .map(|name| presets::sample_bank(name))
                    .collect::<Result<Vec<_>, _>>()?
            };
            CompareBanksInput {
                banks,
                hierarchy: presets::default_hierarchy(),
                exempt: super::exempt_set(&args.exempt),
                loss_pct: args.loss_pct,
                buffer_rate: args.buffer_rate,
            }
        }
    };
    let result = scenario::compare_banks(&compare_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Default hierarchy, or the buffer followed by a custom creditor order.
fn hierarchy_from_flags(order: &[String]) -> Result<Hierarchy, Box<dyn std::error::Error>> {
    if order.is_empty() {
        return Ok(presets::default_hierarchy());
    }
    let mut names = vec![presets::ASSET_ABSORPTION.to_string()];
    names.extend(
        order
            .iter()
            .map(|n| n.trim().to_string())
            .filter(|n| n != presets::ASSET_ABSORPTION),
    );
    Ok(Hierarchy::new(
        names,
        Some(presets::ASSET_ABSORPTION.to_string()),
    )?)
}
