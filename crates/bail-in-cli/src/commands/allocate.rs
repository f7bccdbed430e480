use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use bail_in_core::hierarchy::Hierarchy;
use bail_in_core::waterfall::allocation::{self, BucketAllocation};
use bail_in_core::{with_metadata, Money};

use crate::input;

/// Arguments for a single loss allocation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct AllocateArgs {
    /// Path to JSON/TOML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Total loss to distribute
    #[arg(long)]
    pub loss: Option<Decimal>,

    /// Bucket as NAME=CAPACITY, repeated in priority order
    #[arg(long = "bucket", value_name = "NAME=CAPACITY")]
    pub buckets: Vec<String>,

    /// Name of the system buffer bucket (must be the first --bucket)
    #[arg(long)]
    pub system: Option<String>,

    /// Bucket to exempt from loss absorption (repeatable)
    #[arg(long)]
    pub exempt: Vec<String>,
}

/// File/stdin form of an allocation request.
#[derive(Debug, Deserialize)]
pub struct AllocateInput {
    pub total_loss: Money,
    pub capacities: BTreeMap<String, Money>,
    pub hierarchy: Hierarchy,
    #[serde(default)]
    pub exempt: BTreeSet<String>,
}

#[derive(Debug, Serialize)]
struct AllocateSummary {
    allocations: Vec<BucketAllocation>,
    total_absorbed: Money,
    uncovered_loss: Money,
}

pub fn run_allocate(args: AllocateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let alloc_input: AllocateInput = match input::read_input(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => from_flags(&args)?,
    };

    let start = Instant::now();
    let distribution = allocation::allocate_loss(
        alloc_input.total_loss,
        &alloc_input.capacities,
        &alloc_input.hierarchy,
        &alloc_input.exempt,
    )?;

    let total_absorbed = distribution.total_absorbed();
    let uncovered_loss = alloc_input.total_loss - total_absorbed;
    let mut warnings = Vec::new();
    if uncovered_loss > Decimal::ZERO {
        warnings.push(format!(
            "Loss exceeds available capacity; {uncovered_loss} remains uncovered."
        ));
    }

    let summary = AllocateSummary {
        allocations: distribution.allocations,
        total_absorbed,
        uncovered_loss,
    };

    let output = with_metadata(
        "Sequential loss allocation",
        &serde_json::json!({
            "total_loss": alloc_input.total_loss.to_string(),
            "order": alloc_input.hierarchy.names(),
            "system_bucket": alloc_input.hierarchy.system_bucket(),
            "exempt": alloc_input.exempt,
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        summary,
    );
    Ok(serde_json::to_value(output)?)
}

fn from_flags(args: &AllocateArgs) -> Result<AllocateInput, Box<dyn std::error::Error>> {
    let total_loss = args
        .loss
        .ok_or("--loss is required (or provide --input)")?;
    if args.buckets.is_empty() {
        return Err("at least one --bucket NAME=CAPACITY is required (or provide --input)".into());
    }

    let mut order = Vec::with_capacity(args.buckets.len());
    let mut capacities = BTreeMap::new();
    for entry in &args.buckets {
        let (name, capacity) = parse_bucket(entry)?;
        order.push(name.clone());
        capacities.insert(name, capacity);
    }

    Ok(AllocateInput {
        total_loss,
        capacities,
        hierarchy: Hierarchy::new(order, args.system.clone())?,
        exempt: super::exempt_set(&args.exempt),
    })
}

/// Parse `NAME=CAPACITY`. The split is on the last `=` so names may contain one.
fn parse_bucket(entry: &str) -> Result<(String, Money), Box<dyn std::error::Error>> {
    let (name, capacity) = entry
        .rsplit_once('=')
        .ok_or_else(|| format!("invalid --bucket '{entry}': expected NAME=CAPACITY"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid --bucket '{entry}': name is empty").into());
    }
    let capacity: Decimal = capacity
        .trim()
        .parse()
        .map_err(|e| format!("invalid capacity in --bucket '{entry}': {e}"))?;
    Ok((name.to_string(), capacity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_bucket() {
        assert_eq!(parse_bucket("A=100").unwrap(), ("A".to_string(), dec!(100)));
        assert_eq!(
            parse_bucket("Depositors > €100k = 250.5").unwrap(),
            ("Depositors > €100k".to_string(), dec!(250.5))
        );
        assert!(parse_bucket("A").is_err());
        assert!(parse_bucket("=5").is_err());
        assert!(parse_bucket("A=abc").is_err());
    }
}
