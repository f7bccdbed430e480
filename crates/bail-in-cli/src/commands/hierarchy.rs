use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use bail_in_core::hierarchy::{self, Hierarchy};

use crate::input;

/// Arguments for reordering the creditor hierarchy
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct MoveArgs {
    /// Path to JSON/TOML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Current order, comma separated
    #[arg(long, value_delimiter = ',')]
    pub order: Vec<String>,

    /// System buffer bucket, pinned at index 0
    #[arg(long)]
    pub system: Option<String>,

    /// Bucket to move
    #[arg(long)]
    pub bucket: Option<String>,

    /// Zero-based target position
    #[arg(long)]
    pub to: Option<usize>,
}

/// File/stdin form of a move request.
#[derive(Debug, Deserialize)]
pub struct MoveInput {
    pub hierarchy: Hierarchy,
    pub bucket: String,
    pub target_index: usize,
}

pub fn run_move(args: MoveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let move_input: MoveInput = match input::read_input(args.input.as_deref())? {
        Some(parsed) => parsed,
        None => MoveInput {
            hierarchy: Hierarchy::new(
                args.order.iter().map(|n| n.trim().to_string()).collect(),
                args.system.clone(),
            )?,
            bucket: args
                .bucket
                .clone()
                .ok_or("--bucket is required (or provide --input)")?,
            target_index: args.to.ok_or("--to is required (or provide --input)")?,
        },
    };

    let from = move_input.hierarchy.position(&move_input.bucket);
    let moved = hierarchy::move_bucket(
        &move_input.hierarchy,
        &move_input.bucket,
        move_input.target_index,
    )?;
    let to = moved.position(&move_input.bucket);

    let mut warnings = Vec::new();
    if moved.is_system(&move_input.bucket) {
        warnings.push(format!(
            "'{}' is the system bucket and cannot be moved.",
            move_input.bucket
        ));
    } else if to != Some(move_input.target_index) {
        warnings.push(format!(
            "Requested index {} adjusted to {}.",
            move_input.target_index,
            to.unwrap_or_default()
        ));
    }

    Ok(serde_json::json!({
        "result": {
            "order": moved.names(),
            "system_bucket": moved.system_bucket(),
            "bucket": move_input.bucket,
            "from_index": from,
            "to_index": to,
        },
        "warnings": warnings,
    }))
}
