use std::collections::{BTreeMap, BTreeSet};

use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use bail_in_core::hierarchy::{self, Hierarchy};
use bail_in_core::presets;
use bail_in_core::waterfall::{allocation, scenario};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct AllocateRequest {
    total_loss: Decimal,
    capacities: BTreeMap<String, Decimal>,
    hierarchy: Hierarchy,
    #[serde(default)]
    exempt: BTreeSet<String>,
}

#[napi]
pub fn allocate_loss(input_json: String) -> NapiResult<String> {
    let input: AllocateRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = allocation::allocate_loss(
        input.total_loss,
        &input.capacities,
        &input.hierarchy,
        &input.exempt,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct MoveRequest {
    hierarchy: Hierarchy,
    bucket: String,
    target_index: u32,
}

#[napi]
pub fn move_bucket(input_json: String) -> NapiResult<String> {
    let input: MoveRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = hierarchy::move_bucket(&input.hierarchy, &input.bucket, input.target_index as usize)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_bail_in(input_json: String) -> NapiResult<String> {
    let input: scenario::BailInInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = scenario::analyze_bail_in(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compare_banks(input_json: String) -> NapiResult<String> {
    let input: scenario::CompareBanksInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = scenario::compare_banks(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn default_presets() -> NapiResult<String> {
    let output = serde_json::json!({
        "hierarchy": presets::default_hierarchy(),
        "banks": presets::sample_banks(),
    });
    serde_json::to_string(&output).map_err(to_napi_error)
}
