use serde_json::Value;

use bail_in_core::presets;

pub fn run_presets() -> Result<Value, Box<dyn std::error::Error>> {
    let hierarchy = presets::default_hierarchy();
    let banks: Vec<Value> = presets::sample_banks()
        .iter()
        .map(|bank| {
            serde_json::json!({
                "name": bank.name,
                "total_assets": bank.total_assets,
                "buckets": presets::default_buckets(bank),
            })
        })
        .collect();

    Ok(serde_json::json!({
        "result": {
            "hierarchy": hierarchy,
            "banks": banks,
        }
    }))
}
