pub mod allocate;
pub mod hierarchy;
pub mod presets;
pub mod scenario;

use std::collections::BTreeSet;

/// Collect repeated `--exempt` flags into an exemption set.
pub(crate) fn exempt_set(names: &[String]) -> BTreeSet<String> {
    names
        .iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}
