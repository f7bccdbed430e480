use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BailInError;
use crate::hierarchy::{Bucket, Hierarchy};
use crate::types::*;
use crate::BailInResult;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Loss absorbed by a single bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketAllocation {
    /// Bucket identifier
    pub name: String,
    /// Loss written down against this bucket
    pub absorbed: Money,
}

/// Per-bucket loss distribution, one entry per hierarchy bucket in
/// hierarchy order.
///
/// Loss left over once every bucket is exhausted is not recorded here;
/// derive it as `total_loss - total_absorbed()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub allocations: Vec<BucketAllocation>,
}

impl Distribution {
    /// Absorbed amount for `name`, or `None` if the bucket is not part of
    /// the distribution.
    pub fn get(&self, name: &str) -> Option<Money> {
        self.allocations
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.absorbed)
    }

    /// Absorbed amount for `name`, zero for unknown buckets.
    pub fn absorbed(&self, name: &str) -> Money {
        self.get(name).unwrap_or(Decimal::ZERO)
    }

    pub fn total_absorbed(&self) -> Money {
        self.allocations.iter().map(|a| a.absorbed).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BucketAllocation> {
        self.allocations.iter()
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    /// Name-keyed view of the distribution.
    pub fn to_map(&self) -> BTreeMap<String, Money> {
        self.allocations
            .iter()
            .map(|a| (a.name.clone(), a.absorbed))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Distribute `total_loss` down the hierarchy.
///
/// Walks the hierarchy once, front to back. Each bucket that is not exempt
/// absorbs as much of the remaining loss as its capacity allows; the walk
/// stops as soon as nothing remains. The system bucket, when present, sits
/// at the front and ignores exemptions.
///
/// Buckets missing from `capacities` have zero capacity and negative
/// capacities are treated as zero. A negative `total_loss` is rejected.
pub fn allocate_loss(
    total_loss: Money,
    capacities: &BTreeMap<String, Money>,
    hierarchy: &Hierarchy,
    exempt: &BTreeSet<String>,
) -> BailInResult<Distribution> {
    if total_loss < Decimal::ZERO {
        return Err(BailInError::invalid(
            "total_loss",
            "Total loss cannot be negative.",
        ));
    }

    let mut allocations: Vec<BucketAllocation> = hierarchy
        .names()
        .iter()
        .map(|name| BucketAllocation {
            name: name.clone(),
            absorbed: Decimal::ZERO,
        })
        .collect();

    let mut remaining = total_loss;

    for slot in allocations.iter_mut() {
        if remaining.is_zero() {
            break;
        }
        if exempt.contains(&slot.name) && !hierarchy.is_system(&slot.name) {
            debug!("skipping exempt bucket '{}'", slot.name);
            continue;
        }

        let capacity = effective_capacity(capacities, &slot.name);
        let absorbed = remaining.min(capacity);
        remaining -= absorbed;
        slot.absorbed = absorbed;

        debug!(
            "bucket '{}' absorbed {} of capacity {}, {} remaining",
            slot.name, absorbed, capacity, remaining
        );
    }

    Ok(Distribution { allocations })
}

/// Distribute `total_loss` over bucket records instead of a separate
/// hierarchy and capacity map.
pub fn allocate_buckets(
    total_loss: Money,
    buckets: &[Bucket],
    exempt: &BTreeSet<String>,
) -> BailInResult<Distribution> {
    let (hierarchy, capacities) = Hierarchy::from_buckets(buckets)?;
    allocate_loss(total_loss, &capacities, &hierarchy, exempt)
}

/// Capacity for `name`, zero when absent and clamped to zero when negative.
pub(crate) fn effective_capacity(capacities: &BTreeMap<String, Money>, name: &str) -> Money {
    match capacities.get(name) {
        Some(c) if *c < Decimal::ZERO => {
            warn!("negative capacity {c} for bucket '{name}' treated as zero");
            Decimal::ZERO
        }
        Some(c) => *c,
        None => Decimal::ZERO,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
