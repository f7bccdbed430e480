use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::BailInError;
use crate::types::*;
use crate::BailInResult;

// ---------------------------------------------------------------------------
// Bucket
// ---------------------------------------------------------------------------

/// A named loss-absorbing capacity holder: a creditor class or the
/// loss-absorption buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Identifier, stable across reorderings, e.g. "Subordinated Debt"
    pub name: String,
    /// Amount of loss this bucket can absorb
    pub capacity: Money,
    /// The system bucket is pinned to the front of the hierarchy and can
    /// never be exempted
    #[serde(default)]
    pub is_system: bool,
}

impl Bucket {
    pub fn new(name: impl Into<String>, capacity: Money) -> Self {
        Self {
            name: name.into(),
            capacity,
            is_system: false,
        }
    }

    pub fn system(name: impl Into<String>, capacity: Money) -> Self {
        Self {
            name: name.into(),
            capacity,
            is_system: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// Ordered priority sequence of bucket names. Index 0 absorbs loss first.
///
/// Construction guarantees unique, non-empty names and, when a system bucket
/// is declared, that it sits at index 0. Every operation that returns a new
/// `Hierarchy` preserves those guarantees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawHierarchy", into = "RawHierarchy")]
pub struct Hierarchy {
    order: Vec<String>,
    system_bucket: Option<String>,
}

/// Unvalidated wire form of a [`Hierarchy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawHierarchy {
    order: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    system_bucket: Option<String>,
}

impl TryFrom<RawHierarchy> for Hierarchy {
    type Error = BailInError;

    fn try_from(raw: RawHierarchy) -> Result<Self, Self::Error> {
        Hierarchy::new(raw.order, raw.system_bucket)
    }
}

impl From<Hierarchy> for RawHierarchy {
    fn from(h: Hierarchy) -> Self {
        RawHierarchy {
            order: h.order,
            system_bucket: h.system_bucket,
        }
    }
}

impl Hierarchy {
    /// Build a hierarchy from an explicit order and an optional system bucket.
    pub fn new(order: Vec<String>, system_bucket: Option<String>) -> BailInResult<Self> {
        validate_order(&order)?;
        if let Some(system) = &system_bucket {
            match order.iter().position(|n| n == system) {
                Some(0) => {}
                Some(idx) => {
                    return Err(BailInError::invalid(
                        "hierarchy.system_bucket",
                        format!("System bucket '{system}' must be at index 0, found at {idx}."),
                    ));
                }
                None => {
                    return Err(BailInError::invalid(
                        "hierarchy.system_bucket",
                        format!("System bucket '{system}' is not part of the order."),
                    ));
                }
            }
        }
        Ok(Self {
            order,
            system_bucket,
        })
    }

    /// Build a hierarchy with no system bucket.
    pub fn without_system<I, S>(names: I) -> BailInResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(Into::into).collect(), None)
    }

    /// Build a hierarchy and capacity map from bucket records, keeping the
    /// records' relative order. A system-flagged bucket is pinned to the
    /// front regardless of where it appears.
    pub fn from_buckets(buckets: &[Bucket]) -> BailInResult<(Self, BTreeMap<String, Money>)> {
        let systems: Vec<&Bucket> = buckets.iter().filter(|b| b.is_system).collect();
        if systems.len() > 1 {
            return Err(BailInError::invalid(
                "buckets",
                format!(
                    "At most one system bucket is allowed, found {}.",
                    systems.len()
                ),
            ));
        }
        let system_bucket = systems.first().map(|b| b.name.clone());

        let mut order: Vec<String> = Vec::with_capacity(buckets.len());
        order.extend(system_bucket.iter().cloned());
        order.extend(
            buckets
                .iter()
                .filter(|b| !b.is_system)
                .map(|b| b.name.clone()),
        );

        let capacities = buckets
            .iter()
            .map(|b| (b.name.clone(), b.capacity))
            .collect();

        Ok((Self::new(order, system_bucket)?, capacities))
    }

    /// Bucket names in priority order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn into_names(self) -> Vec<String> {
        self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.order.iter().any(|n| n == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.order.iter().position(|n| n == name)
    }

    pub fn system_bucket(&self) -> Option<&str> {
        self.system_bucket.as_deref()
    }

    pub fn is_system(&self, name: &str) -> bool {
        self.system_bucket.as_deref() == Some(name)
    }

    /// Assemble bucket records for this order from a capacity map. Missing
    /// capacities are reported as zero.
    pub fn buckets(&self, capacities: &BTreeMap<String, Money>) -> Vec<Bucket> {
        self.order
            .iter()
            .map(|name| Bucket {
                name: name.clone(),
                capacity: capacities.get(name).copied().unwrap_or_default(),
                is_system: self.is_system(name),
            })
            .collect()
    }

    /// Internal constructor for orders already known to satisfy the invariants.
    pub(crate) fn from_validated(order: Vec<String>, system_bucket: Option<String>) -> Self {
        Self {
            order,
            system_bucket,
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_order(order: &[String]) -> BailInResult<()> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for (idx, name) in order.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(BailInError::invalid(
                format!("hierarchy.order[{idx}]"),
                "Bucket name cannot be empty.",
            ));
        }
        if !seen.insert(name.as_str()) {
            return Err(BailInError::invalid(
                format!("hierarchy.order[{idx}]"),
                format!("Duplicate bucket name '{name}'."),
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
