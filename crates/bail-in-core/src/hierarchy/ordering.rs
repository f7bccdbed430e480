use log::debug;

use crate::error::BailInError;
use crate::hierarchy::Hierarchy;
use crate::BailInResult;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Relocate `bucket_name` to `target_index` in the resulting order.
///
/// The bucket is removed from its current slot and re-inserted at
/// `target_index` of the remaining sequence; indices past the end append.
/// The system bucket never moves: asking to move it returns the hierarchy
/// unchanged, and any other bucket targeted at index 0 lands at index 1.
pub fn move_bucket(
    hierarchy: &Hierarchy,
    bucket_name: &str,
    target_index: usize,
) -> BailInResult<Hierarchy> {
    let current = hierarchy.position(bucket_name).ok_or_else(|| {
        BailInError::invalid(
            "bucket_name",
            format!("Bucket '{bucket_name}' is not in the hierarchy."),
        )
    })?;

    if hierarchy.is_system(bucket_name) {
        debug!("system bucket '{bucket_name}' is pinned; ignoring move to {target_index}");
        return Ok(hierarchy.clone());
    }

    let mut order = hierarchy.names().to_vec();
    let moved = order.remove(current);

    let mut insert_at = target_index.min(order.len());
    if insert_at == 0 && hierarchy.system_bucket().is_some() {
        insert_at = 1;
    }
    order.insert(insert_at, moved);

    debug!("moved '{bucket_name}' from {current} to {insert_at}");

    Ok(Hierarchy::from_validated(
        order,
        hierarchy.system_bucket().map(str::to_string),
    ))
}

/// Same as [`move_bucket`] for callers holding a bare name list.
pub fn move_in_order(
    order: &[String],
    system_bucket: Option<&str>,
    bucket_name: &str,
    target_index: usize,
) -> BailInResult<Vec<String>> {
    let hierarchy = Hierarchy::new(order.to_vec(), system_bucket.map(str::to_string))?;
    Ok(move_bucket(&hierarchy, bucket_name, target_index)?.into_names())
}

/// Raise a bucket one place in priority (towards index 0).
pub fn move_up(hierarchy: &Hierarchy, bucket_name: &str) -> BailInResult<Hierarchy> {
    match hierarchy.position(bucket_name) {
        Some(0) => Ok(hierarchy.clone()),
        Some(idx) => move_bucket(hierarchy, bucket_name, idx - 1),
        None => move_bucket(hierarchy, bucket_name, 0),
    }
}

/// Lower a bucket one place in priority (away from index 0).
pub fn move_down(hierarchy: &Hierarchy, bucket_name: &str) -> BailInResult<Hierarchy> {
    let idx = hierarchy.position(bucket_name).unwrap_or(0);
    move_bucket(hierarchy, bucket_name, idx + 1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
