//! Creditor hierarchy: the ordered list of loss-absorbing buckets and the
//! reordering rules that keep the system bucket pinned at the front.

pub mod bucket;
pub mod ordering;

pub use bucket::{Bucket, Hierarchy};
pub use ordering::{move_bucket, move_down, move_in_order, move_up};
