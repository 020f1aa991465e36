//! Selects which directories of a section exceed its quota.
//!
//! Selection is purely positional: the inventory is already sorted oldest
//! first, so the excess is the prefix whose removal brings the count down to
//! the quota. Protected entries are *not* filtered here; the coordinator skips
//! them after selection so that a protected directory among the oldest never
//! pulls a newer one into the cleanup set.

use super::inventory::DirectoryEntry;

/// Number of directories above `max_directories`.
pub fn excess_count(count: usize, max_directories: usize) -> usize {
    count.saturating_sub(max_directories)
}

/// The oldest `len - max_directories` entries, in oldest-first order.
///
/// Returns an empty slice when the section is at or under quota.
pub fn select_excess(inventory: &[DirectoryEntry], max_directories: usize) -> &[DirectoryEntry] {
    &inventory[..excess_count(inventory.len(), max_directories)]
}

/// A section quota from configuration as a count usable for slicing.
pub(crate) fn quota_as_count(max_directories: u32) -> usize {
    usize::try_from(max_directories).unwrap_or(usize::MAX)
}
