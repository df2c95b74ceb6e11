//! Reference deduplication by identity key.

use std::collections::HashSet;

use crate::domain::asset::{AssetKey, AssetReference};

/// Drop later references that share an identity key with an earlier one.
///
/// First occurrence per key wins and input order is preserved. References
/// whose filenames differ only in URL decoration (query suffixes, stale
/// paths) still collapse when they share a numeric id.
pub fn dedupe(references: Vec<AssetReference>) -> Vec<AssetReference> {
    let mut seen: HashSet<AssetKey> = HashSet::with_capacity(references.len());
    references
        .into_iter()
        .filter(|reference| seen.insert(reference.key()))
        .collect()
}
