//! Size aggregation and oversize selection.
//!
//! One forward pass over resolved-and-filtered assets. All state lives in
//! the aggregator instance; nothing here is global or shared.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::asset::ResolvedAsset;

/// Running tallies for one space, created lazily on first sighting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SpaceStats {
    /// References that matched a metadata record.
    pub resolved: u64,

    /// References nothing in the space matched.
    pub unresolved: u64,

    /// Byte total over resolved assets; assets without a reported size
    /// contribute zero.
    pub total_bytes: u64,

    /// Resolved assets strictly above the threshold, largest first.
    pub oversize: Vec<ResolvedAsset>,
}

/// Single-pass aggregator; fold every asset in, then `finish`.
#[derive(Debug)]
pub struct SizeAggregator {
    threshold_bytes: u64,
    spaces: BTreeMap<u64, SpaceStats>,
    oversize: Vec<ResolvedAsset>,
}

impl SizeAggregator {
    pub fn new(threshold_bytes: u64) -> Self {
        Self {
            threshold_bytes,
            spaces: BTreeMap::new(),
            oversize: Vec::new(),
        }
    }

    /// Fold one resolved asset into the running totals.
    pub fn fold(&mut self, asset: &ResolvedAsset) {
        let stats = self.spaces.entry(asset.space_id).or_default();
        if asset.is_resolved() {
            stats.resolved += 1;
            let size = asset.size_bytes().unwrap_or(0);
            stats.total_bytes += size;
            if size > self.threshold_bytes {
                stats.oversize.push(asset.clone());
                self.oversize.push(asset.clone());
            }
        } else {
            stats.unresolved += 1;
        }
    }

    /// Close the pass and sort every oversize list descending by size.
    ///
    /// The sort is stable, so assets with equal (or absent) sizes keep
    /// their fold order.
    pub fn finish(mut self) -> SizeSummary {
        sort_by_size_desc(&mut self.oversize);
        for stats in self.spaces.values_mut() {
            sort_by_size_desc(&mut stats.oversize);
        }
        SizeSummary {
            threshold_bytes: self.threshold_bytes,
            spaces: self.spaces,
            oversize: self.oversize,
        }
    }
}

fn sort_by_size_desc(assets: &mut [ResolvedAsset]) {
    assets.sort_by_key(|asset| std::cmp::Reverse(asset.size_bytes().unwrap_or(0)));
}

/// Aggregation output handed to report assembly.
#[derive(Debug)]
pub struct SizeSummary {
    pub threshold_bytes: u64,

    /// Per-space tallies, keyed by space id.
    pub spaces: BTreeMap<u64, SpaceStats>,

    /// Global oversize list, the definitive ordering for any "top N" view.
    pub oversize: Vec<ResolvedAsset>,
}

impl SizeSummary {
    pub fn resolved_total(&self) -> u64 {
        self.spaces.values().map(|s| s.resolved).sum()
    }

    pub fn unresolved_total(&self) -> u64 {
        self.spaces.values().map(|s| s.unresolved).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.spaces.values().map(|s| s.total_bytes).sum()
    }
}
