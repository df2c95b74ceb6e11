//! The audit pipeline.
//!
//! Data flows strictly forward: fetch stories, extract references, dedupe,
//! build per-space metadata indexes, resolve, classify, aggregate. No stage
//! calls back upstream, and everything after fetching is pure so the whole
//! pipeline is testable without a network.

pub mod aggregate;
pub mod classify;
pub mod components;
pub mod dedupe;
pub mod extract;
pub mod resolve;

pub use aggregate::{SizeAggregator, SizeSummary, SpaceStats};
pub use classify::KindFilter;
pub use components::{run_component_audit, ComponentAudit};
pub use resolve::SpaceIndex;

use std::collections::{BTreeSet, HashMap};

use tracing::{info, instrument};

use crate::client::{DeliveryClient, ManagementClient, RequestError};
use crate::domain::asset::{AssetKey, AssetReference, ResolvedAsset};
use crate::domain::story::{ContentVersion, Story, StoryLabel};

/// Options for one asset audit run.
#[derive(Debug, Clone)]
pub struct AuditOptions {
    /// Primary space; references without a parsed space id resolve here.
    pub space_id: u64,

    /// Story revision to scan.
    pub version: ContentVersion,

    /// Oversize threshold in bytes (strictly-exceeds).
    pub threshold_bytes: u64,

    /// Kinds kept after classification.
    pub filter: KindFilter,
}

/// Everything one extraction pass produces from the fetched stories.
#[derive(Debug, Default)]
pub struct Extraction {
    /// References in traversal order, duplicates included.
    pub references: Vec<AssetReference>,

    /// Story labels per identity key. Recorded per mention, before
    /// deduplication, so every referencing story is captured.
    pub referenced_by: HashMap<AssetKey, BTreeSet<StoryLabel>>,

    pub stories_scanned: usize,
}

/// Extract asset references from every story's content tree.
pub fn extract_from_stories(stories: &[Story]) -> Extraction {
    let mut references = Vec::new();
    let mut referenced_by: HashMap<AssetKey, BTreeSet<StoryLabel>> = HashMap::new();

    for story in stories {
        if let Some(content) = &story.content {
            let found = extract::extract_references(content);
            if found.is_empty() {
                continue;
            }
            let label = story.label();
            for reference in &found {
                referenced_by
                    .entry(reference.key())
                    .or_default()
                    .insert(label.clone());
            }
            references.extend(found);
        }
    }

    Extraction {
        references,
        referenced_by,
        stories_scanned: stories.len(),
    }
}

/// The closed set of spaces to index: every space seen on a reference plus
/// the primary space.
pub fn spaces_to_index(references: &[AssetReference], primary_space: u64) -> BTreeSet<u64> {
    let mut spaces: BTreeSet<u64> = references.iter().filter_map(|r| r.space_id).collect();
    spaces.insert(primary_space);
    spaces
}

/// Complete outcome of an asset audit, ready for report assembly.
#[derive(Debug)]
pub struct AssetAudit {
    /// Deduplicated references after resolution and kind filtering.
    pub assets: Vec<ResolvedAsset>,

    /// Aggregated sizes, oversize lists included.
    pub summary: SizeSummary,

    /// Story labels per identity key, for back-linking report entries.
    pub referenced_by: HashMap<AssetKey, BTreeSet<StoryLabel>>,

    pub stories_scanned: usize,

    /// Mentions found before deduplication.
    pub references_found: usize,

    /// References surviving deduplication, before kind filtering.
    pub unique_references: usize,
}

impl AssetAudit {
    /// Stories mentioning the given asset, in label order.
    pub fn stories_for(&self, key: &AssetKey) -> Vec<&StoryLabel> {
        self.referenced_by
            .get(key)
            .map(|labels| labels.iter().collect())
            .unwrap_or_default()
    }
}

/// Resolve, filter, and aggregate one extraction against prefetched space
/// indexes. Pure; all fetching happens before this runs.
pub fn resolve_and_aggregate(
    extraction: Extraction,
    indexes: &HashMap<u64, SpaceIndex>,
    options: &AuditOptions,
) -> AssetAudit {
    let references_found = extraction.references.len();
    let unique = dedupe::dedupe(extraction.references);
    let unique_references = unique.len();

    let mut aggregator = SizeAggregator::new(options.threshold_bytes);
    let mut assets = Vec::with_capacity(unique.len());
    for reference in &unique {
        let resolved = resolve::resolve(reference, options.space_id, indexes);
        if !options.filter.allows(resolved.kind) {
            continue;
        }
        aggregator.fold(&resolved);
        assets.push(resolved);
    }

    AssetAudit {
        assets,
        summary: aggregator.finish(),
        referenced_by: extraction.referenced_by,
        stories_scanned: extraction.stories_scanned,
        references_found,
        unique_references,
    }
}

/// Run the full asset audit.
///
/// All network calls are sequential: one paginated story listing, then one
/// paginated asset listing per space in the closed set.
#[instrument(skip_all, fields(space_id = options.space_id, version = %options.version))]
pub async fn run_asset_audit(
    delivery: &DeliveryClient,
    management: &ManagementClient,
    options: &AuditOptions,
) -> Result<AssetAudit, RequestError> {
    info!("Fetching stories");
    let stories = delivery.fetch_stories(options.version).await?;

    let extraction = extract_from_stories(&stories);
    info!(
        stories = extraction.stories_scanned,
        references = extraction.references.len(),
        "Extracted asset references"
    );

    let spaces = spaces_to_index(&extraction.references, options.space_id);
    let mut indexes = HashMap::with_capacity(spaces.len());
    for space_id in spaces {
        let records = management.fetch_assets(space_id).await?;
        let index = SpaceIndex::from_values(&records);
        info!(space_id, assets = index.len(), "Indexed space assets");
        indexes.insert(space_id, index);
    }

    let audit = resolve_and_aggregate(extraction, &indexes, options);
    info!(
        resolved = audit.summary.resolved_total(),
        unresolved = audit.summary.unresolved_total(),
        oversize = audit.summary.oversize.len(),
        "Audit complete"
    );
    Ok(audit)
}
