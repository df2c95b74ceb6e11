//! Per-space metadata indexes and reference resolution.
//!
//! All space listings are fetched before resolution starts, so resolving a
//! reference is pure lookup work and never touches the network.

use std::collections::HashMap;

use serde_json::Value;

use crate::audit::classify;
use crate::domain::asset::{AssetMetadata, AssetReference, ResolvedAsset};

/// Constant-time lookup over one space's full asset listing.
#[derive(Debug, Default)]
pub struct SpaceIndex {
    assets: Vec<AssetMetadata>,
    by_id: HashMap<u64, usize>,
    by_filename: HashMap<String, usize>,
}

impl SpaceIndex {
    /// Build an index from raw management-API asset records.
    ///
    /// Records without a usable filename are dropped. On duplicate ids or
    /// filenames the first record wins.
    pub fn from_values(values: &[Value]) -> Self {
        let mut index = Self::default();
        for value in values {
            if let Some(metadata) = AssetMetadata::from_value(value) {
                index.push(metadata);
            }
        }
        index
    }

    fn push(&mut self, metadata: AssetMetadata) {
        let slot = self.assets.len();
        if let Some(id) = metadata.identifier {
            self.by_id.entry(id).or_insert(slot);
        }
        self.by_filename
            .entry(metadata.filename.clone())
            .or_insert(slot);
        self.assets.push(metadata);
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Id match first, exact filename match second.
    fn lookup(&self, reference: &AssetReference) -> Option<&AssetMetadata> {
        if let Some(id) = reference.identifier {
            if let Some(&slot) = self.by_id.get(&id) {
                return self.assets.get(slot);
            }
        }
        self.by_filename
            .get(&reference.filename)
            .and_then(|&slot| self.assets.get(slot))
    }
}

/// Resolve one deduplicated reference against the prefetched indexes.
///
/// A reference without a parsed space id resolves against the primary
/// space. When nothing matches, the asset flows on unresolved; that is a
/// count in the report, not an error.
pub fn resolve(
    reference: &AssetReference,
    primary_space: u64,
    indexes: &HashMap<u64, SpaceIndex>,
) -> ResolvedAsset {
    let space_id = reference.space_id.unwrap_or(primary_space);
    let metadata = indexes
        .get(&space_id)
        .and_then(|index| index.lookup(reference))
        .cloned();

    let (filename, content_type) = match metadata.as_ref() {
        Some(found) => (found.filename.as_str(), found.content_type.as_deref()),
        None => (reference.filename.as_str(), None),
    };
    let kind = classify::classify(filename, content_type);

    ResolvedAsset {
        reference: reference.clone(),
        space_id,
        kind,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asset::AssetKind;
    use serde_json::json;

    fn space_index(values: Vec<Value>) -> SpaceIndex {
        SpaceIndex::from_values(&values)
    }

    fn indexes(space: u64, index: SpaceIndex) -> HashMap<u64, SpaceIndex> {
        HashMap::from([(space, index)])
    }

    #[test]
    fn test_id_match_beats_filename_match() {
        let index = space_index(vec![
            json!({
                "id": 42,
                "filename": "https://a.storyblok.com/f/5/42/renamed.png",
                "content_length": 100
            }),
            json!({
                "id": 43,
                "filename": "https://a.storyblok.com/f/5/42/photo.png",
                "content_length": 200
            }),
        ]);
        let reference = AssetReference {
            identifier: Some(42),
            filename: "https://a.storyblok.com/f/5/42/photo.png".to_string(),
            space_id: Some(5),
        };

        let resolved = resolve(&reference, 5, &indexes(5, index));
        let metadata = resolved.metadata.unwrap();
        assert_eq!(metadata.identifier, Some(42));
        assert_eq!(metadata.size_bytes, Some(100));
    }

    #[test]
    fn test_filename_fallback_when_id_unknown() {
        let index = space_index(vec![json!({
            "id": 7,
            "filename": "https://a.storyblok.com/old/photo.png",
            "content_length": 512
        })]);
        let reference = AssetReference {
            identifier: None,
            filename: "https://a.storyblok.com/old/photo.png".to_string(),
            space_id: None,
        };

        let resolved = resolve(&reference, 5, &indexes(5, index));
        assert_eq!(resolved.space_id, 5);
        assert_eq!(resolved.size_bytes(), Some(512));
    }

    #[test]
    fn test_unmatched_reference_is_unresolved_not_an_error() {
        let reference = AssetReference {
            identifier: Some(42),
            filename: "https://a.storyblok.com/f/5/42/gone.png".to_string(),
            space_id: Some(5),
        };

        let resolved = resolve(&reference, 5, &HashMap::new());
        assert!(!resolved.is_resolved());
        assert_eq!(resolved.size_bytes(), None);
        // classification still works off the reference filename
        assert_eq!(resolved.kind, AssetKind::Image);
    }

    #[test]
    fn test_resolved_classification_uses_metadata_content_type() {
        let index = space_index(vec![json!({
            "id": 42,
            "filename": "https://a.storyblok.com/f/5/42/export.bin",
            "content_type": "image/png"
        })]);
        let reference = AssetReference {
            identifier: Some(42),
            filename: "https://a.storyblok.com/f/5/42/export.bin".to_string(),
            space_id: Some(5),
        };

        let resolved = resolve(&reference, 5, &indexes(5, index));
        assert_eq!(resolved.kind, AssetKind::Image);
    }

    #[test]
    fn test_duplicate_records_first_wins() {
        let index = space_index(vec![
            json!({ "id": 42, "filename": "https://a.storyblok.com/f/5/42/a.png", "size": 1 }),
            json!({ "id": 42, "filename": "https://a.storyblok.com/f/5/42/a.png", "size": 2 }),
        ]);
        assert_eq!(index.len(), 2);

        let reference = AssetReference {
            identifier: Some(42),
            filename: "https://a.storyblok.com/f/5/42/a.png".to_string(),
            space_id: Some(5),
        };
        let resolved = resolve(&reference, 5, &indexes(5, index));
        assert_eq!(resolved.size_bytes(), Some(1));
    }

    #[test]
    fn test_records_without_filename_are_skipped() {
        let index = space_index(vec![
            json!({ "id": 42, "size": 1 }),
            json!({ "id": 43, "filename": "https://a.storyblok.com/f/5/43/b.png" }),
        ]);
        assert_eq!(index.len(), 1);
        assert!(!index.is_empty());
    }
}
