//! Asset Pipeline Integration Tests
//!
//! Tests for the pure audit pipeline: extraction, deduplication,
//! resolution, classification, and aggregation. No network involved.

use std::collections::HashMap;

use serde_json::{json, Value};

use blokaudit::audit::resolve::SpaceIndex;
use blokaudit::audit::{extract_from_stories, resolve_and_aggregate, spaces_to_index};
use blokaudit::audit::{AuditOptions, KindFilter};
use blokaudit::client::{collect_pages, PER_PAGE};
use blokaudit::domain::asset::{AssetKind, AssetReference};
use blokaudit::domain::story::{ContentVersion, Story};

fn story(id: u64, slug: &str, content: Value) -> Story {
    Story {
        id,
        name: slug.to_string(),
        slug: slug.to_string(),
        full_slug: slug.to_string(),
        content: Some(content),
    }
}

fn asset_record(id: u64, filename: &str, content_type: Option<&str>, bytes: u64) -> Value {
    let mut record = json!({
        "id": id,
        "filename": filename,
        "content_length": bytes,
    });
    if let Some(content_type) = content_type {
        record["content_type"] = json!(content_type);
    }
    record
}

fn options(space_id: u64, threshold_bytes: u64) -> AuditOptions {
    AuditOptions {
        space_id,
        version: ContentVersion::Published,
        threshold_bytes,
        filter: KindFilter::all(),
    }
}

fn indexes_for(space_id: u64, records: &[Value]) -> HashMap<u64, SpaceIndex> {
    let mut indexes = HashMap::new();
    indexes.insert(space_id, SpaceIndex::from_values(records));
    indexes
}

#[test]
fn test_reference_resolves_and_lands_in_oversize() {
    // Asset id 42 in space 5 weighs 400000 bytes; threshold is 300 KiB
    let url = "https://a.storyblok.com/f/5/42/photo.png";
    let stories = vec![story(1, "blog/launch", json!({ "hero": url }))];
    let records = vec![asset_record(42, url, Some("image/png"), 400_000)];

    let extraction = extract_from_stories(&stories);
    let indexes = indexes_for(5, &records);
    let audit = resolve_and_aggregate(extraction, &indexes, &options(5, 300 * 1024));

    assert_eq!(audit.assets.len(), 1);
    let resolved = &audit.assets[0];
    assert!(resolved.is_resolved());
    assert_eq!(resolved.space_id, 5);
    assert_eq!(resolved.kind, AssetKind::Image);
    assert_eq!(resolved.size_bytes(), Some(400_000));

    // Strictly above 307200, so it appears in the oversize list
    assert_eq!(audit.summary.oversize.len(), 1);
    assert_eq!(audit.summary.oversize[0].size_bytes(), Some(400_000));

    let stats = &audit.summary.spaces[&5];
    assert_eq!(stats.resolved, 1);
    assert_eq!(stats.unresolved, 0);
    assert_eq!(stats.total_bytes, 400_000);
    assert_eq!(stats.oversize.len(), 1);
}

#[test]
fn test_dedupe_keeps_first_reference_per_identity_key() {
    // Same (space, id) shows up under two different URL strings
    let stories = vec![
        story(
            1,
            "blog/a",
            json!({ "image": "https://a.storyblok.com/f/5/42/photo.png" }),
        ),
        story(
            2,
            "blog/b",
            json!({ "image": "https://a.storyblok.com/f/5/42/photo-renamed.png" }),
        ),
    ];

    let extraction = extract_from_stories(&stories);
    assert_eq!(extraction.references.len(), 2);

    let audit = resolve_and_aggregate(extraction, &HashMap::new(), &options(5, 300 * 1024));

    // One survivor, and it is the first-encountered reference
    assert_eq!(audit.references_found, 2);
    assert_eq!(audit.unique_references, 1);
    assert_eq!(audit.assets.len(), 1);
    assert!(audit.assets[0].reference.filename.ends_with("photo.png"));

    // Both stories stay attached to the surviving key
    let key = audit.assets[0].reference.key();
    let labels = audit.stories_for(&key);
    assert_eq!(labels.len(), 2);
    assert_eq!(labels[0].slug, "blog/a");
    assert_eq!(labels[1].slug, "blog/b");
}

#[test]
fn test_resolution_prefers_id_match_over_filename_match() {
    let url = "https://a.storyblok.com/f/5/42/photo.png";
    // One record matches by id, a different record matches the filename
    let records = vec![
        asset_record(42, "https://a.storyblok.com/f/5/42/original.png", None, 111),
        asset_record(900, url, None, 999),
    ];
    let index = SpaceIndex::from_values(&records);
    let mut indexes = HashMap::new();
    indexes.insert(5, index);

    let reference = AssetReference::from_url(url);
    let resolved = blokaudit::audit::resolve::resolve(&reference, 5, &indexes);

    let metadata = resolved.metadata.expect("should resolve");
    assert_eq!(metadata.identifier, Some(42));
    assert_eq!(metadata.size_bytes, Some(111));
}

#[test]
fn test_oversize_list_is_sorted_and_complete() {
    let stories = vec![story(
        1,
        "gallery",
        json!({
            "a": "https://a.storyblok.com/f/5/41/small.png",
            "b": "https://a.storyblok.com/f/5/42/large.png",
            "c": "https://a.storyblok.com/f/5/43/medium.png",
            "d": "https://a.storyblok.com/f/5/44/huge.png",
        }),
    )];
    let records = vec![
        asset_record(41, "https://a.storyblok.com/f/5/41/small.png", None, 100_000),
        asset_record(42, "https://a.storyblok.com/f/5/42/large.png", None, 400_000),
        asset_record(43, "https://a.storyblok.com/f/5/43/medium.png", None, 350_000),
        asset_record(44, "https://a.storyblok.com/f/5/44/huge.png", None, 500_000),
    ];

    let extraction = extract_from_stories(&stories);
    let indexes = indexes_for(5, &records);
    let audit = resolve_and_aggregate(extraction, &indexes, &options(5, 300 * 1024));

    // Exactly the assets strictly above the threshold, largest first
    let sizes: Vec<Option<u64>> = audit
        .summary
        .oversize
        .iter()
        .map(|asset| asset.size_bytes())
        .collect();
    assert_eq!(
        sizes,
        vec![Some(500_000), Some(400_000), Some(350_000)]
    );

    assert_eq!(audit.summary.total_bytes(), 1_350_000);
}

#[test]
fn test_classification_prefers_content_type_over_extension() {
    let stories = vec![story(
        1,
        "docs",
        json!({
            "blob": "https://a.storyblok.com/f/5/42/export.bin",
            "manual": "https://a.storyblok.com/f/5/43/report.pdf",
        }),
    )];
    let records = vec![
        // Content-type wins over the .bin extension
        asset_record(
            42,
            "https://a.storyblok.com/f/5/42/export.bin",
            Some("image/png"),
            10,
        ),
        // No content-type, extension decides
        asset_record(43, "https://a.storyblok.com/f/5/43/report.pdf", None, 10),
    ];

    let extraction = extract_from_stories(&stories);
    let indexes = indexes_for(5, &records);
    let audit = resolve_and_aggregate(extraction, &indexes, &options(5, 300 * 1024));

    let kind_of = |id: u64| {
        audit
            .assets
            .iter()
            .find(|asset| asset.reference.identifier == Some(id))
            .map(|asset| asset.kind)
    };
    assert_eq!(kind_of(42), Some(AssetKind::Image));
    assert_eq!(kind_of(43), Some(AssetKind::Doc));
}

#[test]
fn test_unparseable_url_falls_back_to_primary_space_filename_match() {
    // No /f/{space}/{id}/ segment, so neither id nor space parses
    let url = "https://a.storyblok.com/uploads/legacy-banner.jpg";
    let stories = vec![story(1, "home", json!({ "banner": url }))];

    let extraction = extract_from_stories(&stories);
    let reference = &extraction.references[0];
    assert_eq!(reference.identifier, None);
    assert_eq!(reference.space_id, None);

    // Resolves against the primary space by exact filename
    let records = vec![asset_record(7001, url, None, 350_000)];
    let indexes = indexes_for(9, &records);
    let audit = resolve_and_aggregate(extraction, &indexes, &options(9, 300 * 1024));

    assert_eq!(audit.assets.len(), 1);
    assert!(audit.assets[0].is_resolved());
    assert_eq!(audit.assets[0].space_id, 9);
    assert_eq!(audit.summary.oversize.len(), 1);
}

#[test]
fn test_cross_space_reference_resolves_in_its_own_space() {
    let stories = vec![story(
        1,
        "mixed",
        json!({
            "local": "https://a.storyblok.com/f/5/10/local.png",
            "foreign": "https://a.storyblok.com/f/7/20/foreign.png",
        }),
    )];

    let extraction = extract_from_stories(&stories);
    let spaces = spaces_to_index(&extraction.references, 5);
    assert_eq!(spaces.into_iter().collect::<Vec<_>>(), vec![5, 7]);

    let mut indexes = HashMap::new();
    indexes.insert(
        5,
        SpaceIndex::from_values(&[asset_record(
            10,
            "https://a.storyblok.com/f/5/10/local.png",
            None,
            1_000,
        )]),
    );
    indexes.insert(
        7,
        SpaceIndex::from_values(&[asset_record(
            20,
            "https://a.storyblok.com/f/7/20/foreign.png",
            None,
            2_000,
        )]),
    );

    let audit = resolve_and_aggregate(extraction, &indexes, &options(5, 300 * 1024));
    assert_eq!(audit.assets.len(), 2);
    assert!(audit.assets.iter().all(|asset| asset.is_resolved()));

    // Per-space stats stay separate
    assert_eq!(audit.summary.spaces[&5].total_bytes, 1_000);
    assert_eq!(audit.summary.spaces[&7].total_bytes, 2_000);
}

#[test]
fn test_unresolved_references_are_counted_not_errors() {
    let stories = vec![story(
        1,
        "stale",
        json!({ "gone": "https://a.storyblok.com/f/5/404/deleted.png" }),
    )];

    let extraction = extract_from_stories(&stories);
    let indexes = indexes_for(5, &[]);
    let audit = resolve_and_aggregate(extraction, &indexes, &options(5, 300 * 1024));

    assert_eq!(audit.assets.len(), 1);
    assert!(!audit.assets[0].is_resolved());
    assert_eq!(audit.assets[0].size_bytes(), None);

    // Unknown size counts as zero bytes and never reaches the oversize list
    assert_eq!(audit.summary.unresolved_total(), 1);
    assert_eq!(audit.summary.total_bytes(), 0);
    assert!(audit.summary.oversize.is_empty());
}

#[test]
fn test_kind_filter_drops_assets_before_aggregation() {
    let stories = vec![story(
        1,
        "media",
        json!({
            "photo": "https://a.storyblok.com/f/5/1/photo.png",
            "clip": "https://a.storyblok.com/f/5/2/clip.mp4",
        }),
    )];
    let records = vec![
        asset_record(1, "https://a.storyblok.com/f/5/1/photo.png", None, 400_000),
        asset_record(2, "https://a.storyblok.com/f/5/2/clip.mp4", None, 900_000),
    ];

    let mut options = options(5, 300 * 1024);
    options.filter = KindFilter::from_kinds(&[AssetKind::Image]);

    let extraction = extract_from_stories(&stories);
    let indexes = indexes_for(5, &records);
    let audit = resolve_and_aggregate(extraction, &indexes, &options);

    // The video never reaches the aggregator, so totals exclude it
    assert_eq!(audit.assets.len(), 1);
    assert_eq!(audit.assets[0].kind, AssetKind::Image);
    assert_eq!(audit.summary.total_bytes(), 400_000);
    assert_eq!(audit.summary.oversize.len(), 1);

    // Dedupe statistics still describe the unfiltered set
    assert_eq!(audit.unique_references, 2);
}

#[tokio::test]
async fn test_pagination_stops_on_short_page() {
    // Pages of 100, 100, 37 with page size 100 stop after the third page
    let mut pages_seen = Vec::new();
    let items = collect_pages(PER_PAGE, |page| {
        pages_seen.push(page);
        let count = match page {
            1 | 2 => 100,
            3 => 37,
            _ => panic!("fetched past the short page"),
        };
        std::future::ready(Ok(vec![0u8; count]))
    })
    .await
    .unwrap();

    assert_eq!(items.len(), 237);
    assert_eq!(pages_seen, vec![1, 2, 3]);
}
