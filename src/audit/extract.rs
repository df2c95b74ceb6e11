//! Reference extraction from story content trees.
//!
//! Content is arbitrary user-authored JSON, so extraction is a plain
//! recursive walk over objects, arrays, and scalars. Asset mentions show up
//! in two shapes: structured asset objects (a `filename` field pointing at
//! the CDN, usually next to a numeric `id`) and bare CDN URLs sitting in
//! rich text or any other string field.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::domain::asset::{is_asset_url, parse_asset_path, AssetReference};

/// Walk a content tree and emit every asset mention in traversal order.
///
/// Duplicates are intentional at this stage; an object that is itself an
/// asset and also carries asset URLs in other fields emits several
/// references. Deduplication is a separate later pass.
pub fn extract_references(node: &Value) -> Vec<AssetReference> {
    let mut out = Vec::new();
    walk(node, &mut out);
    out
}

fn walk(node: &Value, out: &mut Vec<AssetReference>) {
    match node {
        Value::Array(items) => {
            for item in items {
                walk(item, out);
            }
        }
        Value::Object(map) => {
            if let Some(reference) = structured_reference(map) {
                out.push(reference);
            }
            for value in map.values() {
                match value.as_str() {
                    Some(text) => {
                        if is_asset_url(text) {
                            out.push(AssetReference::from_url(text));
                        }
                    }
                    None => walk(value, out),
                }
            }
        }
        _ => {}
    }
}

/// Read an object as a structured asset, if it has the shape of one.
///
/// The numeric `id` field takes precedence over whatever the URL path
/// parses to; the space id always comes from the URL.
fn structured_reference(map: &serde_json::Map<String, Value>) -> Option<AssetReference> {
    let filename = map.get("filename").and_then(Value::as_str)?;
    if !is_asset_url(filename) {
        return None;
    }
    let (space_id, parsed_id) = parse_asset_path(filename);
    let identifier = map.get("id").and_then(Value::as_u64).or(parsed_id);
    Some(AssetReference {
        identifier,
        filename: filename.to_string(),
        space_id,
    })
}

/// Collect every component name instantiated anywhere in a content tree.
pub fn component_names(node: &Value) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    collect_components(node, &mut names);
    names
}

fn collect_components(node: &Value, names: &mut BTreeSet<String>) {
    match node {
        Value::Array(items) => {
            for item in items {
                collect_components(item, names);
            }
        }
        Value::Object(map) => {
            if let Some(name) = map.get("component").and_then(Value::as_str) {
                if !name.is_empty() {
                    names.insert(name.to_string());
                }
            }
            for value in map.values() {
                collect_components(value, names);
            }
        }
        _ => {}
    }
}
