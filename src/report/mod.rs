//! Report assembly and rendering.
//!
//! The audit outcome turns into one serializable report struct, printed as
//! console tables and optionally written out as pretty JSON.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use humansize::{format_size, BINARY};
use serde::Serialize;
use tokio::fs;

use crate::audit::{AssetAudit, AuditOptions, ComponentAudit};
use crate::domain::asset::{AssetKind, ResolvedAsset};
use crate::domain::story::ContentVersion;

/// Machine-readable result of an asset audit.
#[derive(Debug, Serialize)]
pub struct AssetReport {
    pub generated_at: DateTime<Utc>,
    pub space_id: u64,
    pub version: ContentVersion,
    pub threshold_bytes: u64,
    pub stories_scanned: usize,
    pub references_found: usize,
    pub unique_references: usize,
    pub resolved: u64,
    pub unresolved: u64,
    pub total_bytes: u64,
    pub spaces: Vec<SpaceReport>,
    pub oversize: Vec<OversizeEntry>,
    pub assets: Vec<AssetEntry>,
}

/// One row of the per-space table.
#[derive(Debug, Serialize)]
pub struct SpaceReport {
    pub space_id: u64,
    pub resolved: u64,
    pub unresolved: u64,
    pub total_bytes: u64,
    pub oversize_count: usize,
}

/// One asset above the threshold, with the stories that mention it.
#[derive(Debug, Serialize)]
pub struct OversizeEntry {
    pub key: String,
    pub filename: String,
    pub space_id: u64,
    pub kind: AssetKind,
    pub size_bytes: u64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub referenced_by: Vec<String>,
}

/// One audited asset, oversize or not.
#[derive(Debug, Serialize)]
pub struct AssetEntry {
    pub key: String,
    pub filename: String,
    pub space_id: u64,
    pub kind: AssetKind,
    pub resolved: bool,
    pub size_bytes: Option<u64>,
}

impl AssetReport {
    /// Assemble the report from an audit outcome.
    pub fn from_audit(audit: &AssetAudit, options: &AuditOptions) -> Self {
        let spaces = audit
            .summary
            .spaces
            .iter()
            .map(|(space_id, stats)| SpaceReport {
                space_id: *space_id,
                resolved: stats.resolved,
                unresolved: stats.unresolved,
                total_bytes: stats.total_bytes,
                oversize_count: stats.oversize.len(),
            })
            .collect();

        let oversize = audit
            .summary
            .oversize
            .iter()
            .map(|asset| oversize_entry(asset, audit))
            .collect();

        let assets = audit
            .assets
            .iter()
            .map(|asset| AssetEntry {
                key: asset.reference.key().to_string(),
                filename: filename_of(asset).to_string(),
                space_id: asset.space_id,
                kind: asset.kind,
                resolved: asset.is_resolved(),
                size_bytes: asset.size_bytes(),
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            space_id: options.space_id,
            version: options.version,
            threshold_bytes: options.threshold_bytes,
            stories_scanned: audit.stories_scanned,
            references_found: audit.references_found,
            unique_references: audit.unique_references,
            resolved: audit.summary.resolved_total(),
            unresolved: audit.summary.unresolved_total(),
            total_bytes: audit.summary.total_bytes(),
            spaces,
            oversize,
            assets,
        }
    }

    /// Write the report as pretty-printed JSON.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }

    /// Print the human-readable summary, listing at most `top` oversize
    /// entries (the list is already sorted largest first).
    pub fn print(&self, top: usize) {
        println!(
            "Asset audit for space {} ({} content)",
            self.space_id, self.version
        );
        println!(
            "Scanned {} stories, found {} references ({} unique)",
            self.stories_scanned, self.references_found, self.unique_references
        );
        println!(
            "Resolved {} assets totalling {}, {} unresolved",
            self.resolved,
            format_size(self.total_bytes, BINARY),
            self.unresolved
        );
        println!();

        println!(
            "{:<10} {:>9} {:>11} {:>12} {:>9}",
            "SPACE", "RESOLVED", "UNRESOLVED", "TOTAL", "OVERSIZE"
        );
        println!("{}", "-".repeat(56));
        for space in &self.spaces {
            println!(
                "{:<10} {:>9} {:>11} {:>12} {:>9}",
                space.space_id,
                space.resolved,
                space.unresolved,
                format_size(space.total_bytes, BINARY),
                space.oversize_count
            );
        }
        println!();

        if self.oversize.is_empty() {
            println!(
                "No assets above {}",
                format_size(self.threshold_bytes, BINARY)
            );
            return;
        }

        println!(
            "Top {} of {} assets above {}:",
            top.min(self.oversize.len()),
            self.oversize.len(),
            format_size(self.threshold_bytes, BINARY)
        );
        println!(
            "{:<12} {:<8} {:<44} {}",
            "SIZE", "KIND", "FILE", "REFERENCED BY"
        );
        println!("{}", "-".repeat(100));
        for entry in self.oversize.iter().take(top) {
            println!(
                "{:<12} {:<8} {:<44} {}",
                format_size(entry.size_bytes, BINARY),
                entry.kind,
                truncate(display_name(&entry.filename), 44),
                entry.referenced_by.join(", ")
            );
        }
    }
}

fn oversize_entry(asset: &ResolvedAsset, audit: &AssetAudit) -> OversizeEntry {
    let key = asset.reference.key();
    let referenced_by = audit
        .stories_for(&key)
        .iter()
        .map(|label| label.to_string())
        .collect();
    let (width, height) = match &asset.metadata {
        Some(metadata) => (metadata.width, metadata.height),
        None => (None, None),
    };

    OversizeEntry {
        key: key.to_string(),
        filename: filename_of(asset).to_string(),
        space_id: asset.space_id,
        kind: asset.kind,
        size_bytes: asset.size_bytes().unwrap_or(0),
        width,
        height,
        referenced_by,
    }
}

/// Canonical filename when resolved, the referenced URL otherwise.
fn filename_of(asset: &ResolvedAsset) -> &str {
    match &asset.metadata {
        Some(metadata) => &metadata.filename,
        None => &asset.reference.filename,
    }
}

/// Last path segment of a CDN URL, query and fragment stripped.
fn display_name(url: &str) -> &str {
    let path = url.split(|c| c == '?' || c == '#').next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let cut: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", cut)
}

/// Machine-readable result of a component audit.
#[derive(Debug, Serialize)]
pub struct ComponentReport {
    pub generated_at: DateTime<Utc>,
    pub space_id: u64,
    pub version: ContentVersion,
    pub stories_scanned: usize,
    pub defined: usize,
    pub used: Vec<String>,
    pub unused: Vec<UnusedComponent>,
}

#[derive(Debug, Serialize)]
pub struct UnusedComponent {
    pub id: u64,
    pub name: String,
    pub display_name: Option<String>,
}

impl ComponentReport {
    pub fn from_audit(audit: &ComponentAudit, space_id: u64, version: ContentVersion) -> Self {
        Self {
            generated_at: Utc::now(),
            space_id,
            version,
            stories_scanned: audit.stories_scanned,
            defined: audit.components.len(),
            used: audit.used.iter().cloned().collect(),
            unused: audit
                .unused
                .iter()
                .map(|component| UnusedComponent {
                    id: component.id,
                    name: component.name.clone(),
                    display_name: component.display_name.clone(),
                })
                .collect(),
        }
    }

    /// Write the report as pretty-printed JSON.
    pub async fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }

    /// Print the unused-component table.
    pub fn print(&self) {
        println!(
            "Component audit for space {} ({} content)",
            self.space_id, self.version
        );
        println!(
            "{} defined, {} in use across {} stories",
            self.defined,
            self.used.len(),
            self.stories_scanned
        );

        if self.unused.is_empty() {
            println!("\nEvery defined component is in use.");
            return;
        }

        println!("\n{:<10} {:<30} {}", "ID", "NAME", "DISPLAY NAME");
        println!("{}", "-".repeat(70));
        for component in &self.unused {
            println!(
                "{:<10} {:<30} {}",
                component.id,
                component.name,
                component.display_name.as_deref().unwrap_or("-")
            );
        }
        println!("\nTotal: {} unused component(s)", self.unused.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{self, components, KindFilter, SpaceIndex};
    use crate::domain::story::{Component, Story};
    use serde_json::json;
    use std::collections::HashMap;

    fn sample_audit() -> (AssetAudit, AuditOptions) {
        let stories = vec![Story {
            id: 1,
            name: "Home".to_string(),
            slug: "home".to_string(),
            full_slug: "home".to_string(),
            content: Some(json!({
                "hero": {
                    "id": 42,
                    "filename": "https://a.storyblok.com/f/5/42/hero.png"
                },
                "missing": "https://a.storyblok.com/f/5/77/gone.png"
            })),
        }];
        let extraction = audit::extract_from_stories(&stories);

        let indexes = HashMap::from([(
            5,
            SpaceIndex::from_values(&[json!({
                "id": 42,
                "filename": "https://a.storyblok.com/f/5/42/hero.png",
                "content_type": "image/png",
                "content_length": 500000,
                "width": 2000,
                "height": 1000
            })]),
        )]);

        let options = AuditOptions {
            space_id: 5,
            version: ContentVersion::Published,
            threshold_bytes: 300 * 1024,
            filter: KindFilter::all(),
        };
        let outcome = audit::resolve_and_aggregate(extraction, &indexes, &options);
        (outcome, options)
    }

    #[test]
    fn test_asset_report_shape() {
        let (outcome, options) = sample_audit();
        let report = AssetReport::from_audit(&outcome, &options);

        assert_eq!(report.space_id, 5);
        assert_eq!(report.resolved, 1);
        assert_eq!(report.unresolved, 1);
        assert_eq!(report.total_bytes, 500000);
        assert_eq!(report.oversize.len(), 1);
        assert_eq!(report.assets.len(), 2);

        let entry = &report.oversize[0];
        assert_eq!(entry.key, "5:id:42");
        assert_eq!(entry.size_bytes, 500000);
        assert_eq!(entry.width, Some(2000));
        assert_eq!(entry.referenced_by, vec!["home".to_string()]);
    }

    #[test]
    fn test_asset_report_serializes_to_stable_json() {
        let (outcome, options) = sample_audit();
        let report = AssetReport::from_audit(&outcome, &options);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["version"], json!("published"));
        assert_eq!(value["threshold_bytes"], json!(307200));
        assert_eq!(value["spaces"][0]["space_id"], json!(5));
        assert_eq!(value["oversize"][0]["kind"], json!("image"));
        assert!(value["generated_at"].is_string());
    }

    #[test]
    fn test_component_report_lists_unused() {
        let components = vec![
            Component {
                id: 1,
                name: "page".to_string(),
                display_name: None,
            },
            Component {
                id: 2,
                name: "legacy".to_string(),
                display_name: Some("Legacy".to_string()),
            },
        ];
        let stories = vec![Story {
            id: 1,
            name: "Home".to_string(),
            slug: "home".to_string(),
            full_slug: "home".to_string(),
            content: Some(json!({ "component": "page" })),
        }];

        let outcome = components::diff_components(components, &stories);
        let report = ComponentReport::from_audit(&outcome, 5, ContentVersion::Draft);

        assert_eq!(report.defined, 2);
        assert_eq!(report.used, vec!["page".to_string()]);
        assert_eq!(report.unused.len(), 1);
        assert_eq!(report.unused[0].name, "legacy");
    }

    #[test]
    fn test_display_name_and_truncate() {
        assert_eq!(
            display_name("https://a.storyblok.com/f/5/42/hero.png?v=2"),
            "hero.png"
        );
        assert_eq!(display_name("plain.png"), "plain.png");

        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly-ten", 11), "exactly-ten");
        assert_eq!(truncate("a-very-long-filename.png", 10), "a-very-...");
    }
}
