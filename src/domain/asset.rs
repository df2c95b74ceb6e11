//! Asset references and resolved asset metadata.
//!
//! References come out of story content in two shapes: structured asset
//! objects (numeric id + filename) and bare CDN URLs embedded in rich text
//! or arbitrary fields. Both collapse into [`AssetReference`], which is
//! matched against management-API records during resolution.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Host fragment that marks a string as an asset CDN URL.
pub const ASSET_HOST_MARKER: &str = "a.storyblok.com";

/// Metadata fields tried in order for the byte size of an asset.
const SIZE_FIELDS: &[&str] = &["content_length", "file_size", "size"];

/// Metadata fields tried in order for the MIME type of an asset.
const CONTENT_TYPE_FIELDS: &[&str] = &["content_type", "mime_type"];

static ASSET_PATH_RE: OnceLock<Regex> = OnceLock::new();
static DIMENSIONS_RE: OnceLock<Regex> = OnceLock::new();

fn asset_path_re() -> &'static Regex {
    ASSET_PATH_RE.get_or_init(|| Regex::new(r"/f/(\d+)/(\d+)/").expect("valid asset path regex"))
}

fn dimensions_re() -> &'static Regex {
    DIMENSIONS_RE.get_or_init(|| Regex::new(r"/(\d+)x(\d+)/").expect("valid dimensions regex"))
}

/// True if the string points at the asset CDN.
pub fn is_asset_url(value: &str) -> bool {
    value.contains(ASSET_HOST_MARKER)
}

/// Pull `(space_id, asset_id)` out of a CDN URL's `/f/{space}/{id}/` segment.
///
/// Either half is `None` when the segment is missing or malformed; callers
/// fall back to filename identity in that case.
pub fn parse_asset_path(url: &str) -> (Option<u64>, Option<u64>) {
    match asset_path_re().captures(url) {
        Some(captures) => {
            let space = captures[1].parse().ok();
            let id = captures[2].parse().ok();
            (space, id)
        }
        None => (None, None),
    }
}

/// Pull `(width, height)` out of a `/{w}x{h}/` path segment, if present.
pub fn parse_dimensions(url: &str) -> Option<(u32, u32)> {
    let captures = dimensions_re().captures(url)?;
    let width = captures[1].parse().ok()?;
    let height = captures[2].parse().ok()?;
    Some((width, height))
}

/// A single mention of an asset inside story content.
///
/// Extraction emits one reference per mention; duplicates across stories
/// are expected and removed later by deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReference {
    /// Numeric asset id, when the mention carried one (structured objects)
    /// or the CDN URL encoded one.
    pub identifier: Option<u64>,

    /// Full CDN URL of the asset as it appeared in content.
    pub filename: String,

    /// Space id parsed from the CDN URL path, when present.
    pub space_id: Option<u64>,
}

impl AssetReference {
    /// Build a reference from a bare CDN URL, parsing ids out of the path.
    pub fn from_url(url: impl Into<String>) -> Self {
        let filename = url.into();
        let (space_id, identifier) = parse_asset_path(&filename);
        Self {
            identifier,
            filename,
            space_id,
        }
    }

    /// Identity key for deduplication and resolution bookkeeping.
    ///
    /// Prefers the numeric id; falls back to the full filename. This is the
    /// only place keys are constructed, so both code paths always agree.
    pub fn key(&self) -> AssetKey {
        match self.identifier {
            Some(id) => AssetKey::Id {
                space: self.space_id,
                id,
            },
            None => AssetKey::Filename {
                space: self.space_id,
                filename: self.filename.clone(),
            },
        }
    }
}

/// Canonical identity of a referenced asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetKey {
    /// Keyed by numeric asset id.
    Id { space: Option<u64>, id: u64 },

    /// Keyed by full CDN URL when no id is known.
    Filename {
        space: Option<u64>,
        filename: String,
    },
}

fn write_space(f: &mut std::fmt::Formatter<'_>, space: Option<u64>) -> std::fmt::Result {
    match space {
        Some(id) => write!(f, "{}", id),
        None => f.write_str("unknown"),
    }
}

impl std::fmt::Display for AssetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKey::Id { space, id } => {
                write_space(f, *space)?;
                write!(f, ":id:{}", id)
            }
            AssetKey::Filename { space, filename } => {
                write_space(f, *space)?;
                write!(f, ":fn:{}", filename)
            }
        }
    }
}

/// Broad asset category used for filtering and report grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Image,
    Video,
    Doc,
    Unknown,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Video => "video",
            AssetKind::Doc => "doc",
            AssetKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Asset record as returned by the management API.
///
/// Field names drift across API versions, so numeric and string fields are
/// read through ordered alias lists (first hit wins).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetMetadata {
    /// Numeric asset id.
    pub identifier: Option<u64>,

    /// Full CDN URL of the asset.
    pub filename: String,

    /// MIME type reported by the API, when present.
    pub content_type: Option<String>,

    /// Size in bytes, when the API reported one.
    pub size_bytes: Option<u64>,

    /// Pixel width, from metadata or the filename's `{w}x{h}` segment.
    pub width: Option<u32>,

    /// Pixel height, from metadata or the filename's `{w}x{h}` segment.
    pub height: Option<u32>,
}

fn first_u64(value: &Value, fields: &[&str]) -> Option<u64> {
    fields.iter().find_map(|field| match value.get(field)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    })
}

fn first_string(value: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| {
        value
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

impl AssetMetadata {
    /// Read one asset record out of a raw API JSON object.
    ///
    /// Returns `None` when the record has no usable filename; such records
    /// cannot be matched against references and are skipped entirely.
    pub fn from_value(value: &Value) -> Option<Self> {
        let filename = value
            .get("filename")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())?
            .to_string();

        let identifier = value.get("id").and_then(Value::as_u64);
        let content_type = first_string(value, CONTENT_TYPE_FIELDS);
        let size_bytes = first_u64(value, SIZE_FIELDS);

        let file_dims = parse_dimensions(&filename);
        let width = first_u64(value, &["width"])
            .and_then(|w| u32::try_from(w).ok())
            .or(file_dims.map(|d| d.0));
        let height = first_u64(value, &["height"])
            .and_then(|h| u32::try_from(h).ok())
            .or(file_dims.map(|d| d.1));

        Some(Self {
            identifier,
            filename,
            content_type,
            size_bytes,
            width,
            height,
        })
    }
}

/// Outcome of resolving one deduplicated reference against a space index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedAsset {
    /// The reference as it was extracted from content.
    pub reference: AssetReference,

    /// Space the resolution was attempted in.
    pub space_id: u64,

    /// Classified category (content type first, extension fallback).
    pub kind: AssetKind,

    /// Matched metadata, or `None` when nothing in the space matched.
    pub metadata: Option<AssetMetadata>,
}

impl ResolvedAsset {
    /// Reported byte size, if the asset resolved and carried one.
    pub fn size_bytes(&self) -> Option<u64> {
        self.metadata.as_ref().and_then(|m| m.size_bytes)
    }

    pub fn is_resolved(&self) -> bool {
        self.metadata.is_some()
    }
}
