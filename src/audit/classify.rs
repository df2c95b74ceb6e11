//! Media-kind classification and kind filtering.
//!
//! Content type is authoritative when the API reported one; the filename
//! extension is the fallback. Classification never fails, anything
//! unrecognized ends up as `unknown`.

use std::collections::HashSet;

use anyhow::{bail, Result};

use crate::domain::asset::AssetKind;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "gif", "svg", "avif", "heic"];

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "webm", "avi", "mkv"];

const DOC_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx"];

/// MIME types treated as documents beyond the `image/*` and `video/*` families.
const DOC_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
];

/// Classify an asset from its content type, falling back to the filename
/// extension when the content type is absent or unrecognized.
pub fn classify(filename: &str, content_type: Option<&str>) -> AssetKind {
    if let Some(content_type) = content_type {
        let content_type = content_type.trim().to_ascii_lowercase();
        if content_type.starts_with("image/") {
            return AssetKind::Image;
        }
        if content_type.starts_with("video/") {
            return AssetKind::Video;
        }
        if DOC_CONTENT_TYPES.contains(&content_type.as_str()) {
            return AssetKind::Doc;
        }
    }

    match extension(filename) {
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => AssetKind::Image,
        Some(ext) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => AssetKind::Video,
        Some(ext) if DOC_EXTENSIONS.contains(&ext.as_str()) => AssetKind::Doc,
        _ => AssetKind::Unknown,
    }
}

/// Lowercased extension of the last path segment, ignoring any query
/// string or fragment.
fn extension(filename: &str) -> Option<String> {
    let path = filename
        .split(|c| c == '?' || c == '#')
        .next()
        .unwrap_or(filename);
    let name = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Allow-set of asset kinds. `None` means no filtering at all.
#[derive(Debug, Clone, Default)]
pub struct KindFilter(Option<HashSet<AssetKind>>);

impl KindFilter {
    /// Filter that lets every kind through.
    pub fn all() -> Self {
        Self(None)
    }

    /// Build from an explicit kind list; an empty list allows everything.
    pub fn from_kinds(kinds: &[AssetKind]) -> Self {
        if kinds.is_empty() {
            return Self::all();
        }
        Self(Some(kinds.iter().copied().collect()))
    }

    pub fn allows(&self, kind: AssetKind) -> bool {
        match &self.0 {
            Some(set) => set.contains(&kind),
            None => true,
        }
    }
}

/// Parse configured kind names into a filter.
///
/// The sentinel `"all"` (and an empty list) switch filtering off.
pub fn parse_kind_filter(names: &[String]) -> Result<KindFilter> {
    let mut kinds = HashSet::new();
    for name in names {
        match name.trim().to_ascii_lowercase().as_str() {
            "all" => return Ok(KindFilter::all()),
            "image" => {
                kinds.insert(AssetKind::Image);
            }
            "video" => {
                kinds.insert(AssetKind::Video);
            }
            "doc" => {
                kinds.insert(AssetKind::Doc);
            }
            "unknown" => {
                kinds.insert(AssetKind::Unknown);
            }
            other => bail!(
                "unknown asset kind '{}' (expected image, video, doc, unknown, or all)",
                other
            ),
        }
    }
    if kinds.is_empty() {
        return Ok(KindFilter::all());
    }
    Ok(KindFilter(Some(kinds)))
}
