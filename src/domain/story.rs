//! Stories, component schemas, and content versions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A content entry as returned by the delivery API.
///
/// Only the envelope is typed; `content` stays raw JSON because its shape
/// is user-authored and unconstrained.
#[derive(Debug, Clone, Deserialize)]
pub struct Story {
    pub id: u64,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub slug: String,

    #[serde(default)]
    pub full_slug: String,

    #[serde(default)]
    pub content: Option<Value>,
}

impl Story {
    /// Human-readable label used in back-reference listings.
    pub fn label(&self) -> StoryLabel {
        let slug = if self.full_slug.is_empty() {
            self.slug.clone()
        } else {
            self.full_slug.clone()
        };
        StoryLabel { id: self.id, slug }
    }
}

/// Compact story identity kept in back-reference indexes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StoryLabel {
    pub id: u64,
    pub slug: String,
}

impl std::fmt::Display for StoryLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.slug.is_empty() {
            write!(f, "story-{}", self.id)
        } else {
            f.write_str(&self.slug)
        }
    }
}

/// A component (content-type schema) as returned by the management API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: u64,

    pub name: String,

    #[serde(default)]
    pub display_name: Option<String>,
}

impl Component {
    /// Display name when set, technical name otherwise.
    pub fn title(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.name)
    }
}

/// Which revision of story content to audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentVersion {
    Published,
    Draft,
}

impl ContentVersion {
    /// Query-parameter value expected by the delivery API.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentVersion::Published => "published",
            ContentVersion::Draft => "draft",
        }
    }
}

impl Default for ContentVersion {
    fn default() -> Self {
        Self::Published
    }
}

impl std::fmt::Display for ContentVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
