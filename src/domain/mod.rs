//! Domain types for the audit pipeline.
//!
//! This module contains the core data structures:
//! - Asset: references extracted from story content and resolved metadata
//! - Story: content entries and the components they instantiate

pub mod asset;
pub mod story;

// Re-export commonly used types
pub use asset::{AssetKey, AssetKind, AssetMetadata, AssetReference, ResolvedAsset};
pub use story::{Component, ContentVersion, Story, StoryLabel};
