//! blokaudit - Storyblok space audit tool
//!
//! Scans the stories of a Storyblok space and reports assets above a
//! size threshold and components no story uses.
//!
//! # Architecture
//!
//! The asset audit is a forward pipeline:
//! - Stories are fetched from the Delivery API, asset records from the
//!   Management API
//! - Asset references are extracted from story content, deduplicated,
//!   and resolved against the asset records
//! - Resolved assets are classified, filtered, and aggregated into a
//!   report
//!
//! Everything after the fetch step is pure, so the pipeline core is
//! testable without network access.
//!
//! # Modules
//!
//! - `client`: Storyblok API clients (Delivery, Management) with retry
//! - `domain`: Data structures (AssetReference, AssetMetadata, Story)
//! - `audit`: Extraction, resolution, and aggregation logic
//! - `report`: Report building, JSON output, and table printing
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Find assets above 300 KiB in a space
//! blokaudit assets --space 95001
//!
//! # Only images, higher threshold, JSON report
//! blokaudit assets -s 95001 -k image -t 500 -o report.json
//!
//! # Find (and delete) unused components
//! blokaudit components -s 95001 --delete
//! ```

pub mod audit;
pub mod cli;
pub mod client;
pub mod config;
pub mod domain;
pub mod report;

// Re-export main types at crate root for convenience
pub use audit::{AssetAudit, AuditOptions, ComponentAudit, KindFilter, SizeSummary};
pub use client::{ApiClient, DeliveryClient, ManagementClient, RequestError, RetryPolicy};
pub use domain::{AssetKey, AssetKind, AssetMetadata, AssetReference, ResolvedAsset};
pub use domain::{Component, ContentVersion, Story, StoryLabel};
pub use report::{AssetReport, ComponentReport};
