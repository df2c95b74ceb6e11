//! Unused-component detection.
//!
//! A component counts as used when any story instantiates it, i.e. its
//! name appears as a `component` field anywhere in some content tree.
//! Nested and deeply buried instances count the same as top-level ones.

use std::collections::BTreeSet;

use tracing::{info, instrument};

use crate::audit::extract;
use crate::client::{DeliveryClient, ManagementClient, RequestError};
use crate::domain::story::{Component, ContentVersion, Story};

/// Outcome of a component audit.
#[derive(Debug)]
pub struct ComponentAudit {
    /// Every component defined in the space, in API order.
    pub components: Vec<Component>,

    /// Component names instantiated by at least one story.
    pub used: BTreeSet<String>,

    /// Defined components no story instantiates, in definition order.
    pub unused: Vec<Component>,

    pub stories_scanned: usize,
}

/// Compare defined components against the names stories actually use.
pub fn diff_components(components: Vec<Component>, stories: &[Story]) -> ComponentAudit {
    let mut used = BTreeSet::new();
    for story in stories {
        if let Some(content) = &story.content {
            used.extend(extract::component_names(content));
        }
    }

    let unused = components
        .iter()
        .filter(|component| !used.contains(&component.name))
        .cloned()
        .collect();

    ComponentAudit {
        components,
        used,
        unused,
        stories_scanned: stories.len(),
    }
}

/// Run the full component audit: fetch schemas and stories, then diff.
#[instrument(skip_all, fields(space_id = space_id, version = %version))]
pub async fn run_component_audit(
    delivery: &DeliveryClient,
    management: &ManagementClient,
    space_id: u64,
    version: ContentVersion,
) -> Result<ComponentAudit, RequestError> {
    info!("Fetching components");
    let components = management.fetch_components(space_id).await?;

    info!("Fetching stories");
    let stories = delivery.fetch_stories(version).await?;

    let audit = diff_components(components, &stories);
    info!(
        defined = audit.components.len(),
        used = audit.used.len(),
        unused = audit.unused.len(),
        "Component audit complete"
    );
    Ok(audit)
}
