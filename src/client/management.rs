//! Management API client (asset listings, component schemas).

use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{ApiAuth, ApiClient, RequestError, RetryPolicy};
use crate::domain::story::Component;

/// Management API base.
pub const DEFAULT_MANAGEMENT_BASE: &str = "https://mapi.storyblok.com/v1";

/// Client for space-scoped management endpoints. Takes a personal access
/// token, sent as a bearer header.
pub struct ManagementClient {
    api: ApiClient,
}

impl ManagementClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_MANAGEMENT_BASE, token)
    }

    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api: ApiClient::new(base_url, ApiAuth::Bearer(token.into())),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.api = self.api.with_retry(retry);
        self
    }

    /// Fetch the full asset listing of a space as raw records.
    ///
    /// Records stay untyped here; field aliasing is handled when the
    /// metadata index is built.
    pub async fn fetch_assets(&self, space_id: u64) -> Result<Vec<Value>, RequestError> {
        let path = format!("spaces/{}/assets", space_id);
        let assets = self.api.fetch_all_pages(&path, &[], "assets").await?;
        debug!(space_id, count = assets.len(), "Fetched asset listing");
        Ok(assets)
    }

    /// Fetch the component schemas of a space. The endpoint returns the
    /// whole list in one response; it is not paginated.
    pub async fn fetch_components(&self, space_id: u64) -> Result<Vec<Component>, RequestError> {
        let path = format!("spaces/{}/components", space_id);
        let payload = self.api.get_json(&path, &[]).await?;
        let raw = payload
            .get("components")
            .and_then(Value::as_array)
            .ok_or_else(|| RequestError::Shape {
                endpoint: path.clone(),
                detail: "missing 'components' array".to_string(),
            })?;

        let mut components = Vec::with_capacity(raw.len());
        for value in raw {
            match serde_json::from_value::<Component>(value.clone()) {
                Ok(component) => components.push(component),
                Err(err) => warn!(error = %err, "Skipping component with unexpected shape"),
            }
        }

        debug!(space_id, count = components.len(), "Fetched components");
        Ok(components)
    }

    /// Delete one component schema.
    pub async fn delete_component(
        &self,
        space_id: u64,
        component_id: u64,
    ) -> Result<(), RequestError> {
        let path = format!("spaces/{}/components/{}", space_id, component_id);
        self.api.delete(&path).await
    }
}
