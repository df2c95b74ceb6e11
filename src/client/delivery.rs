//! Delivery API client (read-only content listing).

use tracing::{debug, warn};

use crate::client::{ApiAuth, ApiClient, RequestError, RetryPolicy};
use crate::domain::story::{ContentVersion, Story};

/// Public delivery API base.
pub const DEFAULT_DELIVERY_BASE: &str = "https://api.storyblok.com/v2";

/// Read-only client for listing the stories a token gives access to.
pub struct DeliveryClient {
    api: ApiClient,
}

impl DeliveryClient {
    /// The token is scoped to one space and rides in the query string;
    /// that is how this API authenticates.
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_url(DEFAULT_DELIVERY_BASE, token)
    }

    pub fn with_base_url(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api: ApiClient::new(base_url, ApiAuth::QueryToken(token.into())),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.api = self.api.with_retry(retry);
        self
    }

    /// Fetch every story, draft or published per `version`.
    pub async fn fetch_stories(
        &self,
        version: ContentVersion,
    ) -> Result<Vec<Story>, RequestError> {
        let params = vec![("version".to_string(), version.as_str().to_string())];
        let raw = self
            .api
            .fetch_all_pages("cdn/stories", &params, "stories")
            .await?;

        let mut stories = Vec::with_capacity(raw.len());
        for value in &raw {
            match serde_json::from_value::<Story>(value.clone()) {
                Ok(story) => stories.push(story),
                Err(err) => warn!(error = %err, "Skipping story with unexpected shape"),
            }
        }

        debug!(count = stories.len(), version = %version, "Fetched stories");
        Ok(stories)
    }
}
