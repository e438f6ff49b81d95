use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::models::*;

#[derive(Deserialize)]
struct ListingPage<T> {
    #[serde(default = "Vec::new")]
    products: Vec<T>,
}

/// Fetches `{products: [...]}` pages from a storefront listing endpoint.
#[derive(Clone)]
pub struct ListingFeed {
    client: Client,
}

impl ListingFeed {
    pub fn with_config(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(cfg.http_timeout_ms))
            .user_agent(cfg.http_user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }

    /// One page of the listing; 429 maps to [`MirrorError::RateLimited`].
    pub async fn fetch_page<T: DeserializeOwned>(&self, endpoint: &str, page: u32, limit: usize) -> Result<Vec<T>> {
        tracing::debug!(url = endpoint, page, limit, "Fetching listing page");
        let response = self
            .client
            .get(endpoint)
            .query(&[("limit", limit.to_string()), ("page", page.to_string())])
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(MirrorError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MirrorError::Api { status: status.as_u16(), body });
        }

        let page: ListingPage<T> = response.json().await?;
        Ok(page.products)
    }
}
