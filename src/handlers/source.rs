use std::sync::Arc;

use crate::config::Config;
use crate::handlers::feed::ListingFeed;
use crate::models::*;
use crate::sync::pacing::{BackoffPolicy, PaceStep, RequestPacer};

/// Pages the source storefront's full listing into memory.
#[derive(Clone)]
pub struct SourceCatalogReader {
    feed: ListingFeed,
    endpoint: String,
    page_size: usize,
    backoff: BackoffPolicy,
    pacer: Arc<dyn RequestPacer>,
}

impl SourceCatalogReader {
    pub fn new(cfg: &Config, feed: ListingFeed, pacer: Arc<dyn RequestPacer>) -> Self {
        Self {
            feed,
            endpoint: format!("{}/products.json", cfg.source_base_url.trim_end_matches('/')),
            page_size: cfg.source_page_size.max(1),
            backoff: BackoffPolicy::rate_limit(cfg),
            pacer,
        }
    }

    /// Reads every page until an empty or short page.
    ///
    /// Errors other than a recoverable 429 end the read early; whatever was
    /// collected so far is returned, so callers must cope with a truncated list.
    pub async fn fetch_all(&self) -> Vec<SourceProduct> {
        let mut products: Vec<SourceProduct> = Vec::new();
        let mut page: u32 = 1;
        let mut backoff = self.backoff.start();

        tracing::info!(url = %self.endpoint, page_size = self.page_size, "Fetching source catalog");
        loop {
            match self.feed.fetch_page::<SourceProduct>(&self.endpoint, page, self.page_size).await {
                Ok(batch) => {
                    let count = batch.len();
                    products.extend(batch);
                    tracing::info!(page, count, accumulated = products.len(), "Fetched source page");
                    if count < self.page_size {
                        break;
                    }
                    page += 1;
                    backoff = self.backoff.start();
                    self.pacer.wait(PaceStep::SourcePage).await;
                }
                Err(MirrorError::RateLimited) => match backoff.next_delay() {
                    Some(delay) => {
                        tracing::warn!(page, attempt = backoff.attempts(), backoff_ms = delay.as_millis() as u64, "Source feed rate limited; retrying same page");
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        tracing::error!(page, attempts = backoff.attempts(), accumulated = products.len(), "Rate limit backoff budget exhausted; returning partial catalog");
                        break;
                    }
                },
                Err(e) => {
                    tracing::error!(page, error = %e, accumulated = products.len(), "Source page fetch failed; returning partial catalog");
                    break;
                }
            }
        }

        tracing::info!(total = products.len(), pages = page, "Source catalog fetched");
        products
    }
}
