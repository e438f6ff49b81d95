use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::handlers::feed::ListingFeed;
use crate::models::*;
use crate::sync::pacing::{PaceStep, RequestPacer};

#[derive(Deserialize)]
struct HandleOnly {
    handle: String,
}

/// Product handle -> category labels in encounter order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryIndex {
    labels: HashMap<String, Vec<String>>,
}

impl CategoryIndex {
    pub fn labels_for(&self, handle: &str) -> &[String] {
        self.labels.get(handle).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn insert(&mut self, handle: &str, label: &str) {
        self.labels.entry(handle.to_string()).or_default().push(label.to_string());
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Clone)]
pub struct CategoryIndexer {
    feed: ListingFeed,
    base_url: String,
    page_size: usize,
    pacer: Arc<dyn RequestPacer>,
}

impl CategoryIndexer {
    pub fn new(cfg: &Config, feed: ListingFeed, pacer: Arc<dyn RequestPacer>) -> Self {
        Self {
            feed,
            base_url: cfg.source_base_url.trim_end_matches('/').to_string(),
            page_size: cfg.source_page_size.max(1),
            pacer,
        }
    }

    /// Visits categories in the given order; a failing category is skipped.
    pub async fn build_index(&self, categories: &[(String, String)]) -> CategoryIndex {
        let mut index = CategoryIndex::default();
        tracing::info!(categories = categories.len(), "Building category index");

        for (collection, label) in categories {
            match self.collection_handles(collection).await {
                Ok(handles) => {
                    for handle in &handles {
                        index.insert(handle, label);
                    }
                    tracing::info!(collection = %collection, label = %label, products = handles.len(), "Indexed category");
                }
                Err(e) => {
                    tracing::warn!(collection = %collection, error = %e, "Category fetch failed; skipping");
                }
            }
            self.pacer.wait(PaceStep::Category).await;
        }

        tracing::info!(products = index.len(), "Category index built");
        index
    }

    async fn collection_handles(&self, collection: &str) -> Result<Vec<String>> {
        let endpoint = format!("{}/collections/{}/products.json", self.base_url, collection);
        let mut handles = Vec::new();
        let mut page: u32 = 1;
        loop {
            let batch: Vec<HandleOnly> = self.feed.fetch_page(&endpoint, page, self.page_size).await?;
            let count = batch.len();
            handles.extend(batch.into_iter().map(|p| p.handle));
            if count < self.page_size {
                return Ok(handles);
            }
            page += 1;
            self.pacer.wait(PaceStep::CategoryPage).await;
        }
    }
}
