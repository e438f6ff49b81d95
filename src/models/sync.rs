use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Localized listing text for one product within one run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TranslatedText {
    pub title: String,
    pub description_html: String,
    /// Original option name/value -> translated label.
    pub option_labels: HashMap<String, String>,
}

impl TranslatedText {
    pub fn untranslated(title: &str, description_html: &str) -> Self {
        Self {
            title: title.to_string(),
            description_html: description_html.to_string(),
            option_labels: HashMap::new(),
        }
    }

    pub fn option_label<'a>(&'a self, original: &'a str) -> &'a str {
        self.option_labels
            .get(original)
            .map(|s| s.as_str())
            .unwrap_or(original)
    }
}

/// Counters produced by one full sync run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncResult {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Success,
    Skip,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DryUploadItem {
    pub handle: String,
    pub title: String,
    pub source_price: Option<f64>,
    pub destination_id: Option<u64>,
    pub status: ItemStatus,
    pub detail: String,
}

/// Result of a bounded dry-run upload, with one entry per visited product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DryUploadResult {
    pub created: usize,
    pub skipped: usize,
    pub errors: usize,
    pub total: usize,
    pub items: Vec<DryUploadItem>,
}

impl DryUploadResult {
    pub(crate) fn record(&mut self, item: DryUploadItem) {
        match item.status {
            ItemStatus::Success => self.created += 1,
            ItemStatus::Skip => self.skipped += 1,
            ItemStatus::Error => self.errors += 1,
        }
        self.total += 1;
        self.items.push(item);
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RepriceResult {
    pub updated: usize,
    pub divisor: f64,
}
