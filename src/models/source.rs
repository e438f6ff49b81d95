use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A product as published by the source storefront's `products.json` feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceProduct {
    pub handle: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub body_html: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub variants: Vec<SourceVariant>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<SourceImage>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: Vec<SourceOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceVariant {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sku: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub compare_at_price: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub grams: u64,
    #[serde(default)]
    pub option1: Option<String>,
    #[serde(default)]
    pub option2: Option<String>,
    #[serde(default)]
    pub option3: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceImage {
    pub src: String,
    #[serde(default)]
    pub alt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceOption {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub values: Vec<String>,
}

impl SourceProduct {
    /// An empty variant list counts as available.
    pub fn is_available(&self) -> bool {
        self.variants.is_empty() || self.variants.iter().any(|v| v.available)
    }

    pub fn first_price(&self) -> Option<f64> {
        self.variants.first().and_then(|v| v.price)
    }

    pub fn summary(&self) -> SourceProductSummary {
        SourceProductSummary {
            handle: self.handle.clone(),
            title: self.title.clone(),
            price: self.first_price(),
            available: self.is_available(),
            variants: self.variants.len(),
            images: self.images.len(),
        }
    }
}

impl SourceVariant {
    pub fn weight_kg(&self) -> f64 {
        self.grams as f64 / 1000.0
    }
}

/// Compact view returned by fetch-only runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceProductSummary {
    pub handle: String,
    pub title: String,
    pub price: Option<f64>,
    pub available: bool,
    pub variants: usize,
    pub images: usize,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Storefront feeds send prices as strings ("1200.00"); anything non-numeric becomes None.
fn lenient_decimal<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}
