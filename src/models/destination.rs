use serde::{Deserialize, Serialize};

/// Create-ready product body for the destination admin API.
///
/// Carries no reconciliation metadata; see [`TransformedProduct`] for that.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DestinationPayload {
    pub title: String,
    pub handle: String,
    pub body_html: String,
    pub vendor: String,
    pub product_type: String,
    pub tags: String,
    pub published: bool,
    pub variants: Vec<VariantPayload>,
    pub images: Vec<ImagePayload>,
    pub options: Vec<OptionPayload>,
    pub metafields: Vec<Metafield>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariantPayload {
    pub title: String,
    pub price: String,
    pub compare_at_price: Option<String>,
    pub sku: String,
    pub weight: f64,
    pub weight_unit: String,
    pub inventory_management: String,
    pub inventory_policy: String,
    pub requires_shipping: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option3: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImagePayload {
    pub src: String,
    pub alt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OptionPayload {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metafield {
    pub namespace: String,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Metafield {
    pub fn text(namespace: &str, key: &str, value: impl Into<String>) -> Self {
        Self {
            namespace: namespace.to_string(),
            key: key.to_string(),
            value: value.into(),
            kind: "single_line_text_field".to_string(),
        }
    }
}

/// Per-variant availability kept beside the payload for reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantAvailability {
    pub sku: String,
    pub source_variant_id: u64,
    pub available: bool,
}

#[derive(Debug, Clone)]
pub struct TransformedProduct {
    pub payload: DestinationPayload,
    pub variants: Vec<VariantAvailability>,
}

impl TransformedProduct {
    pub fn availability_for_sku(&self, sku: &str) -> Option<&VariantAvailability> {
        self.variants.iter().find(|v| v.sku == sku)
    }

    /// Fields refreshed on an existing product; variants are left alone.
    pub fn update_fields(&self) -> ProductUpdate {
        ProductUpdate {
            title: self.payload.title.clone(),
            body_html: self.payload.body_html.clone(),
            tags: self.payload.tags.clone(),
            published: self.payload.published,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductUpdate {
    pub title: String,
    pub body_html: String,
    pub tags: String,
    pub published: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationProduct {
    pub id: u64,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub variants: Vec<DestinationVariant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationVariant {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub inventory_item_id: Option<u64>,
}
