pub mod price;

pub use price::*;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;

use crate::config::Config;
use crate::models::*;

pub const DEFAULT_OPTION_NAME: &str = "Title";
pub const DEFAULT_OPTION_VALUE: &str = "Default Title";

/// Maps source products into destination payloads. Pure apart from the clock
/// read in [`ProductTransformer::transform`].
#[derive(Debug, Clone)]
pub struct ProductTransformer {
    subscription: Option<Regex>,
    formula: PriceFormula,
    source_base_url: String,
    vendor: String,
    title_prefix: String,
    handle_prefix: String,
    sku_prefix: String,
    brand_tags: Vec<String>,
    default_product_type: String,
    sold_out_tag: String,
    promo_markers: Vec<(String, String)>,
    lead_time: String,
}

impl ProductTransformer {
    pub fn new(cfg: &Config) -> Result<Self> {
        let subscription = if cfg.skip_subscription && !cfg.subscription_pattern.is_empty() {
            let re = Regex::new(&cfg.subscription_pattern).map_err(|e| {
                MirrorError::Configuration(format!("invalid subscription pattern '{}': {}", cfg.subscription_pattern, e))
            })?;
            Some(re)
        } else {
            None
        };
        Ok(Self {
            subscription,
            formula: PriceFormula::from_config(cfg),
            source_base_url: cfg.source_base_url.trim_end_matches('/').to_string(),
            vendor: cfg.vendor.clone(),
            title_prefix: cfg.title_prefix.clone(),
            handle_prefix: cfg.handle_prefix.clone(),
            sku_prefix: cfg.sku_prefix.clone(),
            brand_tags: cfg.brand_tags.clone(),
            default_product_type: cfg.default_product_type.clone(),
            sold_out_tag: cfg.sold_out_tag.clone(),
            promo_markers: cfg.promo_markers.clone(),
            lead_time: cfg.lead_time.clone(),
        })
    }

    pub fn formula(&self) -> PriceFormula {
        self.formula
    }

    pub fn is_subscription(&self, handle: &str) -> bool {
        self.subscription.as_ref().map(|re| re.is_match(handle)).unwrap_or(false)
    }

    /// Upsert key: prefix + source handle.
    pub fn destination_handle(&self, source_handle: &str) -> String {
        format!("{}{}", self.handle_prefix, source_handle)
    }

    pub fn variant_sku(&self, product: &SourceProduct, variant: &SourceVariant) -> String {
        let stem = if variant.sku.trim().is_empty() { product.handle.as_str() } else { variant.sku.trim() };
        format!("{}-{}-{}", self.sku_prefix, stem, variant.id)
    }

    pub fn prefixed_title(&self, title: &str) -> String {
        if title.starts_with(&self.title_prefix) {
            title.to_string()
        } else {
            format!("{}{}", self.title_prefix, title)
        }
    }

    pub fn source_url(&self, handle: &str) -> String {
        format!("{}/products/{}", self.source_base_url, handle)
    }

    pub fn transform(&self, source: &SourceProduct, translated: &TranslatedText, labels: &[String]) -> Option<TransformedProduct> {
        self.transform_at(source, translated, labels, Utc::now())
    }

    /// Returns None for subscription items, which are never synced.
    pub fn transform_at(
        &self,
        source: &SourceProduct,
        translated: &TranslatedText,
        labels: &[String],
        synced_at: DateTime<Utc>,
    ) -> Option<TransformedProduct> {
        if self.is_subscription(&source.handle) {
            return None;
        }

        let available = source.is_available();
        let tags = self.tags(source, labels, available);

        let mut variants = Vec::with_capacity(source.variants.len());
        let mut availability = Vec::with_capacity(source.variants.len());
        for v in &source.variants {
            let sku = self.variant_sku(source, v);
            let weight = v.weight_kg();
            let price = self.formula.price_opt(v.price, weight);
            let compare_at = self.formula.price_opt(v.compare_at_price, weight);
            let label = |o: &Option<String>| o.as_deref().map(|s| translated.option_label(s).to_string());
            variants.push(VariantPayload {
                title: translated.option_label(&v.title).to_string(),
                price: price.to_string(),
                compare_at_price: (compare_at > price).then(|| compare_at.to_string()),
                sku: sku.clone(),
                weight,
                weight_unit: "kg".to_string(),
                inventory_management: "shopify".to_string(),
                inventory_policy: "deny".to_string(),
                requires_shipping: true,
                option1: label(&v.option1),
                option2: label(&v.option2),
                option3: label(&v.option3),
            });
            availability.push(VariantAvailability { sku, source_variant_id: v.id, available: v.available });
        }

        let images = source
            .images
            .iter()
            .map(|img| ImagePayload { src: img.src.clone(), alt: translated.title.clone() })
            .collect();

        let options = source
            .options
            .iter()
            .map(|opt| {
                let name = opt.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(DEFAULT_OPTION_NAME);
                let values = if opt.values.is_empty() {
                    vec![DEFAULT_OPTION_VALUE.to_string()]
                } else {
                    opt.values.iter().map(|v| translated.option_label(v).to_string()).collect()
                };
                OptionPayload { name: translated.option_label(name).to_string(), values }
            })
            .collect();

        let source_url = self.source_url(&source.handle);
        let source_price = source
            .variants
            .first()
            .and_then(|v| v.price)
            .map(|p| p.to_string())
            .unwrap_or_else(|| "0".to_string());

        let payload = DestinationPayload {
            title: self.prefixed_title(&translated.title),
            handle: self.destination_handle(&source.handle),
            body_html: format!("{}{}", translated.description_html, self.provenance_block(&source_url)),
            vendor: self.vendor.clone(),
            product_type: labels.first().cloned().unwrap_or_else(|| self.default_product_type.clone()),
            tags: tags.join(", "),
            published: available,
            variants,
            images,
            options,
            metafields: vec![
                Metafield::text("source", "original_url", source_url),
                Metafield::text("source", "original_price", source_price),
                Metafield::text("source", "last_synced", synced_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
            ],
        };

        Some(TransformedProduct { payload, variants: availability })
    }

    fn tags(&self, source: &SourceProduct, labels: &[String], available: bool) -> Vec<String> {
        let mut tags: Vec<String> = self.brand_tags.clone();
        tags.extend(labels.iter().cloned());
        if !available {
            tags.push(self.sold_out_tag.clone());
        }
        for (needle, tag) in &self.promo_markers {
            if source.title.contains(needle.as_str()) && !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
        tags
    }

    fn provenance_block(&self, source_url: &str) -> String {
        format!(
            concat!(
                "\n<div class=\"product-source-info\" style=\"margin-top:20px;padding:15px;background:#f7f7f7;border-radius:8px;\">\n",
                "  <p style=\"margin:0 0 8px;font-weight:bold;\">📦 日本 {vendor} 官方商品</p>\n",
                "  <p style=\"margin:0 0 5px;font-size:14px;\">• 日本官網直送，100% 正品保證</p>\n",
                "  <p style=\"margin:0 0 5px;font-size:14px;\">• 商品來源：<a href=\"{url}\" target=\"_blank\">{vendor} Japan</a></p>\n",
                "  <p style=\"margin:0;font-size:14px;\">• 到貨時間約 {lead} 個工作天</p>\n",
                "</div>"
            ),
            vendor = self.vendor,
            url = source_url,
            lead = self.lead_time,
        )
    }
}
