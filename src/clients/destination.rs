use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::Config;
use crate::models::*;

#[derive(Deserialize)]
struct ProductsEnvelope {
    #[serde(default)]
    products: Vec<DestinationProduct>,
}

#[derive(Deserialize)]
struct ProductEnvelope {
    product: DestinationProduct,
}

#[derive(Deserialize)]
struct VariantEnvelope {
    variant: DestinationVariant,
}

#[derive(Deserialize)]
struct Location {
    id: u64,
}

#[derive(Deserialize)]
struct LocationsEnvelope {
    #[serde(default)]
    locations: Vec<Location>,
}

/// Typed wrapper over the destination store's admin REST API.
#[derive(Clone)]
pub struct DestinationCatalogClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl DestinationCatalogClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(cfg.http_timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.destination_base_url(),
            access_token: cfg.destination_access_token.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("X-Shopify-Access-Token", &self.access_token)
            .header("Content-Type", "application/json")
    }

    async fn send<T: DeserializeOwned>(&self, op: &'static str, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(op, status = %status, body_preview = %body_preview(&body), "Destination API call failed");
            return Err(MirrorError::Api { status: status.as_u16(), body });
        }
        Ok(response.json().await?)
    }

    async fn send_empty(&self, op: &'static str, builder: RequestBuilder) -> Result<()> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(op, status = %status, body_preview = %body_preview(&body), "Destination API call failed");
            return Err(MirrorError::Api { status: status.as_u16(), body });
        }
        Ok(())
    }

    pub async fn find_by_handle(&self, handle: &str) -> Result<Option<DestinationProduct>> {
        let builder = self
            .request(Method::GET, "/products.json")
            .query(&[("handle", handle), ("limit", "1")]);
        let envelope: ProductsEnvelope = self.send("find_by_handle", builder).await?;
        // Older API versions ignore the handle filter, so check it here too.
        Ok(envelope.products.into_iter().find(|p| p.handle.is_empty() || p.handle == handle))
    }

    pub async fn create(&self, payload: &DestinationPayload) -> Result<DestinationProduct> {
        let builder = self
            .request(Method::POST, "/products.json")
            .json(&serde_json::json!({ "product": payload }));
        let envelope: ProductEnvelope = self.send("create", builder).await?;
        tracing::info!(handle = %payload.handle, product_id = envelope.product.id, variants = envelope.product.variants.len(), "Created destination product");
        Ok(envelope.product)
    }

    pub async fn update(&self, product_id: u64, fields: &ProductUpdate) -> Result<DestinationProduct> {
        let mut product = serde_json::to_value(fields)?;
        if let Value::Object(map) = &mut product {
            map.insert("id".to_string(), Value::from(product_id));
        }
        let builder = self
            .request(Method::PUT, &format!("/products/{}.json", product_id))
            .json(&serde_json::json!({ "product": product }));
        let envelope: ProductEnvelope = self.send("update", builder).await?;
        Ok(envelope.product)
    }

    pub async fn delete_variant(&self, product_id: u64, variant_id: u64) -> Result<()> {
        let builder = self.request(Method::DELETE, &format!("/products/{}/variants/{}.json", product_id, variant_id));
        self.send_empty("delete_variant", builder).await
    }

    /// Zeroes a variant's stock at the first location.
    ///
    /// Best-effort: any failing step is logged and reported as `false`.
    pub async fn mark_variant_unavailable(&self, variant_id: u64) -> bool {
        match self.zero_inventory(variant_id).await {
            Ok(()) => {
                tracing::info!(variant_id, "Marked variant unavailable");
                true
            }
            Err(e) => {
                tracing::warn!(variant_id, error = %e, "Failed to mark variant unavailable");
                false
            }
        }
    }

    async fn zero_inventory(&self, variant_id: u64) -> Result<()> {
        let policy = self
            .request(Method::PUT, &format!("/variants/{}.json", variant_id))
            .json(&serde_json::json!({
                "variant": { "id": variant_id, "inventory_management": "shopify", "inventory_policy": "deny" }
            }));
        self.send_empty("set_inventory_policy", policy).await?;

        let variant: VariantEnvelope = self
            .send("get_variant", self.request(Method::GET, &format!("/variants/{}.json", variant_id)))
            .await?;
        let inventory_item_id = variant
            .variant
            .inventory_item_id
            .ok_or_else(|| MirrorError::Sync(format!("variant {} has no inventory item", variant_id)))?;

        let locations: LocationsEnvelope = self.send("list_locations", self.request(Method::GET, "/locations.json")).await?;
        let location_id = locations
            .locations
            .first()
            .map(|l| l.id)
            .ok_or_else(|| MirrorError::Sync("destination store has no locations".to_string()))?;

        let level = self
            .request(Method::POST, "/inventory_levels/set.json")
            .json(&serde_json::json!({
                "location_id": location_id,
                "inventory_item_id": inventory_item_id,
                "available": 0,
            }));
        self.send_empty("set_inventory_level", level).await
    }

    /// One page of products for a vendor, ordered by id after `since_id`.
    pub async fn list_products_page(&self, vendor: &str, since_id: u64, limit: usize) -> Result<Vec<DestinationProduct>> {
        let builder = self.request(Method::GET, "/products.json").query(&[
            ("limit", limit.to_string()),
            ("since_id", since_id.to_string()),
            ("vendor", vendor.to_string()),
        ]);
        let envelope: ProductsEnvelope = self.send("list_products", builder).await?;
        Ok(envelope.products)
    }

    pub async fn update_variant_price(&self, variant_id: u64, price: i64) -> Result<()> {
        let builder = self
            .request(Method::PUT, &format!("/variants/{}.json", variant_id))
            .json(&serde_json::json!({ "variant": { "id": variant_id, "price": price.to_string() } }));
        self.send_empty("update_variant_price", builder).await
    }
}
