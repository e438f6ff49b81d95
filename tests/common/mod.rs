#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use catalog_mirror::config::Config;

pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{}", addr)
}

/// Everything pointed at one mock host, no pacing, one translation attempt.
pub fn test_config(base: &str) -> Config {
    Config {
        source_base_url: base.to_string(),
        category_labels: Vec::new(),
        destination_access_token: "shpat_test".to_string(),
        destination_api_base: Some(format!("{}/admin", base)),
        translation_api_base: base.to_string(),
        translation_api_key: "sk-test".to_string(),
        translation_max_retries: 1,
        http_timeout_ms: 5_000,
        translation_timeout_ms: 5_000,
        rate_limit_backoff_ms: 5,
        rate_limit_backoff_max_ms: 20,
        rate_limit_budget_ms: 2_000,
        ..Config::default()
    }
    .without_delays()
}

/// `(variant id, sku, price, grams, available)`
pub type VariantSpec<'a> = (u64, &'a str, &'a str, u64, bool);

pub fn source_product(handle: &str, title: &str, variants: &[VariantSpec]) -> Value {
    json!({
        "handle": handle,
        "title": title,
        "body_html": format!("<p>{}</p>", title),
        "variants": variants.iter().map(|(id, sku, price, grams, available)| json!({
            "id": id,
            "sku": sku,
            "title": format!("Variant {}", id),
            "price": price,
            "compare_at_price": null,
            "grams": grams,
            "option1": format!("Variant {}", id),
            "available": available,
        })).collect::<Vec<_>>(),
        "images": [{"src": format!("https://cdn.example.com/{}.jpg", handle), "alt": null}],
        "options": [{"name": "Title", "values": variants.iter().map(|(id, ..)| format!("Variant {}", id)).collect::<Vec<_>>()}],
    })
}

pub fn chat_reply(content: &str) -> Value {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
}

/// In-memory stand-in for the source storefront, the translation API and the
/// destination admin API (mounted under `/admin`).
#[derive(Default)]
pub struct MockShop {
    pub source: Vec<Value>,
    pub collections: Vec<(String, Vec<String>)>,
    pub failing_collections: Vec<String>,
    /// Message content returned by `/chat/completions`; `None` answers 500.
    pub translation_reply: Option<String>,
    pub source_delay_ms: u64,
    /// Destination handles whose lookup answers 500.
    pub failing_lookups: Vec<String>,
    /// Destination handles whose create or update answers 422.
    pub rejected_writes: Vec<String>,
    pub destination: Mutex<Vec<Value>>,
    pub calls: Mutex<Vec<String>>,
    pub next_id: AtomicU64,
}

impl MockShop {
    pub fn with_source(source: Vec<Value>) -> Self {
        Self { source, ..Self::default() }
    }

    pub fn seed_destination(&self, product: Value) {
        self.destination.lock().unwrap().push(product);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.starts_with(prefix)).count()
    }

    /// Calls made by the four-step stock zeroing sequence.
    pub fn inventory_calls(&self) -> usize {
        self.count("GET /admin/variants/")
            + self.count("GET /admin/locations.json")
            + self.count("POST /admin/inventory_levels/set.json")
            + self
                .calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.starts_with("PUT /admin/variants/") && c.ends_with("#policy"))
                .count()
    }

    pub fn destination_product(&self, handle: &str) -> Option<Value> {
        self.destination.lock().unwrap().iter().find(|p| p["handle"] == handle).cloned()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn router(shop: Arc<MockShop>) -> Router {
    Router::new()
        .route("/products.json", get(source_products))
        .route("/collections/{handle}/products.json", get(collection_products))
        .route("/chat/completions", post(chat_completions))
        .fallback(destination_api)
        .with_state(shop)
}

fn page_of<T: Clone>(items: &[T], q: &HashMap<String, String>) -> Vec<T> {
    let limit: usize = q.get("limit").and_then(|v| v.parse().ok()).unwrap_or(250);
    let page: usize = q.get("page").and_then(|v| v.parse().ok()).unwrap_or(1).max(1);
    items.iter().skip((page - 1) * limit).take(limit).cloned().collect()
}

async fn source_products(State(shop): State<Arc<MockShop>>, Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    shop.record(format!("GET /products.json?page={}", q.get("page").cloned().unwrap_or_default()));
    if shop.source_delay_ms > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(shop.source_delay_ms)).await;
    }
    Json(json!({ "products": page_of(&shop.source, &q) }))
}

async fn collection_products(
    State(shop): State<Arc<MockShop>>,
    Path(handle): Path<String>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    shop.record(format!("GET /collections/{}", handle));
    if shop.failing_collections.contains(&handle) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    let handles = shop
        .collections
        .iter()
        .find(|(c, _)| *c == handle)
        .map(|(_, h)| h.clone())
        .unwrap_or_default();
    let products: Vec<Value> = page_of(&handles, &q).into_iter().map(|h| json!({ "handle": h })).collect();
    Json(json!({ "products": products })).into_response()
}

async fn chat_completions(State(shop): State<Arc<MockShop>>) -> Response {
    shop.record("POST /chat/completions".to_string());
    match &shop.translation_reply {
        Some(content) => Json(chat_reply(content)).into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "translation unavailable").into_response(),
    }
}

async fn destination_api(State(shop): State<Arc<MockShop>>, method: Method, uri: Uri, body: Bytes) -> Response {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let path = uri.path().to_string();
    let mut call = format!("{} {}", method, path);
    if method == Method::PUT && path.starts_with("/admin/variants/") && body["variant"].get("inventory_policy").is_some() {
        call.push_str("#policy");
    }
    shop.record(call);

    let Some(rest) = path.strip_prefix("/admin") else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let segments: Vec<&str> = rest.trim_start_matches('/').split('/').collect();
    let id_of = |s: &str| s.trim_end_matches(".json").parse::<u64>().ok();
    let query: HashMap<String, String> = uri
        .query()
        .map(|q| {
            q.split('&')
                .filter_map(|kv| kv.split_once('='))
                .map(|(k, v)| (k.to_string(), v.replace('+', " ").replace("%20", " ")))
                .collect()
        })
        .unwrap_or_default();

    let mut products = shop.destination.lock().unwrap();
    match (method.as_str(), segments.as_slice()) {
        ("GET", ["products.json"]) => {
            if let Some(handle) = query.get("handle") {
                if shop.failing_lookups.contains(handle) {
                    return (StatusCode::INTERNAL_SERVER_ERROR, "lookup failed").into_response();
                }
                let found: Vec<Value> = products.iter().filter(|p| p["handle"] == handle.as_str()).cloned().collect();
                return Json(json!({ "products": found })).into_response();
            }
            let since: u64 = query.get("since_id").and_then(|v| v.parse().ok()).unwrap_or(0);
            let limit: usize = query.get("limit").and_then(|v| v.parse().ok()).unwrap_or(50);
            let mut page: Vec<Value> = products
                .iter()
                .filter(|p| p["id"].as_u64().unwrap_or(0) > since)
                .cloned()
                .collect();
            page.sort_by_key(|p| p["id"].as_u64().unwrap_or(0));
            page.truncate(limit);
            Json(json!({ "products": page })).into_response()
        }
        ("POST", ["products.json"]) => {
            if body["product"]["handle"].as_str().map(|h| shop.rejected_writes.iter().any(|r| r == h)).unwrap_or(false) {
                return unprocessable();
            }
            let id = 1000 + shop.next_id.fetch_add(1, Ordering::SeqCst);
            let mut product = body["product"].clone();
            product["id"] = json!(id);
            if let Some(variants) = product["variants"].as_array_mut() {
                for (i, v) in variants.iter_mut().enumerate() {
                    let vid = id * 100 + i as u64;
                    v["id"] = json!(vid);
                    v["inventory_item_id"] = json!(vid + 50_000);
                }
            }
            products.push(product.clone());
            (StatusCode::CREATED, Json(json!({ "product": product }))).into_response()
        }
        ("PUT", ["products", id]) => {
            let Some(id) = id_of(id) else { return StatusCode::NOT_FOUND.into_response() };
            let Some(product) = products.iter_mut().find(|p| p["id"].as_u64() == Some(id)) else {
                return StatusCode::NOT_FOUND.into_response();
            };
            if product["handle"].as_str().map(|h| shop.rejected_writes.iter().any(|r| r == h)).unwrap_or(false) {
                return unprocessable();
            }
            if let Some(fields) = body["product"].as_object() {
                for (k, v) in fields {
                    product[k.as_str()] = v.clone();
                }
            }
            Json(json!({ "product": product.clone() })).into_response()
        }
        ("DELETE", ["products", pid, "variants", vid]) => {
            let (Some(pid), Some(vid)) = (id_of(pid), id_of(vid)) else {
                return StatusCode::NOT_FOUND.into_response();
            };
            if let Some(variants) = products
                .iter_mut()
                .find(|p| p["id"].as_u64() == Some(pid))
                .and_then(|p| p["variants"].as_array_mut())
            {
                variants.retain(|v| v["id"].as_u64() != Some(vid));
            }
            Json(json!({})).into_response()
        }
        ("PUT", ["variants", vid]) | ("GET", ["variants", vid]) => {
            let Some(vid) = id_of(vid) else { return StatusCode::NOT_FOUND.into_response() };
            let variant = products
                .iter_mut()
                .filter_map(|p| p["variants"].as_array_mut())
                .flat_map(|vs| vs.iter_mut())
                .find(|v| v["id"].as_u64() == Some(vid));
            let Some(variant) = variant else { return StatusCode::NOT_FOUND.into_response() };
            if method == Method::PUT {
                if let Some(fields) = body["variant"].as_object() {
                    for (k, v) in fields {
                        variant[k.as_str()] = v.clone();
                    }
                }
            }
            Json(json!({ "variant": variant.clone() })).into_response()
        }
        ("GET", ["locations.json"]) => Json(json!({ "locations": [{"id": 77, "name": "Warehouse"}] })).into_response(),
        ("POST", ["inventory_levels", "set.json"]) => {
            Json(json!({ "inventory_level": { "available": body["available"].clone() } })).into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

fn unprocessable() -> Response {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "errors": { "title": ["is invalid"] } }))).into_response()
}
