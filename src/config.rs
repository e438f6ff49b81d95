use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Source storefront
    pub source_base_url: String,
    pub source_page_size: usize,
    /// Ordered collection handle -> display label; order decides the product type.
    pub category_labels: Vec<(String, String)>,
    // Destination admin API
    pub destination_shop: String,
    pub destination_access_token: String,
    pub destination_api_version: String,
    // Optional full base URL override (e.g. a local mock)
    pub destination_api_base: Option<String>,
    // Translation service (OpenAI-compatible chat completions)
    pub translation_api_base: String,
    pub translation_api_key: String,
    pub translation_model: String,
    pub translation_source_language: String,
    pub translation_target_language: String,
    pub translation_max_retries: u32,
    pub translation_retry_delay_ms: u64,
    // HTTP
    pub http_timeout_ms: u64,
    pub translation_timeout_ms: u64,
    pub http_user_agent: String,
    // Pacing
    pub request_delay_ms: u64,
    pub translation_delay_ms: u64,
    pub lookup_delay_ms: u64,
    pub category_delay_ms: u64,
    pub variant_delete_delay_ms: u64,
    pub price_update_delay_ms: u64,
    // 429 backoff
    pub rate_limit_backoff_ms: u64,
    pub rate_limit_backoff_max_ms: u64,
    pub rate_limit_budget_ms: u64,
    // Price formula
    pub price_divisor: f64,
    pub price_weight_multiplier: f64,
    pub price_round_to: i64,
    // Business rules
    pub subscription_pattern: String,
    pub skip_subscription: bool,
    pub reconcile_variants: bool,
    pub vendor: String,
    pub title_prefix: String,
    pub handle_prefix: String,
    pub sku_prefix: String,
    pub brand_tags: Vec<String>,
    pub default_product_type: String,
    pub sold_out_tag: String,
    /// Title substring -> promotional tag.
    pub promo_markers: Vec<(String, String)>,
    pub lead_time: String,
}

impl Default for Config {
    fn default() -> Self {
        let pairs = |items: &[(&str, &str)]| -> Vec<(String, String)> {
            items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        };
        Self {
            source_base_url: "https://store.bluebottlecoffee.jp".to_string(),
            source_page_size: 250,
            category_labels: pairs(&[
                ("coffee", "咖啡"),
                ("blend", "綜合咖啡"),
                ("single-origin", "單品咖啡"),
                ("instant-coffee", "即溶咖啡"),
                ("nola-base", "Nola Base"),
                ("coffee-set", "咖啡套組"),
                ("drinkwear", "飲品器皿"),
                ("mug", "馬克杯"),
                ("bottle", "隨行杯/水瓶"),
                ("brewing", "沖泡器具"),
                ("lifestyle", "生活雜貨"),
                ("apparel", "服飾配件"),
                ("others", "其他雜貨"),
                ("food", "食品"),
                ("granola", "穀麥片"),
                ("yokan", "羊羹"),
                ("drink", "其他飲品"),
                ("alcohol", "酒類"),
                ("hm", "Human Made 聯名"),
                ("gift", "禮品套組"),
                ("new-item", "新品"),
                ("online_limited", "線上限定"),
                ("ranking", "暢銷排行"),
            ]),
            destination_shop: String::new(),
            destination_access_token: String::new(),
            destination_api_version: "2024-10".to_string(),
            destination_api_base: None,
            translation_api_base: "https://api.openai.com/v1".to_string(),
            translation_api_key: String::new(),
            translation_model: "gpt-4o-mini".to_string(),
            translation_source_language: "Japanese".to_string(),
            translation_target_language: "Traditional Chinese".to_string(),
            translation_max_retries: 3,
            translation_retry_delay_ms: 2000,
            http_timeout_ms: 30_000,
            translation_timeout_ms: 60_000,
            http_user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            request_delay_ms: 1000,
            translation_delay_ms: 500,
            lookup_delay_ms: 300,
            category_delay_ms: 500,
            variant_delete_delay_ms: 300,
            price_update_delay_ms: 200,
            rate_limit_backoff_ms: 10_000,
            rate_limit_backoff_max_ms: 60_000,
            rate_limit_budget_ms: 600_000,
            price_divisor: 0.7,
            price_weight_multiplier: 1250.0,
            price_round_to: 10,
            subscription_pattern: "^su".to_string(),
            skip_subscription: true,
            reconcile_variants: true,
            vendor: "Blue Bottle Coffee".to_string(),
            title_prefix: "【藍瓶咖啡】".to_string(),
            handle_prefix: "bbc-".to_string(),
            sku_prefix: "BBC".to_string(),
            brand_tags: vec![
                "Blue Bottle Coffee".to_string(),
                "藍瓶咖啡".to_string(),
                "日本代購".to_string(),
            ],
            default_product_type: "咖啡".to_string(),
            sold_out_tag: "售罄".to_string(),
            promo_markers: pairs(&[
                ("ヒューマンメイド", "Human Made 聯名"),
                ("Human Made", "Human Made 聯名"),
                ("オンライン限定", "線上限定"),
                ("期間限定", "期間限定"),
            ]),
            lead_time: "7-14".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let get = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
        let d = Self::default();

        Self {
            source_base_url: get("SOURCE_BASE_URL").unwrap_or(d.source_base_url),
            source_page_size: get("SOURCE_PAGE_SIZE").and_then(|s| s.parse().ok()).unwrap_or(d.source_page_size),
            category_labels: get("CATEGORY_MAP").map(|s| parse_pairs(&s)).unwrap_or(d.category_labels),
            destination_shop: get("DESTINATION_SHOP").or_else(|| get("SHOPIFY_SHOP")).unwrap_or(d.destination_shop),
            destination_access_token: get("DESTINATION_ACCESS_TOKEN")
                .or_else(|| get("SHOPIFY_ACCESS_TOKEN"))
                .unwrap_or(d.destination_access_token),
            destination_api_version: get("DESTINATION_API_VERSION").unwrap_or(d.destination_api_version),
            destination_api_base: get("DESTINATION_API_BASE"),
            translation_api_base: get("TRANSLATION_API_BASE").unwrap_or(d.translation_api_base),
            translation_api_key: get("TRANSLATION_API_KEY")
                .or_else(|| get("OPENAI_API_KEY"))
                .unwrap_or(d.translation_api_key),
            translation_model: get("TRANSLATION_MODEL")
                .or_else(|| get("OPENAI_MODEL"))
                .unwrap_or(d.translation_model),
            translation_source_language: get("TRANSLATION_SOURCE_LANGUAGE").unwrap_or(d.translation_source_language),
            translation_target_language: get("TRANSLATION_TARGET_LANGUAGE").unwrap_or(d.translation_target_language),
            translation_max_retries: get("TRANSLATION_MAX_RETRIES").and_then(|s| s.parse().ok()).unwrap_or(d.translation_max_retries),
            translation_retry_delay_ms: get("TRANSLATION_RETRY_DELAY_MS").and_then(|s| s.parse().ok()).unwrap_or(d.translation_retry_delay_ms),
            http_timeout_ms: get("HTTP_TIMEOUT_MS").and_then(|s| s.parse().ok()).unwrap_or(d.http_timeout_ms),
            translation_timeout_ms: get("TRANSLATION_TIMEOUT_MS").and_then(|s| s.parse().ok()).unwrap_or(d.translation_timeout_ms),
            http_user_agent: get("HTTP_USER_AGENT").unwrap_or(d.http_user_agent),
            request_delay_ms: get("REQUEST_DELAY_MS").and_then(|s| s.parse().ok()).unwrap_or(d.request_delay_ms),
            translation_delay_ms: get("TRANSLATION_DELAY_MS").and_then(|s| s.parse().ok()).unwrap_or(d.translation_delay_ms),
            lookup_delay_ms: get("LOOKUP_DELAY_MS").and_then(|s| s.parse().ok()).unwrap_or(d.lookup_delay_ms),
            category_delay_ms: get("CATEGORY_DELAY_MS").and_then(|s| s.parse().ok()).unwrap_or(d.category_delay_ms),
            variant_delete_delay_ms: get("VARIANT_DELETE_DELAY_MS").and_then(|s| s.parse().ok()).unwrap_or(d.variant_delete_delay_ms),
            price_update_delay_ms: get("PRICE_UPDATE_DELAY_MS").and_then(|s| s.parse().ok()).unwrap_or(d.price_update_delay_ms),
            rate_limit_backoff_ms: get("RATE_LIMIT_BACKOFF_MS").and_then(|s| s.parse().ok()).unwrap_or(d.rate_limit_backoff_ms),
            rate_limit_backoff_max_ms: get("RATE_LIMIT_BACKOFF_MAX_MS").and_then(|s| s.parse().ok()).unwrap_or(d.rate_limit_backoff_max_ms),
            rate_limit_budget_ms: get("RATE_LIMIT_BUDGET_MS").and_then(|s| s.parse().ok()).unwrap_or(d.rate_limit_budget_ms),
            price_divisor: get("PRICE_DIVISOR").and_then(|s| s.parse().ok()).unwrap_or(d.price_divisor),
            price_weight_multiplier: get("PRICE_WEIGHT_MULTIPLIER").and_then(|s| s.parse().ok()).unwrap_or(d.price_weight_multiplier),
            price_round_to: get("PRICE_ROUND_TO").and_then(|s| s.parse().ok()).unwrap_or(d.price_round_to),
            subscription_pattern: get("SUBSCRIPTION_PATTERN").unwrap_or(d.subscription_pattern),
            skip_subscription: get("SKIP_SUBSCRIPTION").and_then(|s| parse_bool(&s)).unwrap_or(d.skip_subscription),
            reconcile_variants: get("RECONCILE_VARIANTS").and_then(|s| parse_bool(&s)).unwrap_or(d.reconcile_variants),
            vendor: get("VENDOR").unwrap_or(d.vendor),
            title_prefix: get("TITLE_PREFIX").unwrap_or(d.title_prefix),
            handle_prefix: get("HANDLE_PREFIX").unwrap_or(d.handle_prefix),
            sku_prefix: get("SKU_PREFIX").unwrap_or(d.sku_prefix),
            brand_tags: get("BRAND_TAGS")
                .map(|s| s.split(',').map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect())
                .unwrap_or(d.brand_tags),
            default_product_type: get("DEFAULT_PRODUCT_TYPE").unwrap_or(d.default_product_type),
            sold_out_tag: get("SOLD_OUT_TAG").unwrap_or(d.sold_out_tag),
            promo_markers: get("PROMO_MARKERS").map(|s| parse_pairs(&s)).unwrap_or(d.promo_markers),
            lead_time: get("LEAD_TIME").unwrap_or(d.lead_time),
        }
    }

    /// Base URL of the destination admin API, e.g. `https://shop.myshopify.com/admin/api/2024-10`.
    pub fn destination_base_url(&self) -> String {
        if let Some(base) = &self.destination_api_base {
            return base.trim_end_matches('/').to_string();
        }
        let shop = self.destination_shop.trim_end_matches('/');
        let host = if shop.contains('.') { shop.to_string() } else { format!("{}.myshopify.com", shop) };
        let host = if host.starts_with("http://") || host.starts_with("https://") { host } else { format!("https://{}", host) };
        format!("{}/admin/api/{}", host, self.destination_api_version)
    }

    /// Copy with every pacing delay set to zero; backoff stays as configured.
    pub fn without_delays(mut self) -> Self {
        self.request_delay_ms = 0;
        self.translation_delay_ms = 0;
        self.lookup_delay_ms = 0;
        self.category_delay_ms = 0;
        self.variant_delete_delay_ms = 0;
        self.price_update_delay_ms = 0;
        self.translation_retry_delay_ms = 0;
        self
    }
}

// "a=b;c=d" keeps declaration order, which a map would lose.
fn parse_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|entry| {
            let (k, v) = entry.split_once('=')?;
            let (k, v) = (k.trim(), v.trim());
            if k.is_empty() || v.is_empty() { None } else { Some((k.to_string(), v.to_string())) }
        })
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
