use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::clients::*;
use crate::config::Config;
use crate::handlers::*;
use crate::mapping::*;
use crate::models::*;
use crate::sync::coordinator::{RunCoordinator, RunGuard};
use crate::sync::pacing::{FixedDelayPacer, PaceStep, RequestPacer};
use crate::sync::reconcile::VariantReconciler;

const REPRICE_PAGE_SIZE: usize = 250;

/// What happened to one product in a full sync.
enum Upsert {
    Created,
    Updated,
    Skipped,
}

/// Drives the mirror pipeline. Cheap to clone; clones share the run slot.
#[derive(Clone)]
pub struct SyncEngine {
    cfg: Arc<Config>,
    reader: SourceCatalogReader,
    indexer: CategoryIndexer,
    translator: Translator,
    transformer: ProductTransformer,
    destination: DestinationCatalogClient,
    reconciler: VariantReconciler,
    pacer: Arc<dyn RequestPacer>,
    coordinator: RunCoordinator,
}

impl SyncEngine {
    pub fn new(cfg: Config) -> Result<Self> {
        let pacer: Arc<dyn RequestPacer> = Arc::new(FixedDelayPacer::from_config(&cfg));
        Self::with_pacer(cfg, pacer)
    }

    pub fn with_pacer(cfg: Config, pacer: Arc<dyn RequestPacer>) -> Result<Self> {
        let feed = ListingFeed::with_config(&cfg)?;
        let destination = DestinationCatalogClient::new(&cfg)?;
        Ok(Self {
            reader: SourceCatalogReader::new(&cfg, feed.clone(), pacer.clone()),
            indexer: CategoryIndexer::new(&cfg, feed, pacer.clone()),
            translator: Translator::new(&cfg, pacer.clone())?,
            transformer: ProductTransformer::new(&cfg)?,
            reconciler: VariantReconciler::new(destination.clone(), pacer.clone()),
            destination,
            pacer,
            coordinator: RunCoordinator::new(),
            cfg: Arc::new(cfg),
        })
    }

    pub fn coordinator(&self) -> &RunCoordinator {
        &self.coordinator
    }

    pub fn is_running(&self) -> bool {
        self.coordinator.is_running()
    }

    pub fn run_started_at(&self) -> Option<DateTime<Utc>> {
        self.coordinator.started_at()
    }

    fn acquire(&self) -> Result<RunGuard> {
        self.coordinator.try_acquire().ok_or_else(|| {
            tracing::warn!("Run requested while another run is active; rejecting");
            MirrorError::RunInProgress
        })
    }

    /// Full pass over the source catalog.
    pub async fn run_full_sync(&self) -> Result<SyncResult> {
        let _guard = self.acquire()?;
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("full_sync", %run_id);
        async move {
            let start = Instant::now();
            tracing::info!("Full sync started");

            let products = self.reader.fetch_all().await;
            if products.is_empty() {
                tracing::warn!("Source catalog returned no products");
                return Ok(SyncResult::default());
            }
            let index = self.indexer.build_index(&self.cfg.category_labels).await;

            let mut result = SyncResult { total: products.len(), ..SyncResult::default() };
            for (i, source) in products.iter().enumerate() {
                tracing::info!(position = i + 1, total = products.len(), handle = %source.handle, title = %source.title, "Processing product");
                match self.sync_product(source, &index).await {
                    Ok(Upsert::Created) => result.created += 1,
                    Ok(Upsert::Updated) => result.updated += 1,
                    Ok(Upsert::Skipped) => result.skipped += 1,
                    Err(e) => {
                        tracing::error!(handle = %source.handle, error = %e, "Product sync failed");
                        result.errors += 1;
                    }
                }
            }

            tracing::info!(
                created = result.created,
                updated = result.updated,
                skipped = result.skipped,
                errors = result.errors,
                total = result.total,
                duration_ms = start.elapsed().as_millis() as u64,
                "Full sync finished"
            );
            Ok(result)
        }
        .instrument(span)
        .await
    }

    async fn sync_product(&self, source: &SourceProduct, index: &CategoryIndex) -> Result<Upsert> {
        if self.transformer.is_subscription(&source.handle) {
            tracing::info!(handle = %source.handle, "Skipping subscription item");
            return Ok(Upsert::Skipped);
        }

        let translated = self.translator.translate(&source.title, &source.body_html, &source.options).await;
        self.pacer.wait(PaceStep::Translation).await;

        let Some(transformed) = self.transformer.transform(source, &translated, index.labels_for(&source.handle)) else {
            return Ok(Upsert::Skipped);
        };

        let existing = self.destination.find_by_handle(&transformed.payload.handle).await;
        self.pacer.wait(PaceStep::Lookup).await;

        let outcome = match existing {
            Err(e) => Err(e),
            Ok(Some(existing)) => {
                tracing::info!(handle = %source.handle, product_id = existing.id, "Updating existing product");
                if self.cfg.reconcile_variants {
                    let r = self.reconciler.reconcile(&existing, &transformed).await;
                    tracing::debug!(deleted = r.deleted, marked_unavailable = r.marked_unavailable, failed = r.failed, "Variants reconciled");
                }
                self.destination.update(existing.id, &transformed.update_fields()).await.map(|_| Upsert::Updated)
            }
            Ok(None) => {
                tracing::info!(handle = %source.handle, "Creating new product");
                self.create_product(&transformed).await.map(|_| Upsert::Created)
            }
        };

        self.pacer.wait(PaceStep::Product).await;
        outcome
    }

    /// Creates the product, then zeroes stock of variants that are sold out at the source,
    /// since stock cannot be set in the create call itself.
    async fn create_product(&self, transformed: &TransformedProduct) -> Result<DestinationProduct> {
        let created = self.destination.create(&transformed.payload).await?;
        if self.cfg.reconcile_variants {
            for variant in &created.variants {
                let sold_out = variant
                    .sku
                    .as_deref()
                    .and_then(|sku| transformed.availability_for_sku(sku))
                    .map(|v| !v.available)
                    .unwrap_or(false);
                if sold_out {
                    self.destination.mark_variant_unavailable(variant.id).await;
                }
            }
        }
        Ok(created)
    }

    /// Smoke test: creates up to `count` new products and stops, skipping anything
    /// already mirrored or sold out.
    pub async fn run_dry_upload(&self, count: usize) -> Result<DryUploadResult> {
        let _guard = self.acquire()?;
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("dry_upload", %run_id, target = count);
        async move {
            tracing::info!("Dry-run upload started");
            let mut result = DryUploadResult::default();

            let products = self.reader.fetch_all().await;
            if products.is_empty() {
                tracing::warn!("Source catalog returned no products");
                return Ok(result);
            }
            let index = self.indexer.build_index(&self.cfg.category_labels).await;

            for source in &products {
                if result.created >= count {
                    break;
                }
                let item = self.dry_upload_one(source, &index).await;
                tracing::info!(handle = %item.handle, status = ?item.status, detail = %item.detail, "Dry-run item");
                result.record(item);
            }

            tracing::info!(created = result.created, skipped = result.skipped, errors = result.errors, "Dry-run upload finished");
            Ok(result)
        }
        .instrument(span)
        .await
    }

    async fn dry_upload_one(&self, source: &SourceProduct, index: &CategoryIndex) -> DryUploadItem {
        let item = |title: &str, status: ItemStatus, detail: &str, destination_id: Option<u64>| DryUploadItem {
            handle: source.handle.clone(),
            title: title.to_string(),
            source_price: source.first_price(),
            destination_id,
            status,
            detail: detail.to_string(),
        };

        if self.transformer.is_subscription(&source.handle) {
            return item(&source.title, ItemStatus::Skip, "subscription", None);
        }
        if !source.is_available() {
            return item(&source.title, ItemStatus::Skip, "sold out", None);
        }

        let translated = self.translator.translate(&source.title, &source.body_html, &source.options).await;
        self.pacer.wait(PaceStep::Translation).await;

        let Some(transformed) = self.transformer.transform(source, &translated, index.labels_for(&source.handle)) else {
            return item(&source.title, ItemStatus::Skip, "transform excluded", None);
        };

        let existing = self.destination.find_by_handle(&transformed.payload.handle).await;
        self.pacer.wait(PaceStep::Lookup).await;
        match existing {
            Ok(Some(existing)) => return item(&translated.title, ItemStatus::Skip, "already exists", Some(existing.id)),
            Ok(None) => {}
            Err(e) => {
                self.pacer.wait(PaceStep::Product).await;
                return item(&source.title, ItemStatus::Error, &truncate(&e.to_string(), 80), None);
            }
        }

        let outcome = match self.create_product(&transformed).await {
            Ok(created) => item(&transformed.payload.title, ItemStatus::Success, "created", Some(created.id)),
            Err(e) => item(&source.title, ItemStatus::Error, &truncate(&e.to_string(), 80), None),
        };
        self.pacer.wait(PaceStep::Product).await;
        outcome
    }

    /// Source listing without touching the destination.
    pub async fn fetch_source_only(&self) -> Result<Vec<SourceProductSummary>> {
        let products = self.reader.fetch_all().await;
        Ok(products.iter().map(SourceProduct::summary).collect())
    }

    /// Recomputes every mirrored variant's price from the current source price.
    ///
    /// Prices come from the source catalog matched by SKU, so running it twice
    /// does not compound. `divisor_override` replaces the formula divisor.
    pub async fn reprice_all(&self, divisor_override: Option<f64>) -> Result<RepriceResult> {
        let _guard = self.acquire()?;
        let mut formula = self.transformer.formula();
        if let Some(divisor) = divisor_override {
            if !(divisor.is_finite() && divisor > 0.0) {
                return Err(MirrorError::Configuration(format!("invalid divisor override: {}", divisor)));
            }
            formula = formula.with_divisor(divisor);
        }
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("reprice", %run_id, divisor = formula.divisor);
        self.reprice_pass(formula).instrument(span).await
    }

    async fn reprice_pass(&self, formula: PriceFormula) -> Result<RepriceResult> {
        tracing::info!(weight_multiplier = formula.weight_multiplier, round_to = formula.round_to, "Repricing started");

        let products = self.reader.fetch_all().await;
        let mut prices: HashMap<String, i64> = HashMap::new();
        for product in &products {
            for variant in &product.variants {
                let price = formula.price_opt(variant.price, variant.weight_kg());
                if price > 0 {
                    prices.insert(self.transformer.variant_sku(product, variant), price);
                }
            }
        }

        let mut updated = 0usize;
        let mut since_id = 0u64;
        loop {
            let page = self
                .destination
                .list_products_page(&self.cfg.vendor, since_id, REPRICE_PAGE_SIZE)
                .await?;
            let Some(last) = page.last() else { break };
            since_id = last.id;

            for product in &page {
                for variant in &product.variants {
                    let Some(target) = variant.sku.as_deref().and_then(|sku| prices.get(sku)).copied() else {
                        continue;
                    };
                    let current = variant.price.as_deref().and_then(|p| p.trim().parse::<f64>().ok());
                    if current == Some(target as f64) {
                        continue;
                    }
                    match self.destination.update_variant_price(variant.id, target).await {
                        Ok(()) => updated += 1,
                        Err(e) => tracing::warn!(variant_id = variant.id, error = %e, "Variant price update failed"),
                    }
                    self.pacer.wait(PaceStep::PriceUpdate).await;
                }
            }
            if page.len() < REPRICE_PAGE_SIZE {
                break;
            }
        }

        tracing::info!(updated, "Repricing finished");
        Ok(RepriceResult { updated, divisor: formula.divisor })
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
