use std::sync::Arc;

use crate::clients::DestinationCatalogClient;
use crate::models::*;
use crate::sync::pacing::{PaceStep, RequestPacer};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub deleted: usize,
    pub marked_unavailable: usize,
    pub failed: usize,
}

/// Removes or disables destination variants that went out of stock at the source.
#[derive(Clone)]
pub struct VariantReconciler {
    destination: DestinationCatalogClient,
    pacer: Arc<dyn RequestPacer>,
}

impl VariantReconciler {
    pub fn new(destination: DestinationCatalogClient, pacer: Arc<dyn RequestPacer>) -> Self {
        Self { destination, pacer }
    }

    /// A product always keeps at least one variant: the last one is zeroed, not deleted.
    pub async fn reconcile(&self, existing: &DestinationProduct, transformed: &TransformedProduct) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome::default();
        let mut remaining = existing.variants.len();

        for variant in &existing.variants {
            let Some(sku) = variant.sku.as_deref() else { continue };
            let unavailable = transformed
                .availability_for_sku(sku)
                .map(|v| !v.available)
                .unwrap_or(false);
            if !unavailable {
                continue;
            }

            if remaining > 1 {
                tracing::info!(product_id = existing.id, variant_id = variant.id, sku, "Deleting sold-out variant");
                match self.destination.delete_variant(existing.id, variant.id).await {
                    Ok(()) => {
                        remaining -= 1;
                        outcome.deleted += 1;
                    }
                    Err(e) => {
                        tracing::warn!(product_id = existing.id, variant_id = variant.id, error = %e, "Variant delete failed");
                        outcome.failed += 1;
                    }
                }
                self.pacer.wait(PaceStep::VariantDelete).await;
            } else {
                tracing::info!(product_id = existing.id, variant_id = variant.id, sku, "Marking last variant unavailable");
                if self.destination.mark_variant_unavailable(variant.id).await {
                    outcome.marked_unavailable += 1;
                } else {
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }
}
