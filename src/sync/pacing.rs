use std::time::Duration;
use tokio::time::Instant;

use crate::config::Config;

/// Points in the pipeline where outbound requests are paced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaceStep {
    SourcePage,
    CategoryPage,
    Category,
    Translation,
    TranslationRetry,
    Lookup,
    VariantDelete,
    Product,
    PriceUpdate,
}

/// Enforcement point for request pacing.
///
/// The pipeline runs one request at a time, so fixed delays are enough today;
/// a parallel runner would plug a real limiter in here.
#[async_trait::async_trait]
pub trait RequestPacer: Send + Sync {
    async fn wait(&self, step: PaceStep);
}

#[derive(Debug, Clone, Default)]
pub struct FixedDelayPacer {
    source_page: Duration,
    category_page: Duration,
    category: Duration,
    translation: Duration,
    translation_retry: Duration,
    lookup: Duration,
    variant_delete: Duration,
    product: Duration,
    price_update: Duration,
}

impl FixedDelayPacer {
    pub fn from_config(cfg: &Config) -> Self {
        let ms = Duration::from_millis;
        Self {
            source_page: ms(cfg.request_delay_ms),
            category_page: ms(cfg.category_delay_ms),
            category: ms(cfg.category_delay_ms),
            translation: ms(cfg.translation_delay_ms),
            translation_retry: ms(cfg.translation_retry_delay_ms),
            lookup: ms(cfg.lookup_delay_ms),
            variant_delete: ms(cfg.variant_delete_delay_ms),
            product: ms(cfg.request_delay_ms),
            price_update: ms(cfg.price_update_delay_ms),
        }
    }

    /// No waiting at all.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn delay_for(&self, step: PaceStep) -> Duration {
        match step {
            PaceStep::SourcePage => self.source_page,
            PaceStep::CategoryPage => self.category_page,
            PaceStep::Category => self.category,
            PaceStep::Translation => self.translation,
            PaceStep::TranslationRetry => self.translation_retry,
            PaceStep::Lookup => self.lookup,
            PaceStep::VariantDelete => self.variant_delete,
            PaceStep::Product => self.product,
            PaceStep::PriceUpdate => self.price_update,
        }
    }
}

#[async_trait::async_trait]
impl RequestPacer for FixedDelayPacer {
    async fn wait(&self, step: PaceStep) {
        let delay = self.delay_for(step);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Capped exponential backoff bounded by a wall-clock budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max_delay: Duration,
    pub budget: Duration,
}

impl BackoffPolicy {
    pub fn rate_limit(cfg: &Config) -> Self {
        Self {
            base: Duration::from_millis(cfg.rate_limit_backoff_ms),
            max_delay: Duration::from_millis(cfg.rate_limit_backoff_max_ms.max(cfg.rate_limit_backoff_ms)),
            budget: Duration::from_millis(cfg.rate_limit_budget_ms),
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.min(16)).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.max_delay)
    }

    pub fn start(&self) -> Backoff {
        Backoff { policy: *self, attempt: 0, spent: Duration::ZERO, started: Instant::now() }
    }
}

/// One backoff sequence; `next_delay` returns None once the budget is spent.
#[derive(Debug)]
pub struct Backoff {
    policy: BackoffPolicy,
    attempt: u32,
    spent: Duration,
    started: Instant,
}

impl Backoff {
    pub fn next_delay(&mut self) -> Option<Duration> {
        let delay = self.policy.delay(self.attempt);
        let used = self.started.elapsed().max(self.spent);
        if used + delay > self.policy.budget {
            return None;
        }
        self.attempt += 1;
        self.spent += delay;
        Some(delay)
    }

    pub fn attempts(&self) -> u32 {
        self.attempt
    }
}
