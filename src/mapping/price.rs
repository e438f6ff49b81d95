use crate::config::Config;

/// `ceil((amount / divisor + weight_kg * weight_multiplier) / round_to) * round_to`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceFormula {
    pub divisor: f64,
    pub weight_multiplier: f64,
    pub round_to: i64,
}

impl PriceFormula {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            divisor: cfg.price_divisor,
            weight_multiplier: cfg.price_weight_multiplier,
            round_to: cfg.price_round_to,
        }
    }

    pub fn with_divisor(mut self, divisor: f64) -> Self {
        self.divisor = divisor;
        self
    }

    /// Destination amount, or 0 meaning "no price".
    pub fn price(&self, amount: f64, weight_kg: f64) -> i64 {
        if !amount.is_finite() || amount <= 0.0 || !self.divisor.is_finite() || self.divisor <= 0.0 {
            return 0;
        }
        let weight_kg = if weight_kg.is_finite() && weight_kg > 0.0 { weight_kg } else { 0.0 };
        let round_to = self.round_to.max(1) as f64;
        let raw = amount / self.divisor + weight_kg * self.weight_multiplier;
        // Shave float noise so exact multiples (e.g. 700 / 0.7) do not round up a step.
        let steps = ((raw / round_to) - 1e-9).ceil();
        (steps * round_to) as i64
    }

    pub fn price_str(&self, amount: &str, weight_kg: f64) -> i64 {
        amount.trim().parse::<f64>().map(|a| self.price(a, weight_kg)).unwrap_or(0)
    }

    pub fn price_opt(&self, amount: Option<f64>, weight_kg: f64) -> i64 {
        amount.map(|a| self.price(a, weight_kg)).unwrap_or(0)
    }
}
