//! Cost estimation for a completed or in-progress execution. A
//! `PricingTable` is injected rather than hard-wired so a caller can
//! plug in a live-updated price list without this crate knowing about
//! it; `EnginePricingTable` is the built-in static fallback, keyed the
//! way the teacher's model catalog keys on `(provider, model)` pairs.

use crate::cost::CostMetrics;

/// Which provider a model id belongs to, for pricing lookup purposes
/// only — this is not the full provider abstraction an LLM adapter
/// would need, just enough to disambiguate pricing tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Anthropic,
    OpenAi,
    Other,
}

/// Price per 1000 tokens, in US dollars, for one model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
}

impl Pricing {
    pub fn estimate(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        (prompt_tokens as f64 / 1000.0) * self.prompt_per_1k
            + (completion_tokens as f64 / 1000.0) * self.completion_per_1k
    }
}

/// Looks up the price for a `(provider, model)` pair. Implementations
/// may consult a live-updated table; unknown models fall back to
/// `default_pricing()`.
pub trait PricingTable: Send + Sync {
    fn lookup(&self, provider: Provider, model: &str) -> Option<Pricing>;

    fn default_pricing(&self) -> Pricing {
        Pricing { prompt_per_1k: 0.003, completion_per_1k: 0.015 }
    }

    /// Estimate the dollar cost of a completed execution's metrics.
    fn estimate_cost(&self, provider: Provider, model: &str, metrics: &CostMetrics) -> f64 {
        self.lookup(provider, model)
            .unwrap_or_else(|| self.default_pricing())
            .estimate(metrics.prompt_tokens, metrics.completion_tokens)
    }
}

/// The built-in static price table, covering the model families this
/// harness is evaluated against most often. Prices are illustrative
/// per-1k-token figures, not live-synced to vendor list prices.
#[derive(Debug, Default)]
pub struct EnginePricingTable;

impl PricingTable for EnginePricingTable {
    fn lookup(&self, provider: Provider, model: &str) -> Option<Pricing> {
        match (provider, model) {
            (Provider::Anthropic, m) if m.contains("opus") => {
                Some(Pricing { prompt_per_1k: 0.015, completion_per_1k: 0.075 })
            }
            (Provider::Anthropic, m) if m.contains("sonnet") => {
                Some(Pricing { prompt_per_1k: 0.003, completion_per_1k: 0.015 })
            }
            (Provider::Anthropic, m) if m.contains("haiku") => {
                Some(Pricing { prompt_per_1k: 0.0008, completion_per_1k: 0.004 })
            }
            (Provider::OpenAi, m) if m.contains("gpt-5") => {
                Some(Pricing { prompt_per_1k: 0.005, completion_per_1k: 0.015 })
            }
            (Provider::OpenAi, m) if m.contains("mini") => {
                Some(Pricing { prompt_per_1k: 0.00025, completion_per_1k: 0.002 })
            }
            _ => None,
        }
    }
}
