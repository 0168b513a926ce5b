//! Model pricing table and cost calculation
//!
//! Prices are USD per 1K tokens. The table is built once at startup from the
//! built-in catalogue plus any `[pricing]` entries from configuration, and is
//! read-only afterwards.
//!
//! Cost of a call:
//! `(input_tokens / 1000) * input_price + (output_tokens / 1000) * output_price`

use crate::core::tokenizer::estimate_tokens;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Pricing for a single model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Input (prompt) cost in USD per 1K tokens
    pub input_per_1k: f64,

    /// Output (completion) cost in USD per 1K tokens
    pub output_per_1k: f64,

    /// Context window in tokens, 0 when unknown
    #[serde(default)]
    pub context_window: u32,
}

impl ModelPricing {
    pub const fn new(input_per_1k: f64, output_per_1k: f64, context_window: u32) -> Self {
        Self {
            input_per_1k,
            output_per_1k,
            context_window,
        }
    }

    /// Fallback used for models missing from the table
    pub const ZERO: ModelPricing = ModelPricing::new(0.0, 0.0, 0);
}

/// Built-in prices
const BUILTIN_PRICES: &[(&str, ModelPricing)] = &[
    // OpenAI
    ("gpt-4", ModelPricing::new(0.03, 0.06, 8192)),
    ("gpt-4-32k", ModelPricing::new(0.06, 0.12, 32768)),
    ("gpt-4-turbo", ModelPricing::new(0.01, 0.03, 128000)),
    ("gpt-4-turbo-preview", ModelPricing::new(0.01, 0.03, 128000)),
    ("gpt-4o", ModelPricing::new(0.005, 0.015, 128000)),
    ("gpt-4o-mini", ModelPricing::new(0.00015, 0.0006, 128000)),
    ("gpt-3.5-turbo", ModelPricing::new(0.0005, 0.0015, 16385)),
    ("gpt-3.5-turbo-16k", ModelPricing::new(0.003, 0.004, 16385)),
    // Anthropic
    ("claude-3-opus", ModelPricing::new(0.015, 0.075, 200000)),
    ("claude-3-opus-20240229", ModelPricing::new(0.015, 0.075, 200000)),
    ("claude-3-5-sonnet", ModelPricing::new(0.003, 0.015, 200000)),
    ("claude-3-5-sonnet-20241022", ModelPricing::new(0.003, 0.015, 200000)),
    ("claude-3-sonnet", ModelPricing::new(0.003, 0.015, 200000)),
    ("claude-3-haiku", ModelPricing::new(0.00025, 0.00125, 200000)),
    ("claude-3-haiku-20240307", ModelPricing::new(0.00025, 0.00125, 200000)),
];

/// Detailed cost of one call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u64,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    pub input_price_per_1k: f64,
    pub output_price_per_1k: f64,
    pub formatted_cost: String,
}

/// Read-only mapping from model identifier to pricing
#[derive(Debug, Clone)]
pub struct PricingTable {
    prices: HashMap<String, ModelPricing>,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PricingTable {
    /// Create a table holding the built-in prices
    pub fn new() -> Self {
        let prices = BUILTIN_PRICES
            .iter()
            .map(|(model, pricing)| (model.to_string(), *pricing))
            .collect();
        Self { prices }
    }

    /// Create a table from the built-in prices with configured entries applied on top
    pub fn with_overrides(overrides: &HashMap<String, ModelPricing>) -> Self {
        let mut table = Self::new();
        for (model, pricing) in overrides {
            table.prices.insert(model.clone(), *pricing);
        }
        table
    }

    /// Pricing for a model, if listed
    pub fn get(&self, model: &str) -> Option<&ModelPricing> {
        self.prices.get(model)
    }

    /// Pricing for a model, or the zero-cost fallback
    fn lookup(&self, model: &str) -> ModelPricing {
        match self.get(model) {
            Some(pricing) => *pricing,
            None => {
                warn!("No pricing listed for model '{}', using zero cost", model);
                ModelPricing::ZERO
            }
        }
    }

    /// Cost in USD of a call to `model`
    ///
    /// Unlisted models cost nothing rather than failing the comparison.
    pub fn cost(&self, model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
        let pricing = self.lookup(model);
        token_cost(input_tokens, pricing.input_per_1k)
            + token_cost(output_tokens, pricing.output_per_1k)
    }

    /// Cost of a call split into its input and output parts
    pub fn breakdown(&self, model: &str, input_tokens: u32, output_tokens: u32) -> CostBreakdown {
        let pricing = self.lookup(model);
        let input_cost = token_cost(input_tokens, pricing.input_per_1k);
        let output_cost = token_cost(output_tokens, pricing.output_per_1k);
        let total_cost = input_cost + output_cost;

        CostBreakdown {
            model: model.to_string(),
            input_tokens,
            output_tokens,
            total_tokens: u64::from(input_tokens) + u64::from(output_tokens),
            input_cost,
            output_cost,
            total_cost,
            input_price_per_1k: pricing.input_per_1k,
            output_price_per_1k: pricing.output_per_1k,
            formatted_cost: format_cost(total_cost),
        }
    }

    /// Estimated cost of the same exchange on each of `models`
    ///
    /// Token counts are estimated per model from `prompt` and
    /// `expected_response`.
    pub fn compare_costs(
        &self,
        prompt: &str,
        expected_response: &str,
        models: &[&str],
    ) -> BTreeMap<String, CostBreakdown> {
        models
            .iter()
            .map(|model| {
                let input_tokens = estimate_tokens(prompt, model);
                let output_tokens = estimate_tokens(expected_response, model);
                (model.to_string(), self.breakdown(model, input_tokens, output_tokens))
            })
            .collect()
    }

    /// All entries, sorted by model name
    pub fn entries(&self) -> BTreeMap<String, ModelPricing> {
        self.prices
            .iter()
            .map(|(model, pricing)| (model.clone(), *pricing))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }
}

fn token_cost(tokens: u32, price_per_1k: f64) -> f64 {
    (f64::from(tokens) / 1000.0) * price_per_1k
}

/// Format a cost for display, keeping small amounts readable
pub fn format_cost(cost: f64) -> String {
    if cost == 0.0 {
        "$0.00".to_string()
    } else if cost < 0.001 {
        format!("${:.6}", cost)
    } else if cost < 0.01 {
        format!("${:.5}", cost)
    } else if cost < 0.1 {
        format!("${:.4}", cost)
    } else {
        format!("${:.3}", cost)
    }
}

/// Model with the lowest total cost in a [`PricingTable::compare_costs`] result
///
/// Ties go to the model that sorts first.
pub fn cheapest(costs: &BTreeMap<String, CostBreakdown>) -> Option<(&str, f64)> {
    costs
        .iter()
        .min_by(|(_, a), (_, b)| a.total_cost.total_cmp(&b.total_cost))
        .map(|(model, breakdown)| (model.as_str(), breakdown.total_cost))
}
