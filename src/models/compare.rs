//! Comparison request and result models
//!
//! These are the payloads of `POST /api/compare`. Latencies are held as
//! [`Duration`] and serialized as fractional seconds.

use crate::core::constants::provider;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

fn default_providers() -> Vec<String> {
    provider::DEFAULT_SELECTION
        .iter()
        .map(|id| id.to_string())
        .collect()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn serialize_secs<S>(latency: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(latency.as_secs_f64())
}

/// Request to compare one prompt across providers
#[derive(Debug, Clone, Deserialize)]
pub struct CompareRequest {
    pub prompt: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_providers")]
    pub providers: Vec<String>,
    /// Per-provider model overrides, keyed by provider identifier
    #[serde(default)]
    pub models: HashMap<String, String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl CompareRequest {
    /// Request with default parameters for the given prompt and providers
    #[cfg(test)]
    pub fn new(prompt: impl Into<String>, providers: &[&str]) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: None,
            providers: providers.iter().map(|p| p.to_string()).collect(),
            models: HashMap::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: None,
        }
    }
}

/// Outcome of one successful provider invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderResult {
    pub provider: String,
    pub model: String,
    pub response: String,
    #[serde(serialize_with = "serialize_secs")]
    pub latency: Duration,
    pub cost: f64,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl ProviderResult {
    pub fn total_tokens(&self) -> u64 {
        u64::from(self.input_tokens) + u64::from(self.output_tokens)
    }
}

/// A provider invocation that produced no result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderFailure {
    pub provider: String,
    pub model: String,
    pub reason: String,
    #[serde(serialize_with = "serialize_secs")]
    pub latency: Duration,
}

/// Ranked comparison across every provider that answered
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonSummary {
    pub id: Uuid,
    pub prompt: String,
    pub results: Vec<ProviderResult>,
    pub failures: Vec<ProviderFailure>,
    pub fastest: String,
    pub cheapest: String,
    pub total_cost: f64,
    pub total_tokens: u64,
}

impl ComparisonSummary {
    /// Reduce successful results into a summary
    ///
    /// Hands `failures` back when there are no results. Ties for fastest
    /// and cheapest go to the earlier entry in `results`.
    pub fn from_results(
        prompt: String,
        results: Vec<ProviderResult>,
        failures: Vec<ProviderFailure>,
    ) -> Result<Self, Vec<ProviderFailure>> {
        let Some(fastest) = results.iter().min_by_key(|r| r.latency) else {
            return Err(failures);
        };
        let fastest = fastest.provider.clone();
        let Some(cheapest) = results.iter().min_by(|a, b| a.cost.total_cmp(&b.cost)) else {
            return Err(failures);
        };
        let cheapest = cheapest.provider.clone();
        let total_cost = results.iter().map(|r| r.cost).sum();
        let total_tokens = results.iter().map(ProviderResult::total_tokens).sum();

        Ok(Self {
            id: Uuid::new_v4(),
            prompt,
            results,
            failures,
            fastest,
            cheapest,
            total_cost,
            total_tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn result(provider: &str, latency_ms: u64, cost: f64, tokens: u32) -> ProviderResult {
        ProviderResult {
            provider: provider.to_string(),
            model: format!("{provider}-model"),
            response: "text".to_string(),
            latency: Duration::from_millis(latency_ms),
            cost,
            input_tokens: tokens,
            output_tokens: tokens,
        }
    }

    #[test]
    fn test_empty_results_hand_back_failures() {
        let failure = ProviderFailure {
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            reason: "Rate limit exceeded: slow down".to_string(),
            latency: Duration::from_millis(40),
        };
        let failures =
            ComparisonSummary::from_results("p".into(), vec![], vec![failure.clone()]).unwrap_err();
        assert_eq!(failures, vec![failure]);
    }

    #[test]
    fn test_fastest_and_cheapest_can_differ() {
        let summary = ComparisonSummary::from_results(
            "p".into(),
            vec![result("openai", 120, 0.00195, 20), result("anthropic", 300, 0.00042, 20)],
            vec![],
        )
        .unwrap();

        assert_eq!(summary.fastest, "openai");
        assert_eq!(summary.cheapest, "anthropic");
        assert!((summary.total_cost - 0.00237).abs() < 1e-12);
        assert_eq!(summary.total_tokens, 80);
    }

    #[test]
    fn test_ties_go_to_first_entry() {
        let summary = ComparisonSummary::from_results(
            "p".into(),
            vec![result("a", 100, 0.01, 1), result("b", 100, 0.01, 1)],
            vec![],
        )
        .unwrap();
        assert_eq!(summary.fastest, "a");
        assert_eq!(summary.cheapest, "a");
    }

    #[test]
    fn test_latency_serializes_as_seconds() {
        let value = serde_json::to_value(result("openai", 1500, 0.0, 0)).unwrap();
        assert_eq!(value["latency"], serde_json::json!(1.5));
    }

    #[test]
    fn test_request_defaults() {
        let request: CompareRequest =
            serde_json::from_str(r#"{"prompt": "Write a haiku about coding"}"#).unwrap();
        assert_eq!(request.providers, vec!["openai", "anthropic"]);
        assert_eq!(request.max_tokens, 1000);
        assert!((request.temperature - 0.7).abs() < f32::EPSILON);
        assert!(request.models.is_empty());
        assert!(request.timeout_secs.is_none());
    }

    proptest! {
        #[test]
        fn prop_ranking_ignores_order(
            entries in proptest::collection::hash_set(0u64..10_000, 1..8),
            seed in any::<u64>(),
        ) {
            // Distinct latencies and costs so the minimum is unique.
            let results: Vec<ProviderResult> = entries
                .iter()
                .enumerate()
                .map(|(i, &ms)| result(&format!("p{i}"), ms, (ms ^ seed % 10_007) as f64, 1))
                .collect();

            let forward = ComparisonSummary::from_results("p".into(), results.clone(), vec![]).unwrap();
            let mut reversed = results.clone();
            reversed.reverse();
            let backward = ComparisonSummary::from_results("p".into(), reversed, vec![]).unwrap();
            let mut rotated = results;
            rotated.rotate_left((seed as usize) % entries.len());
            let rotated = ComparisonSummary::from_results("p".into(), rotated, vec![]).unwrap();

            prop_assert_eq!(&forward.fastest, &backward.fastest);
            prop_assert_eq!(&forward.fastest, &rotated.fastest);
            prop_assert_eq!(&forward.cheapest, &backward.cheapest);
            prop_assert_eq!(&forward.cheapest, &rotated.cheapest);
        }
    }
}
