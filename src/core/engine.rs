//! Comparison engine
//!
//! Fans one prompt out to several providers concurrently, times each call,
//! prices each result and reduces everything into a [`ComparisonSummary`].
//! One provider failing never aborts the others; the comparison only fails
//! when nothing succeeded.

use crate::core::config::Config;
use crate::core::pricing::PricingTable;
use crate::core::provider::{InvocationRequest, Provider, ProviderError, ProviderRegistry, ProviderType};
use crate::models::compare::{CompareRequest, ComparisonSummary, ProviderFailure, ProviderResult};
use futures::future::join_all;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Highest accepted sampling temperature
const MAX_TEMPERATURE: f32 = 2.0;

/// Comparison errors surfaced to the caller
#[derive(Debug, Error)]
pub enum CompareError {
    /// The request was rejected before any provider was called
    #[error("{0}")]
    Validation(String),

    /// Every provider invocation failed
    #[error("All providers failed: {}", FailureList(.0))]
    AllProvidersFailed(Vec<ProviderFailure>),
}

struct FailureList<'a>(&'a [ProviderFailure]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", failure.provider, failure.reason)?;
        }
        Ok(())
    }
}

/// Request limits enforced before fan-out
#[derive(Debug, Clone)]
pub struct CompareLimits {
    pub max_tokens_limit: u32,
    pub max_prompt_length: usize,
    pub default_timeout: Duration,
    pub max_timeout: Duration,
}

impl CompareLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_tokens_limit: config.max_tokens_limit,
            max_prompt_length: config.max_prompt_length,
            default_timeout: Duration::from_secs(config.compare_timeout),
            max_timeout: Duration::from_secs(config.max_compare_timeout),
        }
    }
}

impl Default for CompareLimits {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// A provider chosen for this comparison, with its resolved model
struct Selection {
    id: String,
    model: String,
    provider: Arc<dyn Provider>,
}

/// Validated comparison plan
struct Plan {
    selections: Vec<Selection>,
    deadline: Duration,
}

/// Orchestrates provider invocations and ranks their results
pub struct ComparisonEngine {
    registry: Arc<ProviderRegistry>,
    pricing: Arc<PricingTable>,
    limits: CompareLimits,
}

impl ComparisonEngine {
    pub fn new(registry: Arc<ProviderRegistry>, pricing: Arc<PricingTable>, limits: CompareLimits) -> Self {
        Self {
            registry,
            pricing,
            limits,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    /// Compare a prompt across the requested providers
    ///
    /// # Errors
    ///
    /// - [`CompareError::Validation`] for malformed input, before any call
    /// - [`CompareError::AllProvidersFailed`] when no provider succeeded
    pub async fn compare(&self, request: CompareRequest) -> Result<ComparisonSummary, CompareError> {
        let plan = self.plan(&request)?;
        let started = Instant::now();

        info!(
            "Comparing prompt across {} providers (prompt={:.50})",
            plan.selections.len(),
            request.prompt
        );

        let invocations = plan
            .selections
            .iter()
            .map(|selection| self.invoke_one(selection, &request, plan.deadline));
        let outcomes = join_all(invocations).await;

        let mut results = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(failure) => failures.push(failure),
            }
        }

        match ComparisonSummary::from_results(request.prompt, results, failures) {
            Ok(summary) => {
                info!(
                    "Comparison complete: {} succeeded, {} failed, ${:.6}, {:.2}s",
                    summary.results.len(),
                    summary.failures.len(),
                    summary.total_cost,
                    started.elapsed().as_secs_f64()
                );
                Ok(summary)
            }
            Err(failures) => {
                warn!("Comparison failed: all {} providers failed", failures.len());
                Err(CompareError::AllProvidersFailed(failures))
            }
        }
    }

    /// Call one provider and turn the outcome into a result or a failure
    async fn invoke_one(
        &self,
        selection: &Selection,
        request: &CompareRequest,
        deadline: Duration,
    ) -> Result<ProviderResult, ProviderFailure> {
        let invocation = InvocationRequest {
            prompt: &request.prompt,
            system_prompt: request.system_prompt.as_deref(),
            model: &selection.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        debug!("Invoking {} with model {}", selection.id, selection.model);
        let start = Instant::now();
        let outcome = tokio::time::timeout(deadline, selection.provider.invoke(&invocation)).await;
        let latency = start.elapsed();

        let outcome = outcome.unwrap_or_else(|_| Err(ProviderError::Timeout(deadline.as_secs_f64())));

        match outcome {
            Ok(completion) => {
                let cost = self.pricing.cost(
                    &selection.model,
                    completion.input_tokens,
                    completion.output_tokens,
                );
                debug!(
                    "{} complete: {:.2}s, ${:.6}",
                    selection.id,
                    latency.as_secs_f64(),
                    cost
                );
                Ok(ProviderResult {
                    provider: selection.id.clone(),
                    model: selection.model.clone(),
                    response: completion.text,
                    latency,
                    cost,
                    input_tokens: completion.input_tokens,
                    output_tokens: completion.output_tokens,
                })
            }
            Err(error) => {
                warn!("Error with {}: {}", selection.id, error);
                Err(ProviderFailure {
                    provider: selection.id.clone(),
                    model: selection.model.clone(),
                    reason: error.to_string(),
                    latency,
                })
            }
        }
    }

    /// Validate a request and resolve providers and models
    fn plan(&self, request: &CompareRequest) -> Result<Plan, CompareError> {
        let prompt_length = request.prompt.chars().count();
        if request.prompt.trim().is_empty() {
            return Err(CompareError::Validation("prompt must not be empty".to_string()));
        }
        if prompt_length > self.limits.max_prompt_length {
            return Err(CompareError::Validation(format!(
                "prompt is {} characters, the limit is {}",
                prompt_length, self.limits.max_prompt_length
            )));
        }

        if !request.temperature.is_finite() || !(0.0..=MAX_TEMPERATURE).contains(&request.temperature) {
            return Err(CompareError::Validation(format!(
                "temperature must be between 0 and {}, got {}",
                MAX_TEMPERATURE, request.temperature
            )));
        }

        if request.max_tokens == 0 || request.max_tokens > self.limits.max_tokens_limit {
            return Err(CompareError::Validation(format!(
                "max_tokens must be between 1 and {}, got {}",
                self.limits.max_tokens_limit, request.max_tokens
            )));
        }

        let deadline = match request.timeout_secs {
            Some(0) => {
                return Err(CompareError::Validation(
                    "timeout_secs must be positive".to_string(),
                ));
            }
            Some(secs) => Duration::from_secs(secs).min(self.limits.max_timeout),
            None => self.limits.default_timeout,
        };

        if request.providers.is_empty() {
            return Err(CompareError::Validation(
                "at least one provider is required".to_string(),
            ));
        }

        let mut selections: Vec<Selection> = Vec::with_capacity(request.providers.len());
        for raw in &request.providers {
            let id = canonical_id(raw);
            if id.is_empty() {
                return Err(CompareError::Validation(
                    "provider identifiers must not be empty".to_string(),
                ));
            }
            if selections.iter().any(|s| s.id == id) {
                continue;
            }

            let provider = self.registry.get(&id).ok_or_else(|| {
                CompareError::Validation(if self.registry.is_empty() {
                    format!("provider '{}' is not configured; no providers are configured", id)
                } else {
                    format!(
                        "provider '{}' is not configured; available: {}",
                        id,
                        self.registry.ids().join(", ")
                    )
                })
            })?;

            let model = match override_for(request, raw, &id) {
                Some(model) if model.trim().is_empty() => {
                    return Err(CompareError::Validation(format!(
                        "model override for '{}' must not be empty",
                        id
                    )));
                }
                Some(model) => model.trim().to_string(),
                None => provider.default_model().to_string(),
            };

            selections.push(Selection {
                id,
                model,
                provider: provider.clone(),
            });
        }

        Ok(Plan {
            selections,
            deadline,
        })
    }
}

/// Normalize a caller-supplied provider identifier
///
/// Known aliases map to their canonical id; anything else is trimmed and
/// lower-cased.
fn canonical_id(raw: &str) -> String {
    ProviderType::from_str(raw)
        .map(|kind| kind.id().to_string())
        .unwrap_or_else(|| raw.trim().to_lowercase())
}

/// Model override for a provider, matched by canonical or raw id
fn override_for<'a>(request: &'a CompareRequest, raw: &str, id: &str) -> Option<&'a str> {
    request
        .models
        .get(id)
        .or_else(|| request.models.get(raw))
        .map(String::as_str)
}
