//! Provider abstraction layer for different LLM API backends
//!
//! Every backend is driven through the same capability: given a prompt and
//! generation parameters, return text plus token counts, or fail. Backends
//! are looked up by provider identifier in a [`ProviderRegistry`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Error types for provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Timed out after {0:.1}s")]
    Timeout(f64),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl ProviderError {
    /// Map a non-success HTTP status and its classified message to an error
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 | 403 => ProviderError::Authentication(message),
            429 => ProviderError::RateLimit(message),
            400 => ProviderError::BadRequest(message),
            _ => ProviderError::ApiError { status, message },
        }
    }

    /// Map a transport-level reqwest error
    pub fn from_transport(error: reqwest::Error, timeout_secs: u64) -> Self {
        if error.is_timeout() {
            ProviderError::Timeout(timeout_secs as f64)
        } else if error.is_decode() {
            ProviderError::MalformedResponse(error.to_string())
        } else {
            ProviderError::Unexpected(error.to_string())
        }
    }
}

/// One invocation of a backend
#[derive(Debug, Clone, Copy)]
pub struct InvocationRequest<'a> {
    pub prompt: &'a str,
    pub system_prompt: Option<&'a str>,
    pub model: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Text and token counts returned by a backend
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Trait for LLM API providers
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate a completion for a single prompt
    async fn invoke(&self, request: &InvocationRequest<'_>) -> Result<Completion, ProviderError>;

    /// Model used when the caller does not name one
    fn default_model(&self) -> &str;

    /// Get the provider name
    fn provider_name(&self) -> &str;
}

/// Supported provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    OpenAI,
    Anthropic,
}

impl ProviderType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Some(ProviderType::OpenAI),
            "anthropic" | "claude" => Some(ProviderType::Anthropic),
            _ => None,
        }
    }

    /// Identifier callers use to select this provider
    pub fn id(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => crate::core::constants::provider::OPENAI,
            ProviderType::Anthropic => crate::core::constants::provider::ANTHROPIC,
        }
    }
}

/// Lookup from provider identifier to its backend
///
/// Built once at startup; identifiers are stored lower-cased.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under `id`, replacing any previous one
    pub fn register(&mut self, id: &str, provider: Arc<dyn Provider>) {
        self.providers.insert(id.trim().to_lowercase(), provider);
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.get(id)
    }

    /// Registered identifiers, sorted
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
