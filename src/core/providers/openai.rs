//! OpenAI provider implementation

use crate::core::constants::role;
use crate::core::tokenizer::estimate_tokens;
use crate::core::provider::{Completion, InvocationRequest, Provider, ProviderError};
use crate::models::openai::{
    OpenAIChatCompletionRequest, OpenAIChatCompletionResponse, OpenAIMessage,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// OpenAI provider (any OpenAI-compatible chat completions endpoint)
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
    timeout: u64,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider
    ///
    /// # Arguments
    ///
    /// * `api_key` - OpenAI API key
    /// * `base_url` - API base URL, e.g. `https://api.openai.com/v1`
    /// * `default_model` - Model used when the caller does not override it
    /// * `timeout` - Request timeout in seconds
    pub fn new(api_key: String, base_url: String, default_model: String, timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .context("Failed to create HTTP client for OpenAI")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_model,
            timeout,
        })
    }

    /// Classify OpenAI errors and provide helpful messages
    fn classify_error(error_detail: &str) -> String {
        let error_lower = error_detail.to_lowercase();

        if error_lower.contains("unsupported_country_region_territory")
            || error_lower.contains("country, region, or territory not supported")
        {
            return "OpenAI API is not available in your region.".to_string();
        }

        if error_lower.contains("invalid_api_key") || error_lower.contains("unauthorized") {
            return "Invalid API key. Please check your OPENAI_API_KEY configuration.".to_string();
        }

        if error_lower.contains("rate_limit") || error_lower.contains("quota") {
            return "Rate limit exceeded. Please wait and try again, or upgrade your API plan."
                .to_string();
        }

        if error_lower.contains("model")
            && (error_lower.contains("not found") || error_lower.contains("does not exist"))
        {
            return "Model not found. Please check the requested OpenAI model.".to_string();
        }

        if error_lower.contains("billing") || error_lower.contains("payment") {
            return "Billing issue. Please check your OpenAI account billing status.".to_string();
        }

        error_detail.to_string()
    }

    fn build_request(request: &InvocationRequest<'_>) -> OpenAIChatCompletionRequest {
        let mut messages = Vec::with_capacity(2);

        if let Some(system) = request.system_prompt.filter(|s| !s.trim().is_empty()) {
            messages.push(OpenAIMessage {
                role: role::SYSTEM.to_string(),
                content: Some(system.to_string()),
            });
        }

        messages.push(OpenAIMessage {
            role: role::USER.to_string(),
            content: Some(request.prompt.to_string()),
        });

        OpenAIChatCompletionRequest {
            model: request.model.to_string(),
            messages,
            max_tokens: Some(request.max_tokens),
            temperature: Some(request.temperature),
            stream: false,
        }
    }

    /// Internal method to send completion request
    async fn send_completion_request(
        &self,
        request: &OpenAIChatCompletionRequest,
    ) -> Result<OpenAIChatCompletionResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::from_transport(e, self.timeout))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProviderError::from_status(
                status.as_u16(),
                Self::classify_error(&error_text),
            ));
        }

        response
            .json::<OpenAIChatCompletionResponse>()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    async fn invoke(&self, request: &InvocationRequest<'_>) -> Result<Completion, ProviderError> {
        let openai_request = Self::build_request(request);
        let response = self.send_completion_request(&openai_request).await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::MalformedResponse("response has no content".to_string()))?;

        let (input_tokens, output_tokens) = match response.usage {
            Some(usage) => (usage.prompt_tokens, usage.completion_tokens),
            None => {
                debug!("OpenAI response carried no usage, estimating tokens");
                let input = estimate_tokens(request.prompt, request.model)
                    + request
                        .system_prompt
                        .map(|system| estimate_tokens(system, request.model))
                        .unwrap_or(0);
                (input, estimate_tokens(&text, request.model))
            }
        };

        Ok(Completion {
            text,
            input_tokens,
            output_tokens,
        })
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }
}
