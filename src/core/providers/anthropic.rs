//! Anthropic provider implementation

use crate::core::constants::{content, role};
use crate::core::tokenizer::estimate_tokens;
use crate::core::provider::{Completion, InvocationRequest, Provider, ProviderError};
use crate::models::anthropic::{
    AnthropicMessage, AnthropicMessagesRequest, AnthropicMessagesResponse,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Anthropic provider for the Messages API
///
/// Authenticates with the `x-api-key` header and pins the API version with
/// `anthropic-version`.
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    api_version: String,
    default_model: String,
    timeout: u64,
}

impl AnthropicProvider {
    pub fn new(
        api_key: String,
        base_url: String,
        api_version: String,
        default_model: String,
        timeout: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .context("Failed to create HTTP client for Anthropic")?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version,
            default_model,
            timeout,
        })
    }

    fn classify_error(error_detail: &str) -> String {
        let error_lower = error_detail.to_lowercase();

        if error_lower.contains("authentication_error") || error_lower.contains("invalid x-api-key") {
            return "Invalid API key. Please check your ANTHROPIC_API_KEY configuration.".to_string();
        }

        if error_lower.contains("rate_limit") {
            return "Rate limit exceeded. Please wait and try again.".to_string();
        }

        if error_lower.contains("overloaded") {
            return "Anthropic API is overloaded. Please try again later.".to_string();
        }

        if error_lower.contains("not_found_error") && error_lower.contains("model") {
            return "Model not found. Please check the requested Anthropic model.".to_string();
        }

        if error_lower.contains("credit balance") || error_lower.contains("billing") {
            return "Billing issue. Please check your Anthropic account credit balance.".to_string();
        }

        error_detail.to_string()
    }

    fn build_request(request: &InvocationRequest<'_>) -> AnthropicMessagesRequest {
        AnthropicMessagesRequest {
            model: request.model.to_string(),
            max_tokens: request.max_tokens,
            messages: vec![AnthropicMessage {
                role: role::USER.to_string(),
                content: request.prompt.to_string(),
            }],
            system: request
                .system_prompt
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string),
            temperature: Some(request.temperature),
        }
    }

    async fn send_messages_request(
        &self,
        request: &AnthropicMessagesRequest,
    ) -> Result<AnthropicMessagesResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
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
            .json::<AnthropicMessagesResponse>()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn invoke(&self, request: &InvocationRequest<'_>) -> Result<Completion, ProviderError> {
        let anthropic_request = Self::build_request(request);
        let response = self.send_messages_request(&anthropic_request).await?;

        let parts: Vec<String> = response
            .content
            .into_iter()
            .filter(|block| block.content_type == content::TEXT)
            .filter_map(|block| block.text)
            .collect();

        if parts.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "response has no text content".to_string(),
            ));
        }
        let text = parts.join("");

        let (input_tokens, output_tokens) = match response.usage {
            Some(usage) => (usage.input_tokens, usage.output_tokens),
            None => {
                debug!("Anthropic response carried no usage, estimating tokens");
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
        "Anthropic"
    }
}
