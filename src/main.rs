//! Prompt Playground
//!
//! Sends one prompt to several LLM providers concurrently and reports the
//! responses side by side with latency, token usage and cost.

mod api;
mod core;
mod models;

use crate::api::endpoints::{AppState, create_router};
use crate::core::config::Config;
use crate::core::constants::api as api_info;
use crate::core::engine::{CompareLimits, ComparisonEngine};
use crate::core::logging::init_logging;
use crate::core::metrics::Metrics;
use crate::core::pricing::PricingTable;
use crate::core::provider::{ProviderRegistry, ProviderType};
use crate::core::providers::{AnthropicProvider, OpenAIProvider};
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Check for --help flag
    if std::env::args().any(|arg| arg == "--help") {
        print_help();
        return;
    }

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            eprintln!("Configuration Error: {:#}", e);
            std::process::exit(1);
        }
    };

    // Initialize logging
    init_logging(&config.log_level);

    print_startup_banner(&config);

    let registry = match build_registry(&config) {
        Ok(registry) => registry,
        Err(e) => {
            error!("Failed to initialize providers: {:#}", e);
            std::process::exit(1);
        }
    };

    if !config.has_providers() {
        warn!("No provider API keys configured; comparisons will be rejected");
    } else {
        info!("Providers configured: {}", registry.ids().join(", "));
    }

    let pricing = PricingTable::with_overrides(&config.pricing_overrides);
    info!("Pricing loaded for {} models", pricing.len());

    let engine = ComparisonEngine::new(
        Arc::new(registry),
        Arc::new(pricing),
        CompareLimits::from_config(&config),
    );

    // Create application state
    let app_state = AppState {
        config: config.clone(),
        engine: Arc::new(engine),
        metrics: Arc::new(Metrics::new()),
    };

    let app = create_router(app_state);

    // Bind to address
    let addr = format!("{}:{}", config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!("Server listening on http://{}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Register a backend for every provider that has an API key
fn build_registry(config: &Config) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    if let Some(api_key) = &config.openai_api_key {
        let provider = OpenAIProvider::new(
            api_key.clone(),
            config.openai_base_url.clone(),
            config.openai_model.clone(),
            config.request_timeout,
        )?;
        registry.register(ProviderType::OpenAI.id(), Arc::new(provider));
    }

    if let Some(api_key) = &config.anthropic_api_key {
        let provider = AnthropicProvider::new(
            api_key.clone(),
            config.anthropic_base_url.clone(),
            config.anthropic_version.clone(),
            config.anthropic_model.clone(),
            config.request_timeout,
        )?;
        registry.register(ProviderType::Anthropic.id(), Arc::new(provider));
    }

    Ok(registry)
}

/// Print startup banner with configuration
fn print_startup_banner(config: &Config) {
    let status = |key: &Option<String>| if key.is_some() { "Configured" } else { "Missing key" };

    println!("🚀 {} v{}", api_info::SERVICE_NAME, api_info::VERSION);
    println!("✅ Configuration loaded successfully");
    println!(
        "   OpenAI: {} ({})",
        status(&config.openai_api_key),
        config.openai_model
    );
    println!(
        "   Anthropic: {} ({})",
        status(&config.anthropic_api_key),
        config.anthropic_model
    );
    println!("   Max Tokens Limit: {}", config.max_tokens_limit);
    println!("   Max Prompt Length: {}", config.max_prompt_length);
    println!("   Request Timeout: {}s", config.request_timeout);
    println!("   Compare Timeout: {}s", config.compare_timeout);
    println!("   Server: {}:{}", config.host, config.port);
    println!();
}

/// Print help message
fn print_help() {
    println!("{} v{}", api_info::SERVICE_NAME, api_info::VERSION);
    println!();
    println!("Usage: prompt-playground [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --help    Display this help message");
    println!();
    println!("Configuration file:");
    println!("  CONFIG_PATH - Path to the TOML config file (default: config.toml)");
    println!();
    println!("Environment variables (override the config file):");
    println!("  OPENAI_API_KEY - Enables the openai provider");
    println!("  ANTHROPIC_API_KEY - Enables the anthropic provider");
    println!("  HOST - Server host (default: 0.0.0.0)");
    println!("  PORT - Server port (default: 8001)");
    println!("  LOG_LEVEL - Logging level (default: info)");
    println!("  RUST_LOG - Full tracing filter, takes precedence over LOG_LEVEL");
}
