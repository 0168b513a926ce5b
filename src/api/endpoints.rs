//! API endpoint handlers
//!
//! This module implements the HTTP endpoints of the prompt playground:
//! prompt comparison, template browsing and rendering, pricing, metrics and
//! health checks.

use crate::api::middleware::log_requests;
use crate::core::config::Config;
use crate::core::constants::api;
use crate::core::engine::{CompareError, ComparisonEngine};
use crate::core::metrics::{Endpoint, Metrics};
use crate::core::pricing::{self, CostBreakdown};
use crate::core::templates::{self, PromptTemplate, TemplateError};
use crate::models::compare::{CompareRequest, ComparisonSummary};
use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<ComparisonEngine>,
    pub metrics: Arc<Metrics>,
}

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/metrics", get(get_metrics))
        .route("/api/providers", get(get_providers))
        .route("/api/pricing", get(get_pricing))
        .route("/api/pricing/{model}", get(estimate_cost))
        .route("/api/estimate", post(compare_costs))
        .route("/api/categories", get(get_categories))
        .route("/api/templates", get(get_templates))
        .route("/api/templates/{template_id}", get(get_template_by_id))
        .route("/api/templates/category/{category}", get(get_templates_by_category))
        .route("/api/render", post(render_template))
        .route("/api/compare", post(compare_prompts))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Error payload returned by every failing endpoint
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "detail": self.message,
            "error": {
                "type": self.kind,
                "message": self.message,
            }
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<CompareError> for ApiError {
    fn from(error: CompareError) -> Self {
        match error {
            CompareError::Validation(message) => ApiError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                kind: "validation_error",
                message,
            },
            error @ CompareError::AllProvidersFailed(_) => ApiError {
                status: StatusCode::BAD_GATEWAY,
                kind: "provider_invocation_error",
                message: error.to_string(),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError {
            status: rejection.status(),
            kind: "validation_error",
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            kind: "validation_error",
            message: rejection.body_text(),
        }
    }
}

impl From<TemplateError> for ApiError {
    fn from(error: TemplateError) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            kind: "not_found",
            message: error.to_string(),
        }
    }
}

/// Request to render a template
#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub template_id: String,
    #[serde(default)]
    pub values: HashMap<String, String>,
}

/// Token counts for a cost estimate
#[derive(Debug, Deserialize)]
pub struct CostQuery {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

/// Request to estimate one exchange across several models
#[derive(Debug, Deserialize)]
pub struct EstimateRequest {
    pub prompt: String,
    #[serde(default)]
    pub expected_response: String,
    pub models: Vec<String>,
}

/// Per-model estimates and the cheapest model
#[derive(Debug, Serialize)]
pub struct EstimateResponse {
    pub costs: BTreeMap<String, CostBreakdown>,
    pub cheapest: Option<String>,
    pub cheapest_cost: Option<f64>,
}

/// Rendered template
#[derive(Debug, Serialize)]
pub struct RenderResponse {
    pub template_id: &'static str,
    pub name: &'static str,
    pub rendered_prompt: String,
    pub system_prompt: &'static str,
    pub variables: &'static [&'static str],
}

fn template_summary(template: &PromptTemplate) -> Value {
    json!({
        "id": template.id,
        "name": template.name,
        "description": template.description,
        "category": template.category,
        "variables": template.variables,
        "example_values": template.examples(),
    })
}

/// POST /api/compare - Compare a prompt across providers
async fn compare_prompts(
    State(state): State<AppState>,
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> Result<Json<ComparisonSummary>, ApiError> {
    state.metrics.increment_request(Endpoint::Compare);
    let Json(request) = payload?;
    let start = Instant::now();

    let outcome = state.engine.compare(request).await;

    match outcome {
        Ok(summary) => {
            state
                .metrics
                .record_comparison(start.elapsed(), summary.failures.len(), false);
            Ok(Json(summary))
        }
        Err(CompareError::AllProvidersFailed(failures)) => {
            state
                .metrics
                .record_comparison(start.elapsed(), failures.len(), true);
            let e = CompareError::AllProvidersFailed(failures);
            error!("Compare request failed: {}", e);
            Err(e.into())
        }
        Err(e) => {
            warn!("Compare request rejected: {}", e);
            Err(e.into())
        }
    }
}

/// GET /api/templates - All templates
async fn get_templates(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.increment_request(Endpoint::Templates);
    let templates: Vec<Value> = templates::all().iter().map(template_summary).collect();
    Json(templates)
}

/// GET /api/templates/{template_id} - One template in full
async fn get_template_by_id(
    State(state): State<AppState>,
    Path(template_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.metrics.increment_request(Endpoint::Templates);
    let template = templates::get(&template_id)?;
    Ok(Json(json!({
        "id": template.id,
        "name": template.name,
        "description": template.description,
        "template": template.template,
        "variables": template.variables,
        "system_prompt": template.system_prompt,
        "category": template.category,
        "example_values": template.examples(),
    })))
}

/// GET /api/templates/category/{category} - Templates in a category
async fn get_templates_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> impl IntoResponse {
    state.metrics.increment_request(Endpoint::Templates);
    let templates: Vec<Value> = templates::by_category(&category)
        .into_iter()
        .map(template_summary)
        .collect();
    Json(templates)
}

/// GET /api/categories - Template categories
async fn get_categories(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.increment_request(Endpoint::Other);
    Json(templates::categories())
}

/// POST /api/render - Render a template with values
async fn render_template(
    State(state): State<AppState>,
    payload: Result<Json<RenderRequest>, JsonRejection>,
) -> Result<Json<RenderResponse>, ApiError> {
    state.metrics.increment_request(Endpoint::Render);
    let Json(request) = payload?;
    let template = templates::get(&request.template_id)?;

    Ok(Json(RenderResponse {
        template_id: template.id,
        name: template.name,
        rendered_prompt: template.render(&request.values),
        system_prompt: template.system_prompt,
        variables: template.variables,
    }))
}

/// GET /api/pricing - Pricing for every known model
async fn get_pricing(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.increment_request(Endpoint::Other);
    Json(state.engine.pricing().entries())
}

/// GET /api/pricing/{model} - Cost breakdown for a token count
async fn estimate_cost(
    State(state): State<AppState>,
    Path(model): Path<String>,
    query: Result<Query<CostQuery>, QueryRejection>,
) -> Result<Json<CostBreakdown>, ApiError> {
    state.metrics.increment_request(Endpoint::Other);
    let Query(query) = query?;
    Ok(Json(state.engine.pricing().breakdown(
        &model,
        query.input_tokens,
        query.output_tokens,
    )))
}

/// POST /api/estimate - Estimated cost of one exchange on several models
async fn compare_costs(
    State(state): State<AppState>,
    payload: Result<Json<EstimateRequest>, JsonRejection>,
) -> Result<Json<EstimateResponse>, ApiError> {
    state.metrics.increment_request(Endpoint::Other);
    let Json(request) = payload?;
    if request.models.is_empty() {
        return Err(ApiError {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            kind: "validation_error",
            message: "at least one model is required".to_string(),
        });
    }

    let models: Vec<&str> = request.models.iter().map(String::as_str).collect();
    let costs = state
        .engine
        .pricing()
        .compare_costs(&request.prompt, &request.expected_response, &models);
    let (cheapest, cheapest_cost) = match pricing::cheapest(&costs) {
        Some((model, cost)) => (Some(model.to_string()), Some(cost)),
        None => (None, None),
    };

    Ok(Json(EstimateResponse {
        costs,
        cheapest,
        cheapest_cost,
    }))
}

/// GET /api/providers - Configured providers and their default models
async fn get_providers(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.increment_request(Endpoint::Other);
    let registry = state.engine.registry();
    let providers: Vec<Value> = registry
        .ids()
        .into_iter()
        .filter_map(|id| {
            registry.get(id).map(|provider| {
                json!({
                    "id": id,
                    "name": provider.provider_name(),
                    "default_model": provider.default_model(),
                })
            })
        })
        .collect();
    Json(providers)
}

/// GET /metrics - Metrics summary
async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.summary())
}

/// GET / - Root endpoint
async fn root(State(state): State<AppState>) -> impl IntoResponse {
    state.metrics.increment_request(Endpoint::Other);
    Json(json!({
        "service": api::SERVICE_NAME,
        "version": api::VERSION,
        "status": "healthy",
        "config": {
            "providers": state.engine.registry().ids(),
            "max_tokens_limit": state.config.max_tokens_limit,
            "max_prompt_length": state.config.max_prompt_length,
            "compare_timeout": state.config.compare_timeout,
        },
        "endpoints": {
            "compare": "/api/compare",
            "render": "/api/render",
            "templates": "/api/templates",
            "categories": "/api/categories",
            "pricing": "/api/pricing",
            "estimate": "/api/pricing/{model}",
            "compare_costs": "/api/estimate",
            "providers": "/api/providers",
            "metrics": "/metrics",
            "health": "/health",
        },
    }))
}

/// GET /health - Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "templates_available": templates::all().len(),
        "categories": templates::categories(),
        "providers_configured": state.engine.registry().ids(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::middleware::{API_VERSION_HEADER, PROCESS_TIME_HEADER};
    use crate::core::engine::CompareLimits;
    use crate::core::pricing::PricingTable;
    use crate::core::provider::{Completion, InvocationRequest, Provider, ProviderError, ProviderRegistry};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use tower::ServiceExt;

    struct Echo {
        model: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl Provider for Echo {
        async fn invoke(&self, request: &InvocationRequest<'_>) -> Result<Completion, ProviderError> {
            if self.fail {
                return Err(ProviderError::RateLimit("try later".to_string()));
            }
            Ok(Completion {
                text: request.prompt.to_uppercase(),
                input_tokens: 15,
                output_tokens: 25,
            })
        }

        fn default_model(&self) -> &str {
            self.model
        }

        fn provider_name(&self) -> &str {
            "Echo"
        }
    }

    fn app(fail_openai: bool) -> Router {
        let mut registry = ProviderRegistry::new();
        registry.register("openai", Arc::new(Echo { model: "gpt-4", fail: fail_openai }));
        registry.register(
            "anthropic",
            Arc::new(Echo {
                model: "claude-3-5-sonnet",
                fail: false,
            }),
        );
        let engine = ComparisonEngine::new(
            Arc::new(registry),
            Arc::new(PricingTable::new()),
            CompareLimits::default(),
        );
        create_router(AppState {
            config: Arc::new(Config::default()),
            engine: Arc::new(engine),
            metrics: Arc::new(Metrics::new()),
        })
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value, Response) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let (parts, body) = response.into_parts();
        let bytes = to_bytes(body, usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value, Response::from_parts(parts, Body::empty()))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let (status, body, response) = send(app(false), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["templates_available"], 10);
        assert_eq!(body["providers_configured"], json!(["anthropic", "openai"]));
        assert!(response.headers().contains_key(PROCESS_TIME_HEADER));
        assert_eq!(response.headers()[API_VERSION_HEADER], "1.0.0");
    }

    #[tokio::test]
    async fn test_compare_ranks_providers() {
        let request = post_json(
            "/api/compare",
            json!({
                "prompt": "Write a haiku about coding",
                "providers": ["openai", "anthropic"],
                "temperature": 0.7
            }),
        );
        let (status, body, _) = send(app(false), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cheapest"], "anthropic");
        assert_eq!(body["results"].as_array().unwrap().len(), 2);
        assert_eq!(body["results"][0]["response"], "WRITE A HAIKU ABOUT CODING");
        assert_eq!(body["total_tokens"], 80);
        assert!(body["results"][0]["latency"].is_f64());
    }

    #[tokio::test]
    async fn test_compare_partial_failure_is_success() {
        let request = post_json(
            "/api/compare",
            json!({"prompt": "hello", "providers": ["openai", "anthropic"]}),
        );
        let (status, body, _) = send(app(true), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fastest"], "anthropic");
        assert_eq!(body["failures"][0]["provider"], "openai");
        assert!(body["failures"][0]["reason"].as_str().unwrap().contains("try later"));
    }

    #[tokio::test]
    async fn test_compare_all_failed_is_bad_gateway() {
        let request = post_json("/api/compare", json!({"prompt": "hello", "providers": ["openai"]}));
        let (status, body, _) = send(app(true), request).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["type"], "provider_invocation_error");
        assert!(body["detail"].as_str().unwrap().contains("openai: Rate limit exceeded"));
    }

    #[tokio::test]
    async fn test_compare_empty_providers_is_validation_error() {
        let request = post_json("/api/compare", json!({"prompt": "test", "providers": []}));
        let (status, body, _) = send(app(false), request).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["type"], "validation_error");
    }

    #[tokio::test]
    async fn test_compare_missing_prompt_rejected() {
        let request = post_json("/api/compare", json!({"providers": ["openai"]}));
        let (status, body, _) = send(app(false), request).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["type"], "validation_error");
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_compare_malformed_bodies_use_error_payload() {
        let negative = post_json(
            "/api/compare",
            json!({"prompt": "hi", "providers": ["openai"], "max_tokens": -5}),
        );
        let (status, body, _) = send(app(false), negative).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["type"], "validation_error");

        let wrong_type = post_json("/api/compare", json!({"prompt": "hi", "providers": "openai"}));
        let (status, body, _) = send(app(false), wrong_type).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["type"], "validation_error");

        let syntax = Request::builder()
            .method("POST")
            .uri("/api/compare")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body, _) = send(app(false), syntax).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "validation_error");
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_render_and_estimate_use_error_payload() {
        let render = post_json("/api/render", json!({"values": {}}));
        let (status, body, _) = send(app(false), render).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["type"], "validation_error");

        let (status, body, _) =
            send(app(false), get("/api/pricing/gpt-4?input_tokens=lots")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["type"], "validation_error");
    }

    #[tokio::test]
    async fn test_templates_listing_and_lookup() {
        let (status, body, _) = send(app(false), get("/api/templates")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 10);
        assert!(body[0]["variables"].is_array());

        let (status, body, _) = send(app(false), get("/api/templates/code_generation")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "code_generation");
        assert!(body["template"].as_str().unwrap().contains("{{language}}"));

        let (status, body, _) = send(app(false), get("/api/templates/nonexistent")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "not_found");
    }

    #[tokio::test]
    async fn test_templates_by_category() {
        let (status, body, _) = send(app(false), get("/api/templates/category/coding")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (_, body, _) = send(app(false), get("/api/categories")).await;
        assert!(body.as_array().unwrap().contains(&json!("creative")));
    }

    #[tokio::test]
    async fn test_render_template() {
        let request = post_json(
            "/api/render",
            json!({
                "template_id": "code_generation",
                "values": {"language": "Python", "task": "calculate fibonacci numbers"}
            }),
        );
        let (status, body, _) = send(app(false), request).await;
        assert_eq!(status, StatusCode::OK);
        let rendered = body["rendered_prompt"].as_str().unwrap();
        assert!(rendered.contains("Python"));
        assert!(rendered.contains("fibonacci"));

        let missing = post_json("/api/render", json!({"template_id": "nonexistent", "values": {}}));
        let (status, _, _) = send(app(false), missing).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_pricing_and_providers() {
        let (status, body, _) = send(app(false), get("/api/pricing")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gpt-4"]["input_per_1k"], 0.03);
        assert_eq!(body["gpt-4"]["output_per_1k"], 0.06);

        let (_, body, _) = send(app(false), get("/api/providers")).await;
        assert_eq!(body[1]["id"], "openai");
        assert_eq!(body[1]["default_model"], "gpt-4");
    }

    #[tokio::test]
    async fn test_estimate_cost() {
        let uri = "/api/pricing/gpt-4?input_tokens=1000&output_tokens=500";
        let (status, body, _) = send(app(false), get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_tokens"], 1500);
        assert!((body["total_cost"].as_f64().unwrap() - 0.06).abs() < 1e-12);
        assert_eq!(body["formatted_cost"], "$0.0600");

        let (_, body, _) = send(app(false), get("/api/pricing/mystery-model")).await;
        assert_eq!(body["total_cost"], 0.0);
        assert_eq!(body["formatted_cost"], "$0.00");
    }

    #[tokio::test]
    async fn test_compare_costs_names_cheapest() {
        let request = post_json(
            "/api/estimate",
            json!({
                "prompt": "Summarize this article",
                "expected_response": "A short summary.",
                "models": ["gpt-4", "gpt-4o", "claude-3-haiku"]
            }),
        );
        let (status, body, _) = send(app(false), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["costs"].as_object().unwrap().len(), 3);
        assert_eq!(body["cheapest"], "claude-3-haiku");
        assert_eq!(body["cheapest_cost"], body["costs"]["claude-3-haiku"]["total_cost"]);

        let empty = post_json("/api/estimate", json!({"prompt": "x", "models": []}));
        let (status, body, _) = send(app(false), empty).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["type"], "validation_error");
    }

    #[tokio::test]
    async fn test_validation_rejection_is_not_a_failed_comparison() {
        let router = app(true);
        let invalid = post_json("/api/compare", json!({"prompt": "hi", "providers": []}));
        send(router.clone(), invalid).await;
        let (_, body, _) = send(router.clone(), get("/metrics")).await;
        assert_eq!(body["errors"]["comparisons_failed"], 0);
        assert_eq!(body["errors"]["compare_error_rate"], 0.0);

        let all_failed = post_json("/api/compare", json!({"prompt": "hi", "providers": ["openai"]}));
        send(router.clone(), all_failed).await;
        let (_, body, _) = send(router, get("/metrics")).await;
        assert_eq!(body["errors"]["comparisons_failed"], 1);
        assert_eq!(body["errors"]["provider_errors"], 1);
    }

    #[tokio::test]
    async fn test_metrics_track_compare() {
        let router = app(false);
        let request = post_json("/api/compare", json!({"prompt": "hi", "providers": ["anthropic"]}));
        send(router.clone(), request).await;

        let (status, body, _) = send(router, get("/metrics")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["requests"]["compare"], 1);
        assert_eq!(body["errors"]["comparisons_failed"], 0);
    }
}
