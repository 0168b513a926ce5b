//! Request logging middleware
//!
//! Logs every request with its status and duration, and stamps the
//! `X-Process-Time` and `X-API-Version` headers on the response.

use crate::core::constants::api;
use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::info;

pub const PROCESS_TIME_HEADER: &str = "x-process-time";
pub const API_VERSION_HEADER: &str = "x-api-version";

pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    info!("Request: {} {}", method, path);

    let mut response = next.run(request).await;
    let duration = start.elapsed().as_secs_f64();

    info!(
        "Response: {} {} status={} duration={:.3}s",
        method,
        path,
        response.status().as_u16(),
        duration
    );

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&format!("{:.6}", duration)) {
        headers.insert(PROCESS_TIME_HEADER, value);
    }
    headers.insert(API_VERSION_HEADER, HeaderValue::from_static(api::VERSION));

    response
}
