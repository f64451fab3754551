//! Service middleware for metrics and request tracking.
//!
//! ## Metrics Emitted
//!
//! All metrics are tracing events on the `salary_admission::metrics` target:
//!
//! - `request_metric` - path, method, status and latency per request
//! - `admission_metric` - outcome, status and trust score per submission
//! - `moderation_metric` - action and result per moderation call

use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::info;

use crate::types::{ModerationAction, RecordStatus};

/// Metrics middleware that records request counts and latency.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = normalize_path(request.uri().path());

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status().as_u16();

    info!(
        target: "salary_admission::metrics",
        metric_type = "request",
        path = %path,
        method = %method,
        status = status,
        latency_ms = latency.as_millis() as u64,
        "request_metric"
    );

    response
}

/// Normalize path for metrics to avoid high cardinality.
///
/// Replaces record UUIDs with `:id`.
fn normalize_path(path: &str) -> String {
    static UUID_REGEX: OnceLock<regex_lite::Regex> = OnceLock::new();
    let uuid_regex = UUID_REGEX.get_or_init(|| {
        regex_lite::Regex::new(
            r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        )
        .expect("UUID pattern is valid")
    });

    uuid_regex.replace_all(path, ":id").to_string()
}

/// Record the outcome of a submission.
///
/// `status` is `None` when the submission was refused.
pub fn record_admission(outcome: &str, status: Option<RecordStatus>, trust_score: Option<u8>) {
    info!(
        target: "salary_admission::metrics",
        metric_type = "admission",
        outcome = outcome,
        status = status.map(|s| s.as_str()),
        trust_score = trust_score,
        "admission_metric"
    );
}

/// Record a moderation call.
pub fn record_moderation(action: ModerationAction, applied: bool) {
    let result = if applied { "applied" } else { "refused" };
    info!(
        target: "salary_admission::metrics",
        metric_type = "moderation",
        action = action.as_str(),
        result = result,
        "moderation_metric"
    );
}
