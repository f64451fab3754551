//! Salary Admission Service Binary
//!
//! Runs the admission pipeline and moderation queue as a REST API service:
//! - Structured JSON logging
//! - Request tracing with correlation IDs
//! - Graceful shutdown handling
//! - Health check endpoints
//!
//! ## Configuration
//!
//! Environment variables:
//! - `FINGERPRINT_SALT`: HMAC key for device fingerprints (required in production)
//! - `RATE_LIMIT_CAPACITY`: Max tracked device windows (default: 100000)
//! - `ADMISSION_POLICY_PATH`: JSON scoring policy (default: built-in policy v1)
//! - `PORT`: Service port (default: 8002)
//! - `HOST`: Service host (default: 0.0.0.0)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! FINGERPRINT_SALT=... cargo run --bin salary_admission_service --features service
//! ```

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, info_span, Instrument};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use salary_admission::service::routes::FINGERPRINT_HEADER;
use salary_admission::service::{create_router, metrics_middleware, ServiceConfig, ServiceState};
use salary_admission::{AdmissionPolicyV1, InMemoryCorpus};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "salary_admission_service=info,salary_admission=info,tower_http=info".into()
    });

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true)
            )
            .init();
    }
}

/// Load the scoring policy from `ADMISSION_POLICY_PATH`, or the built-in v1.
fn load_policy() -> Result<AdmissionPolicyV1, Box<dyn std::error::Error>> {
    let policy = match std::env::var("ADMISSION_POLICY_PATH") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)?;
            let policy: AdmissionPolicyV1 = serde_json::from_str(&raw)?;
            info!(path = %path, "Loaded admission policy from file");
            policy
        }
        Err(_) => AdmissionPolicyV1::default(),
    };
    policy.validate()?;
    Ok(policy)
}

/// Access log per request, keyed by `X-Request-Id` (generated when absent).
///
/// The id is echoed on the response. Only the presence of a device
/// fingerprint is logged, never its value.
async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let has_fingerprint = request.headers().contains_key(FINGERPRINT_HEADER);

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
        status = tracing::field::Empty,
    );

    let mut response = next.run(request).instrument(span.clone()).await;
    let status = response.status().as_u16();
    span.record("status", status);

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }

    info!(
        target: "salary_admission_service::access",
        request_id = %request_id,
        method = %method,
        path = %path,
        status = status,
        has_fingerprint = has_fingerprint,
        latency_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, draining connections"),
        _ = terminate => info!("Received SIGTERM, draining connections"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let version = env!("CARGO_PKG_VERSION");
    let build_sha = option_env!("BUILD_SHA").unwrap_or("dev");

    info!(
        version = version,
        build_sha = build_sha,
        "Starting Salary Admission Service"
    );

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8002);

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

    let config = ServiceConfig::from_env();
    let policy = load_policy()?;
    info!(
        policy_id = %policy.policy_id(),
        params_hash = %policy.params_hash(),
        rate_limit_capacity = config.rate_limit_capacity,
        "Admission policy loaded"
    );

    let state = ServiceState::new(InMemoryCorpus::new(), policy, config);

    // Browsers only surface Retry-After and the request id when exposed.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([header::RETRY_AFTER, HeaderName::from_static(REQUEST_ID_HEADER)]);

    let app = create_router(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!(
        address = %addr,
        version = version,
        "Salary Admission Service listening"
    );

    let listener = TcpListener::bind(addr).await?;

    info!("Ready to accept connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Salary Admission Service shutdown complete");

    Ok(())
}
