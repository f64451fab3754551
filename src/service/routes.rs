//! Axum routes for the Salary Admission service.

use axum::{
    extract::{Json, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::identity::{DeviceAttributes, Fingerprint, RateLimitStatus};
use crate::moderation::{AuditEntry, ModerationError};
use crate::pipeline::{AdmissionError, AdmissionOutcome};
use crate::policy::AdmissionPolicyV1;
use crate::store::{CorpusQuery, CorpusStore, InMemoryCorpus};
use crate::types::{
    Candidate, ExperienceBand, Flag, FrictionFields, Industry, ModerationAction, Record, RecordId,
    RecordStatus,
};
use crate::ADMISSION_SCHEMA_VERSION;

use super::middleware::{record_admission, record_moderation};
use super::state::{PolicyRef, ServiceState};

/// Type alias for the service state with InMemoryCorpus.
pub type AppState = ServiceState<InMemoryCorpus>;

/// Header carrying a fingerprint computed by a trusted edge.
pub const FINGERPRINT_HEADER: &str = "x-device-fingerprint";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to submit a salary record.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequest {
    /// The submission.
    #[serde(flatten)]
    pub candidate: Candidate,
    /// Device attributes to derive the fingerprint from. When absent the
    /// `X-Device-Fingerprint` header is used.
    #[serde(default)]
    pub device: Option<DeviceAttributes>,
}

/// Request to apply a moderator decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerateRequest {
    /// `approve`, `reject` or `dismiss_flags`.
    pub action: ModerationAction,
}

/// Corpus filter for `GET /api/records`.
///
/// Same predicate as [`CorpusQuery`], but shows only public records unless
/// `public_only=false` is passed.
#[derive(Debug, Clone, Deserialize)]
pub struct ListRecordsQuery {
    /// Restrict to one industry.
    #[serde(default)]
    pub industry: Option<Industry>,
    /// Restrict to one status.
    #[serde(default)]
    pub status: Option<RecordStatus>,
    /// Case-insensitive exact company match.
    #[serde(default)]
    pub company: Option<String>,
    /// Inclusive lower salary bound.
    #[serde(default)]
    pub min_salary: Option<u64>,
    /// Inclusive upper salary bound.
    #[serde(default)]
    pub max_salary: Option<u64>,
    /// Only publicly visible records.
    #[serde(default = "default_public_only")]
    pub public_only: bool,
}

fn default_public_only() -> bool {
    true
}

impl From<ListRecordsQuery> for CorpusQuery {
    fn from(query: ListRecordsQuery) -> Self {
        CorpusQuery {
            industry: query.industry,
            status: query.status,
            company: query.company,
            min_salary: query.min_salary,
            max_salary: query.max_salary,
            public_only: query.public_only,
        }
    }
}

/// A record as shown to display consumers (no submitter fingerprint).
#[derive(Debug, Clone, Serialize)]
pub struct RecordView {
    /// Record ID.
    pub id: RecordId,
    /// Job title.
    pub title: String,
    /// Company name.
    pub company: String,
    /// Industry.
    pub industry: Industry,
    /// City.
    pub city: String,
    /// Experience band.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience: Option<ExperienceBand>,
    /// Monthly salary in EGP.
    pub salary: u64,
    /// When the record was admitted.
    pub submitted_at: DateTime<Utc>,
    /// Whether a moderator has approved the record.
    pub verified: bool,
    /// Trust score in [0, 100].
    pub trust_score: u8,
    /// Lifecycle status.
    pub status: RecordStatus,
    /// Anomaly flags raised at admission.
    pub flags: Vec<Flag>,
    /// Number of community reports.
    pub community_flag_count: u32,
    /// Optional friction fields.
    #[serde(flatten)]
    pub friction: FrictionFields,
}

impl From<Record> for RecordView {
    fn from(record: Record) -> Self {
        Self {
            id: record.id,
            title: record.title,
            company: record.company,
            industry: record.industry,
            city: record.city,
            experience: record.experience,
            salary: record.salary,
            submitted_at: record.submitted_at,
            verified: record.verified,
            trust_score: record.trust_score,
            status: record.status,
            flags: record.flags,
            community_flag_count: record.community_flag_count,
            friction: record.friction,
        }
    }
}

/// A list of records for display consumers.
#[derive(Debug, Clone, Serialize)]
pub struct RecordListResponse {
    /// Number of records returned.
    pub count: usize,
    /// The records.
    pub records: Vec<RecordView>,
}

impl From<Vec<Record>> for RecordListResponse {
    fn from(records: Vec<Record>) -> Self {
        Self {
            count: records.len(),
            records: records.into_iter().map(RecordView::from).collect(),
        }
    }
}

/// Records awaiting a moderator, fingerprints included.
#[derive(Debug, Clone, Serialize)]
pub struct ModerationQueueResponse {
    /// Number of records returned.
    pub count: usize,
    /// The records, most urgent first.
    pub records: Vec<Record>,
}

/// Recent moderation actions.
#[derive(Debug, Clone, Serialize)]
pub struct AuditLogResponse {
    /// Entries, oldest first.
    pub entries: Vec<AuditEntry>,
}

/// The active scoring policy.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyResponse {
    /// Policy reference.
    pub policy_ref: PolicyRef,
    /// Full policy parameters.
    pub policy: AdmissionPolicyV1,
}

/// Service health response (detailed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Record schema version.
    pub schema_version: String,
    /// Active policy.
    pub policy_ref: PolicyRef,
    /// Corpus size, if the store answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<usize>,
}

/// Simple liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    /// Always `alive`.
    pub status: String,
}

/// Readiness response with dependency status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Whether the service accepts traffic.
    pub ready: bool,
    /// Whether the store answered.
    pub store: bool,
    /// Failure details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Structured error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Machine-readable error code.
    pub code: String,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response with code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Add details to the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Error returned by handlers: status, body and optional `Retry-After`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
    retry_after_secs: Option<u64>,
}

impl ApiError {
    fn new(status: StatusCode, code: &str, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse::new(code, error),
            retry_after_secs: None,
        }
    }

    fn with_details(mut self, details: impl Into<String>) -> Self {
        self.body = self.body.with_details(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(
            status = self.status.as_u16(),
            code = %self.body.code,
            error = %self.body.error,
            "Request error"
        );
        let mut response = (self.status, Json(self.body)).into_response();
        if let Some(secs) = self.retry_after_secs {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<AdmissionError> for ApiError {
    fn from(e: AdmissionError) -> Self {
        match e {
            AdmissionError::Validation(e) => {
                Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", e.to_string())
            }
            AdmissionError::RateLimited(e) => Self {
                status: StatusCode::TOO_MANY_REQUESTS,
                body: ErrorResponse::new("RATE_LIMITED", "Too many submissions, try again later")
                    .with_details(format!("{} submissions in the last hour", e.recent)),
                retry_after_secs: Some(e.retry_after_secs),
            },
            AdmissionError::StoreError(msg) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR", msg)
            }
        }
    }
}

impl From<ModerationError> for ApiError {
    fn from(e: ModerationError) -> Self {
        match e {
            ModerationError::RecordNotFound(id) => {
                Self::new(StatusCode::NOT_FOUND, "RECORD_NOT_FOUND", format!("Record not found: {}", id))
            }
            ModerationError::InvalidStateTransition(e) => {
                Self::new(StatusCode::CONFLICT, "INVALID_STATE_TRANSITION", e.to_string())
            }
            ModerationError::NotModeratorAction(action) => Self::new(
                StatusCode::BAD_REQUEST,
                "INVALID_ACTION",
                format!("Not a moderator action: {}", action),
            ),
            ModerationError::StoreError(msg) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "STORE_ERROR", msg)
            }
        }
    }
}

fn parse_record_id(raw: &str) -> Result<RecordId, ApiError> {
    RecordId::parse(raw).map_err(|e| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "INVALID_RECORD_ID",
            format!("Invalid record ID: {}", e),
        )
        .with_details(raw.to_string())
    })
}

fn header_fingerprint(headers: &HeaderMap) -> Option<Fingerprint> {
    headers
        .get(FINGERPRINT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Fingerprint::new)
}

fn missing_fingerprint() -> ApiError {
    ApiError::new(
        StatusCode::BAD_REQUEST,
        "MISSING_FINGERPRINT",
        "Provide device attributes or an X-Device-Fingerprint header",
    )
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Submit a salary record.
async fn submit_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<AdmissionOutcome>), ApiError> {
    let fingerprint = match &request.device {
        Some(device) => state.identity.identify(device),
        None => header_fingerprint(&headers).ok_or_else(missing_fingerprint)?,
    };

    match state.pipeline.submit(&request.candidate, &fingerprint) {
        Ok(outcome) => {
            record_admission("admitted", Some(outcome.status), Some(outcome.trust_score));
            Ok((StatusCode::CREATED, Json(outcome)))
        }
        Err(e) => {
            let outcome = match &e {
                AdmissionError::Validation(_) => "invalid",
                AdmissionError::RateLimited(_) => "rate_limited",
                AdmissionError::StoreError(_) => "store_error",
            };
            record_admission(outcome, None, None);
            Err(e.into())
        }
    }
}

/// Rate-limit quota for the calling device.
async fn quota_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<RateLimitStatus>, ApiError> {
    let fingerprint = header_fingerprint(&headers).ok_or_else(missing_fingerprint)?;
    Ok(Json(state.pipeline.rate_limit_status(&fingerprint)))
}

/// Query the corpus.
async fn list_records_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Json<RecordListResponse>, ApiError> {
    let records = state.pipeline.query_corpus(&query.into())?;
    Ok(Json(records.into()))
}

/// Fetch one record.
async fn get_record_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RecordView>, ApiError> {
    let id = parse_record_id(&id)?;
    state
        .pipeline
        .get(&id)?
        .map(|record| Json(record.into()))
        .ok_or_else(|| ModerationError::RecordNotFound(id).into())
}

/// Community report on a public record.
async fn flag_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RecordView>, ApiError> {
    let id = parse_record_id(&id)?;
    let result = state.moderation.flag_community(&id);
    record_moderation(ModerationAction::CommunityFlag, result.is_ok());
    Ok(Json(result?.into()))
}

/// Moderator decision.
async fn moderate_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ModerateRequest>,
) -> Result<Json<Record>, ApiError> {
    let id = parse_record_id(&id)?;
    let result = state.moderation.moderate(&id, request.action);
    record_moderation(request.action, result.is_ok());
    Ok(Json(result?))
}

/// Records awaiting a moderator.
async fn moderation_queue_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ModerationQueueResponse>, ApiError> {
    let records = state.moderation.pending()?;
    Ok(Json(ModerationQueueResponse {
        count: records.len(),
        records,
    }))
}

/// Recent moderation actions.
async fn audit_log_handler(State(state): State<Arc<AppState>>) -> Json<AuditLogResponse> {
    Json(AuditLogResponse {
        entries: state.moderation.audit_log(),
    })
}

/// Active scoring policy.
async fn policy_handler(State(state): State<Arc<AppState>>) -> Json<PolicyResponse> {
    Json(PolicyResponse {
        policy_ref: state.policy_ref.clone(),
        policy: state.pipeline.policy().clone(),
    })
}

/// Health check endpoint (detailed).
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let record_count = state.pipeline.store().len().ok();

    Json(HealthResponse {
        status: if record_count.is_some() { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        schema_version: ADMISSION_SCHEMA_VERSION.to_string(),
        policy_ref: state.policy_ref.clone(),
        record_count,
    })
}

/// Liveness probe endpoint.
///
/// Does NOT check dependencies.
async fn liveness_handler() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 if the store answers, 503 otherwise.
async fn readiness_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    match state.pipeline.store().len() {
        Ok(_) => Ok(Json(ReadinessResponse {
            ready: true,
            store: true,
            details: None,
        })),
        Err(e) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                ready: false,
                store: false,
                details: Some(e.to_string()),
            }),
        )),
    }
}

// ============================================================================
// Router Construction
// ============================================================================

/// Create the Axum router for the Salary Admission service.
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        // Submissions
        .route("/api/submissions", post(submit_handler))
        .route("/api/submissions/quota", get(quota_handler))
        // Corpus
        .route("/api/records", get(list_records_handler))
        .route("/api/records/:id", get(get_record_handler))
        // Moderation
        .route("/api/records/:id/flag", post(flag_handler))
        .route("/api/records/:id/moderate", post(moderate_handler))
        .route("/api/moderation/queue", get(moderation_queue_handler))
        .route("/api/moderation/audit", get(audit_log_handler))
        // Policy
        .route("/api/policy", get(policy_handler))
        // Health checks
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ManualTimeSource;
    use crate::service::state::ServiceConfig;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let clock = Arc::new(ManualTimeSource::new(
            Utc.with_ymd_and_hms(2024, 9, 1, 10, 0, 0).unwrap(),
        ));
        create_router(ServiceState::with_time_source(
            InMemoryCorpus::new(),
            AdmissionPolicyV1::default(),
            ServiceConfig::default(),
            clock,
        ))
    }

    fn submission(salary: u64) -> Value {
        json!({
            "title": "Backend Engineer",
            "company": "Instabug",
            "industry": "technology",
            "city": "Cairo",
            "experience": "3-5",
            "salary": salary,
        })
    }

    fn post_json(uri: &str, body: Value, fingerprint: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(fp) = fingerprint {
            builder = builder.header(FINGERPRINT_HEADER, fp);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_submit_with_header_fingerprint() {
        let response = app()
            .oneshot(post_json("/api/submissions", submission(25_000), Some("edge-fp")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["status"], "auto_approved");
        assert_eq!(body["trust_score"], 100);
        assert_eq!(body["comparison"]["sample_size"], 1);
    }

    #[tokio::test]
    async fn test_submit_with_device_attributes() {
        let mut body = submission(25_000);
        body["device"] = json!({
            "user_agent": "Mozilla/5.0",
            "language": "ar-EG",
            "platform": "Linux x86_64",
            "screen_resolution": "1920x1080",
            "color_depth": 24,
            "timezone": "Africa/Cairo",
            "hardware_concurrency": 8,
        });
        let response = app()
            .oneshot(post_json("/api/submissions", body, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_submit_without_fingerprint() {
        let response = app()
            .oneshot(post_json("/api/submissions", submission(25_000), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "MISSING_FINGERPRINT");
    }

    #[tokio::test]
    async fn test_validation_error() {
        let response = app()
            .oneshot(post_json("/api/submissions", submission(0), Some("fp")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn test_rate_limit_sets_retry_after() {
        let app = app();
        for i in 0..5 {
            let response = app
                .clone()
                .oneshot(post_json("/api/submissions", submission(20_000 + i), Some("busy")))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app
            .clone()
            .oneshot(post_json("/api/submissions", submission(20_005), Some("busy")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "3600");
        assert_eq!(body_json(response).await["code"], "RATE_LIMITED");

        let quota = app
            .oneshot(
                Request::builder()
                    .uri("/api/submissions/quota")
                    .header(FINGERPRINT_HEADER, "busy")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let quota = body_json(quota).await;
        assert_eq!(quota["recent"], 5);
        assert_eq!(quota["remaining"], 0);
    }

    #[tokio::test]
    async fn test_flag_and_moderate_lifecycle() {
        let app = app();
        let created = app
            .clone()
            .oneshot(post_json("/api/submissions", submission(25_000), Some("fp")))
            .await
            .unwrap();
        let id = body_json(created).await["record_id"]
            .as_str()
            .unwrap()
            .to_string();

        let flagged = app
            .clone()
            .oneshot(post_json(&format!("/api/records/{id}/flag"), json!({}), None))
            .await
            .unwrap();
        assert_eq!(flagged.status(), StatusCode::OK);
        assert_eq!(body_json(flagged).await["community_flag_count"], 1);

        let queue = body_json(app.clone().oneshot(get("/api/moderation/queue")).await.unwrap()).await;
        assert_eq!(queue["count"], 1);

        let rejected = app
            .clone()
            .oneshot(post_json(
                &format!("/api/records/{id}/moderate"),
                json!({"action": "reject"}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(body_json(rejected).await["status"], "rejected");

        let again = app
            .clone()
            .oneshot(post_json(
                &format!("/api/records/{id}/moderate"),
                json!({"action": "approve"}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(again.status(), StatusCode::CONFLICT);

        let audit = body_json(app.clone().oneshot(get("/api/moderation/audit")).await.unwrap()).await;
        let actions: Vec<_> = audit["entries"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["action"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(actions, vec!["community_flag", "reject"]);

        let public = body_json(
            app.oneshot(get("/api/records?public_only=true")).await.unwrap(),
        )
        .await;
        assert_eq!(public["count"], 0);
    }

    #[tokio::test]
    async fn test_record_listing_defaults_to_public_view() {
        let app = app();
        for fp in ["fp-1", "fp-2"] {
            let response = app
                .clone()
                .oneshot(post_json("/api/submissions", submission(25_000), Some(fp)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        // The second submission is a duplicate and is held for review.
        let public = body_json(app.clone().oneshot(get("/api/records")).await.unwrap()).await;
        assert_eq!(public["count"], 1);
        assert_eq!(public["records"][0]["status"], "auto_approved");
        assert!(public["records"][0].get("device_fingerprint").is_none());

        let everything = body_json(
            app.clone()
                .oneshot(get("/api/records?public_only=false"))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(everything["count"], 2);

        let queue = body_json(app.oneshot(get("/api/moderation/queue")).await.unwrap()).await;
        assert_eq!(queue["count"], 1);
        assert_eq!(queue["records"][0]["device_fingerprint"], "fp-2");
    }

    #[tokio::test]
    async fn test_record_lookup_errors() {
        let app = app();
        let missing = app
            .clone()
            .oneshot(get("/api/records/550e8400-e29b-41d4-a716-446655440000"))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let invalid = app.oneshot(get("/api/records/not-a-uuid")).await.unwrap();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(invalid).await["code"], "INVALID_RECORD_ID");
    }

    #[tokio::test]
    async fn test_policy_and_health() {
        let app = app();
        let policy = body_json(app.clone().oneshot(get("/api/policy")).await.unwrap()).await;
        assert_eq!(
            policy["policy_ref"]["params_hash"],
            AdmissionPolicyV1::default().params_hash()
        );
        assert_eq!(policy["policy"]["auto_approve_at"], 70);

        let health = body_json(app.clone().oneshot(get("/health")).await.unwrap()).await;
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["record_count"], 0);

        let ready = app.oneshot(get("/health/ready")).await.unwrap();
        assert_eq!(ready.status(), StatusCode::OK);
    }
}
