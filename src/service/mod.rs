//! Salary Admission REST Service
//!
//! Exposes the admission pipeline and moderation queue over HTTP.
//!
//! ## Endpoints
//!
//! - `POST /api/submissions` - Submit a salary record
//! - `GET /api/submissions/quota` - Rate-limit quota for a device
//! - `GET /api/records` - Query the corpus
//! - `GET /api/records/:id` - Fetch one record
//! - `POST /api/records/:id/flag` - Community report
//! - `POST /api/records/:id/moderate` - Moderator decision
//! - `GET /api/moderation/queue` - Records awaiting a moderator
//! - `GET /api/moderation/audit` - Recent moderation actions
//! - `GET /api/policy` - Active scoring policy
//! - `GET /health` - Detailed service health check
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe

pub mod middleware;
pub mod routes;
pub mod state;

pub use middleware::{metrics_middleware, record_admission, record_moderation};
pub use routes::{create_router, AppState, ErrorResponse, RecordView};
pub use state::{PolicyRef, ServiceConfig, ServiceState};
