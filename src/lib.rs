//! # salary-admission
//!
//! Admission kernel for anonymous, self-reported salary records.
//!
//! The kernel answers one question:
//!
//! > Given an anonymous submission, should it enter the public corpus, and how
//! > much should it be **trusted**?
//!
//! ## Core Contract
//!
//! 1. Refuse spam cheaply: a per-device sliding-window rate limit runs before any
//!    statistical work
//! 2. Score the submission against the corpus (industry z-score, experience
//!    envelope, company consistency, round numbers, duplicates)
//! 3. Turn the score plus friction completeness into a trust score and status
//! 4. Append atomically: either the record and the submitter's timestamp are both
//!    committed, or neither is
//! 5. Let the community report and moderators override, with a bounded audit log
//!
//! ## Architecture
//!
//! ```text
//! Candidate → validate → RateLimiter → AnomalyDetector → TrustEngine → CorpusStore
//!                                                                         ↑
//!                                               ModerationQueue ──────────┘
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same submission + same corpus + same policy → identical score and flags
//! - Statistics use exact integer sums, so corpus order does not matter
//! - `AdmissionPolicyV1::params_hash` identifies the policy that scored a record

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod policy;
pub mod store;
pub mod canonical;
pub mod identity;
pub mod anomaly;
pub mod trust;
pub mod analytics;
pub mod pipeline;
pub mod moderation;

#[cfg(feature = "service")]
pub mod service;

// Re-exports
pub use types::{
    Candidate, Submission, ValidationError, Record, RecordId, Industry, ExperienceBand,
    SalaryType, ContractType, CompanySize, FrictionFields, Flag, FlagType, FlagSeverity,
    RecordStatus, ModerationAction, TransitionError, APPROVED_TRUST_FLOOR,
};
pub use policy::{
    AdmissionPolicyV1, PenaltyTable, BaselinePopulation, RateLimitPolicy, RoundNumberRule,
    FrictionBonus, EnvelopeTable, SalaryEnvelope, PolicyError,
};
pub use store::{CorpusStore, CorpusQuery, InMemoryCorpus, InMemoryError};
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};
pub use identity::{
    TimeSource, SystemTimeSource, ManualTimeSource, DeviceAttributes, Fingerprint,
    SubmitterIdentity, SubmitterSession, RateLimiter, RateLimitDecision, RateLimitReason,
    RateLimitError, RateLimitStatus,
};
pub use anomaly::{AnomalyDetector, AnomalyReport, Finding, SalaryStats};
pub use trust::{TrustEngine, TrustAssessment};
pub use analytics::Comparison;
pub use pipeline::{AdmissionPipeline, AdmissionOutcome, AdmissionError};
pub use moderation::{ModerationQueue, ModerationError, AuditEntry, AUDIT_LOG_CAPACITY};

// Service re-exports (when service feature is enabled)
#[cfg(feature = "service")]
pub use service::{create_router, ServiceState, ServiceConfig, PolicyRef};

/// Schema version for persisted records.
/// Increment on breaking changes to any schema type.
pub const ADMISSION_SCHEMA_VERSION: &str = "1.0.0";

/// Default policy version identifier.
pub const DEFAULT_POLICY_VERSION: &str = "admission_policy_v1";
