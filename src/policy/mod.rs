//! Admission policy definitions.

pub mod v1;
pub mod envelope;
pub mod scoring;

pub use v1::{
    AdmissionPolicyV1, PenaltyTable, BaselinePopulation, RateLimitPolicy, RoundNumberRule,
    FrictionBonus, PolicyError,
};
pub use envelope::{EnvelopeTable, SalaryEnvelope};
pub use scoring::{clamp_score, status_for_score};
