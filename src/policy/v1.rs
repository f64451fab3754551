//! AdmissionPolicy v1: thresholds, penalties and limits for admission scoring.
//!
//! ## Float Normalization for Deterministic Hashing
//!
//! Float cut-offs are quantized to integers before hashing so that
//! `params_hash` is stable across platforms and serializer settings. The
//! quantization factor is 1e6 (multiply by 1,000,000 and round to i64).

use serde::{Deserialize, Serialize};

use crate::canonical::canonical_hash_hex;
use crate::types::{FlagType, Record, RecordStatus};
use crate::DEFAULT_POLICY_VERSION;
use super::envelope::{EnvelopeTable, SalaryEnvelope};

/// Quantization factor for float normalization.
const FLOAT_QUANTIZATION_FACTOR: f64 = 1_000_000.0;

/// Quantize a float to an i64 for deterministic hashing.
fn quantize_float(value: f64) -> i64 {
    (value * FLOAT_QUANTIZATION_FACTOR).round() as i64
}

/// A policy whose parameters cannot be applied consistently.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// Status thresholds out of order or above 100.
    #[error("Invalid status thresholds: review_at={review_at}, auto_approve_at={auto_approve_at}")]
    Thresholds {
        /// Review threshold.
        review_at: u8,
        /// Auto-approve threshold.
        auto_approve_at: u8,
    },
    /// Rate-limit window or limits unusable.
    #[error("Invalid rate limit: {0}")]
    RateLimit(&'static str),
}

/// Score deductions per anomaly type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyTable {
    /// Industry z-score above the extreme cut-off.
    pub extreme_outlier: u8,
    /// Industry z-score above the outlier cut-off.
    pub outlier: u8,
    /// Below half the envelope floor.
    pub low_for_exp: u8,
    /// Above one and a half times the envelope ceiling.
    pub high_for_exp: u8,
    /// Far from the company mean.
    pub company_mismatch: u8,
    /// Exact duplicate.
    pub duplicate: u8,
    /// Silent round-number penalty.
    pub round_number: u8,
}

impl PenaltyTable {
    /// Penalty for a flag type.
    pub fn get(&self, flag_type: FlagType) -> u8 {
        match flag_type {
            FlagType::ExtremeOutlier => self.extreme_outlier,
            FlagType::Outlier => self.outlier,
            FlagType::LowForExp => self.low_for_exp,
            FlagType::HighForExp => self.high_for_exp,
            FlagType::CompanyMismatch => self.company_mismatch,
            FlagType::Duplicate => self.duplicate,
            FlagType::RoundNumber => self.round_number,
        }
    }
}

impl Default for PenaltyTable {
    fn default() -> Self {
        Self {
            extreme_outlier: 40,
            outlier: 20,
            low_for_exp: 15,
            high_for_exp: 30,
            company_mismatch: 25,
            duplicate: 50,
            round_number: 5,
        }
    }
}

/// Which existing records form the baseline for z-score and company signals.
///
/// Exact-duplicate detection always scans the whole corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselinePopulation {
    /// Every record, whatever its status.
    All,
    /// Everything except moderator-rejected records.
    #[default]
    ExcludeRejected,
    /// Only publicly visible records.
    ApprovedOnly,
}

impl BaselinePopulation {
    /// Whether a record contributes to statistical baselines.
    pub fn includes(&self, record: &Record) -> bool {
        match self {
            Self::All => true,
            Self::ExcludeRejected => record.status != RecordStatus::Rejected,
            Self::ApprovedOnly => record.status == RecordStatus::AutoApproved,
        }
    }
}

/// Sliding-window rate limit per submitter fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Window length in seconds.
    pub window_secs: u64,
    /// Submissions in the window at which callers get an advisory warning.
    pub warn_at: usize,
    /// Submissions in the window at which further submissions are blocked.
    pub block_at: usize,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            window_secs: 3_600,
            warn_at: 3,
            block_at: 5,
        }
    }
}

/// Silent round-number rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundNumberRule {
    /// Salary must be a multiple of this.
    pub unit: u64,
    /// Salary must be strictly above this.
    pub above: u64,
}

impl Default for RoundNumberRule {
    fn default() -> Self {
        Self {
            unit: 10_000,
            above: 50_000,
        }
    }
}

impl RoundNumberRule {
    /// Whether a salary trips the rule.
    pub fn matches(&self, salary: u64) -> bool {
        self.unit > 0 && salary >= self.unit && salary % self.unit == 0 && salary > self.above
    }
}

/// Trust bonus for completing friction fields.
///
/// Both tiers apply when the higher one is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrictionBonus {
    /// Bonus once at least two fields are filled.
    pub two_fields: u8,
    /// Additional bonus once at least three fields are filled.
    pub three_fields: u8,
}

impl Default for FrictionBonus {
    fn default() -> Self {
        Self {
            two_fields: 5,
            three_fields: 10,
        }
    }
}

/// Quantized policy parameters for deterministic hashing.
#[derive(Debug, Clone, Serialize)]
struct QuantizedPolicyParams<'a> {
    version: &'a str,
    auto_approve_at: u8,
    review_at: u8,
    z_extreme: i64,
    z_outlier: i64,
    stddev_floor: i64,
    min_industry_group: usize,
    min_company_group: usize,
    company_deviation: i64,
    envelope_low_factor: i64,
    envelope_high_factor: i64,
    envelopes: Vec<(&'a str, SalaryEnvelope)>,
    penalties: &'a PenaltyTable,
    round_number: &'a RoundNumberRule,
    friction_bonus: &'a FrictionBonus,
    duplicate_ceiling: u8,
    baseline: BaselinePopulation,
    rate_limit: &'a RateLimitPolicy,
}

/// Admission policy version 1.
///
/// ## Parameters
///
/// - `auto_approve_at` / `review_at`: status thresholds on the trust score
/// - `z_extreme` / `z_outlier`: industry z-score cut-offs
/// - `stddev_floor`: lower bound on the industry standard deviation
/// - `min_industry_group` / `min_company_group`: sample sizes below which a signal is skipped
/// - `company_deviation`: relative distance from the company mean that counts as a mismatch
/// - `envelope_low_factor` / `envelope_high_factor`: multipliers on the envelope bounds
/// - `duplicate_ceiling`: highest final trust score an exact duplicate can hold,
///   friction bonus included
/// - `baseline`: which records feed the statistical signals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmissionPolicyV1 {
    /// Policy version identifier.
    pub version: String,
    /// Scores at or above this are auto-approved.
    pub auto_approve_at: u8,
    /// Scores at or above this (and below `auto_approve_at`) need review.
    pub review_at: u8,
    /// z above this is an extreme outlier.
    pub z_extreme: f64,
    /// z above this (up to `z_extreme`) is an outlier.
    pub z_outlier: f64,
    /// Minimum standard deviation used for z-scores.
    pub stddev_floor: f64,
    /// Same-industry records required before the z-score signal runs.
    pub min_industry_group: usize,
    /// Same-company records required before the company signal runs.
    pub min_company_group: usize,
    /// Relative deviation from the company mean that triggers a mismatch.
    pub company_deviation: f64,
    /// Below `min * factor` is low for experience.
    pub envelope_low_factor: f64,
    /// Above `max * factor` is high for experience.
    pub envelope_high_factor: f64,
    /// Experience envelopes.
    pub envelopes: EnvelopeTable,
    /// Score deductions.
    pub penalties: PenaltyTable,
    /// Silent round-number rule.
    pub round_number: RoundNumberRule,
    /// Friction completion bonus.
    pub friction_bonus: FrictionBonus,
    /// Cap on the final trust score of an exact duplicate.
    #[serde(default = "default_duplicate_ceiling")]
    pub duplicate_ceiling: u8,
    /// Baseline population for statistical signals.
    pub baseline: BaselinePopulation,
    /// Per-fingerprint rate limit.
    pub rate_limit: RateLimitPolicy,
}

impl AdmissionPolicyV1 {
    /// Get the policy ID.
    pub fn policy_id(&self) -> &str {
        &self.version
    }

    /// Check that the parameters can be applied.
    ///
    /// Loaded policies should pass this before reaching a pipeline.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.review_at > self.auto_approve_at || self.auto_approve_at > 100 {
            return Err(PolicyError::Thresholds {
                review_at: self.review_at,
                auto_approve_at: self.auto_approve_at,
            });
        }
        if self.rate_limit.window_secs == 0 {
            return Err(PolicyError::RateLimit("window_secs must be positive"));
        }
        if self.rate_limit.block_at == 0 {
            return Err(PolicyError::RateLimit("block_at must be at least 1"));
        }
        if self.rate_limit.warn_at > self.rate_limit.block_at {
            return Err(PolicyError::RateLimit("warn_at must not exceed block_at"));
        }
        Ok(())
    }

    /// Compute a hash of the policy parameters.
    ///
    /// Uses quantized float representation so identical policies hash
    /// identically regardless of float formatting.
    pub fn params_hash(&self) -> String {
        let envelopes = self
            .envelopes
            .iter()
            .map(|(band, envelope)| (band.as_str(), *envelope))
            .collect();

        let quantized = QuantizedPolicyParams {
            version: &self.version,
            auto_approve_at: self.auto_approve_at,
            review_at: self.review_at,
            z_extreme: quantize_float(self.z_extreme),
            z_outlier: quantize_float(self.z_outlier),
            stddev_floor: quantize_float(self.stddev_floor),
            min_industry_group: self.min_industry_group,
            min_company_group: self.min_company_group,
            company_deviation: quantize_float(self.company_deviation),
            envelope_low_factor: quantize_float(self.envelope_low_factor),
            envelope_high_factor: quantize_float(self.envelope_high_factor),
            envelopes,
            penalties: &self.penalties,
            round_number: &self.round_number,
            friction_bonus: &self.friction_bonus,
            duplicate_ceiling: self.duplicate_ceiling,
            baseline: self.baseline,
            rate_limit: &self.rate_limit,
        };
        canonical_hash_hex(&quantized)
    }
}

fn default_duplicate_ceiling() -> u8 {
    50
}

impl Default for AdmissionPolicyV1 {
    fn default() -> Self {
        Self {
            version: DEFAULT_POLICY_VERSION.to_string(),
            auto_approve_at: 70,
            review_at: 40,
            z_extreme: 3.0,
            z_outlier: 2.5,
            stddev_floor: 1.0,
            min_industry_group: 3,
            min_company_group: 2,
            company_deviation: 1.0,
            envelope_low_factor: 0.5,
            envelope_high_factor: 1.5,
            envelopes: EnvelopeTable::default(),
            penalties: PenaltyTable::default(),
            round_number: RoundNumberRule::default(),
            friction_bonus: FrictionBonus::default(),
            duplicate_ceiling: default_duplicate_ceiling(),
            baseline: BaselinePopulation::default(),
            rate_limit: RateLimitPolicy::default(),
        }
    }
}
