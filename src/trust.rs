//! Final trust scoring: anomaly score plus friction-completion bonus.
//!
//! Runs once per admission. A record's score and status are never
//! recomputed as the corpus grows; only moderation changes them afterwards.

use serde::Serialize;

use crate::anomaly::AnomalyReport;
use crate::policy::{clamp_score, status_for_score, AdmissionPolicyV1};
use crate::types::{Flag, FlagType, FrictionFields, RecordStatus};

/// Final admission verdict for a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrustAssessment {
    /// Score after the friction bonus, in [0, 100].
    pub trust_score: u8,
    /// Status derived from `trust_score`.
    pub status: RecordStatus,
    /// Visible anomaly flags.
    pub flags: Vec<Flag>,
    /// Score before the friction bonus.
    pub anomaly_score: u8,
    /// Points added for friction fields.
    pub friction_bonus: u8,
}

/// Combines anomaly scores with friction completeness.
#[derive(Debug, Clone, Default)]
pub struct TrustEngine {
    policy: AdmissionPolicyV1,
}

impl TrustEngine {
    /// Create an engine for a policy.
    pub fn new(policy: AdmissionPolicyV1) -> Self {
        Self { policy }
    }

    /// Bonus earned for the given friction fields.
    ///
    /// The two-field and three-field tiers stack: three or more completed
    /// fields earn both.
    pub fn friction_bonus(&self, friction: &FrictionFields) -> u8 {
        let completed = friction.completed();
        let bonus = &self.policy.friction_bonus;

        let mut total: u8 = 0;
        if completed >= 3 {
            total = total.saturating_add(bonus.three_fields);
        }
        if completed >= 2 {
            total = total.saturating_add(bonus.two_fields);
        }
        total
    }

    /// Finalize score and status for a submission.
    ///
    /// An exact duplicate never ends above the policy's duplicate ceiling,
    /// whatever friction bonus it earned.
    pub fn finalize(&self, report: &AnomalyReport, friction: &FrictionFields) -> TrustAssessment {
        let friction_bonus = self.friction_bonus(friction);
        let mut trust_score = clamp_score(i64::from(report.score) + i64::from(friction_bonus));
        if report.has(FlagType::Duplicate) {
            trust_score = trust_score.min(self.policy.duplicate_ceiling);
        }

        TrustAssessment {
            trust_score,
            status: status_for_score(trust_score, &self.policy),
            flags: report.visible_flags(),
            anomaly_score: report.score,
            friction_bonus,
        }
    }
}
