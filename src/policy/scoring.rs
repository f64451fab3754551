//! Score arithmetic shared by the anomaly detector and trust engine.

use crate::types::RecordStatus;
use super::v1::AdmissionPolicyV1;

/// Upper bound of every trust score.
pub const MAX_SCORE: i64 = 100;

/// Clamp a raw score into [0, 100].
pub fn clamp_score(raw: i64) -> u8 {
    raw.clamp(0, MAX_SCORE) as u8
}

/// Map a trust score to the initial lifecycle status.
///
/// ```text
/// score >= auto_approve_at          → AutoApproved
/// review_at <= score < auto_approve → NeedsReview
/// score < review_at                 → Flagged
/// ```
pub fn status_for_score(score: u8, policy: &AdmissionPolicyV1) -> RecordStatus {
    if score >= policy.auto_approve_at {
        RecordStatus::AutoApproved
    } else if score >= policy.review_at {
        RecordStatus::NeedsReview
    } else {
        RecordStatus::Flagged
    }
}
