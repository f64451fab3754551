//! Record lifecycle: statuses, moderation actions and legal transitions.
//!
//! ```text
//!                 admission (trust score)
//!        ┌──────────────┼───────────────┐
//!        ▼              ▼               ▼
//!   AutoApproved   NeedsReview       Flagged
//!     │  ▲  │          │  │           │  │
//!     │  │  └─approve──┘  │  ┌approve─┘  │
//!     │  └────────────────┼──┘           │
//!     │ reject (≥1 community flag)       │
//!     ▼                   ▼ reject       ▼ reject
//!   ─────────────────── Rejected (terminal) ───
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use super::record::{Record, RecordId};

/// Trust score a record is raised to when a moderator approves it.
pub const APPROVED_TRUST_FLOOR: u8 = 80;

/// Lifecycle status of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Publicly visible.
    AutoApproved,
    /// Held for a moderator.
    NeedsReview,
    /// Held for a moderator with strong anomaly signals.
    Flagged,
    /// Removed by a moderator. Terminal.
    Rejected,
}

impl RecordStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected)
    }

    /// Whether the record awaits a moderator decision.
    pub fn is_pending_review(&self) -> bool {
        matches!(self, Self::NeedsReview | Self::Flagged)
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoApproved => "auto_approved",
            Self::NeedsReview => "needs_review",
            Self::Flagged => "flagged",
            Self::Rejected => "rejected",
        }
    }

    /// Parse status from its wire name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto_approved" => Some(Self::AutoApproved),
            "needs_review" => Some(Self::NeedsReview),
            "flagged" => Some(Self::Flagged),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action taken on an admitted record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    /// Anonymous community report.
    CommunityFlag,
    /// Moderator accepts a held record.
    Approve,
    /// Moderator removes a record.
    Reject,
    /// Moderator clears community reports on a public record.
    DismissFlags,
}

impl ModerationAction {
    /// Wire name of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommunityFlag => "community_flag",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::DismissFlags => "dismiss_flags",
        }
    }
}

impl fmt::Display for ModerationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A moderation action the record's current state does not permit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot {action} record {record_id} in status {status} (community flags: {community_flags})")]
pub struct TransitionError {
    /// Target record.
    pub record_id: RecordId,
    /// Attempted action.
    pub action: ModerationAction,
    /// Status at the time of the attempt.
    pub status: RecordStatus,
    /// Community flag count at the time of the attempt.
    pub community_flags: u32,
}

impl Record {
    /// Check whether `action` is legal in the record's current state.
    pub fn permits(&self, action: ModerationAction) -> bool {
        match action {
            ModerationAction::CommunityFlag => self.status == RecordStatus::AutoApproved,
            ModerationAction::Approve => self.status.is_pending_review(),
            ModerationAction::Reject => {
                self.status.is_pending_review()
                    || (self.status == RecordStatus::AutoApproved && self.community_flag_count >= 1)
            }
            ModerationAction::DismissFlags => {
                self.status == RecordStatus::AutoApproved && self.community_flag_count >= 1
            }
        }
    }

    /// Apply a moderation action in place.
    ///
    /// The record is left untouched when the action is not permitted.
    pub fn apply(&mut self, action: ModerationAction) -> Result<(), TransitionError> {
        if !self.permits(action) {
            return Err(TransitionError {
                record_id: self.id,
                action,
                status: self.status,
                community_flags: self.community_flag_count,
            });
        }

        match action {
            ModerationAction::CommunityFlag => {
                self.community_flag_count = self.community_flag_count.saturating_add(1);
            }
            ModerationAction::Approve => {
                self.status = RecordStatus::AutoApproved;
                self.verified = true;
                self.trust_score = self.trust_score.max(APPROVED_TRUST_FLOOR);
            }
            ModerationAction::Reject => {
                self.status = RecordStatus::Rejected;
            }
            ModerationAction::DismissFlags => {
                self.community_flag_count = 0;
            }
        }

        Ok(())
    }
}
