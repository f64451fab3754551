//! Moderation queue: community reports, moderator decisions and the audit log.
//!
//! Every successful action appends an [`AuditEntry`]. The log keeps only the
//! most recent [`AUDIT_LOG_CAPACITY`] entries. Refused actions change nothing
//! and are not audited.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::identity::{SystemTimeSource, TimeSource};
use crate::store::CorpusStore;
use crate::types::{ModerationAction, Record, RecordId, RecordStatus, TransitionError};

/// Number of audit entries retained.
pub const AUDIT_LOG_CAPACITY: usize = 20;

/// Error type for moderation.
#[derive(Debug, thiserror::Error)]
pub enum ModerationError {
    /// No record with this id.
    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),
    /// The record's state does not permit the action.
    #[error(transparent)]
    InvalidStateTransition(#[from] TransitionError),
    /// Community flags go through `flag_community`, not `moderate`.
    #[error("Not a moderator action: {0}")]
    NotModeratorAction(ModerationAction),
    /// Store error.
    #[error("Store error: {0}")]
    StoreError(String),
}

impl ModerationError {
    /// Create a store error from any error type.
    pub fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::StoreError(e.to_string())
    }
}

/// One applied action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Target record.
    pub record_id: RecordId,
    /// Applied action.
    pub action: ModerationAction,
    /// When it was applied.
    pub timestamp: DateTime<Utc>,
}

/// Community and moderator actions on admitted records.
pub struct ModerationQueue<S: CorpusStore> {
    store: Arc<S>,
    audit: Mutex<VecDeque<AuditEntry>>,
    clock: Arc<dyn TimeSource>,
}

impl<S: CorpusStore> std::fmt::Debug for ModerationQueue<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModerationQueue")
            .field("audit_entries", &self.audit.lock().len())
            .finish()
    }
}

impl<S: CorpusStore> ModerationQueue<S> {
    /// Create a queue on the system clock.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_time_source(store, Arc::new(SystemTimeSource))
    }

    /// Create a queue with an explicit clock.
    pub fn with_time_source(store: Arc<S>, clock: Arc<dyn TimeSource>) -> Self {
        Self {
            store,
            audit: Mutex::new(VecDeque::with_capacity(AUDIT_LOG_CAPACITY)),
            clock,
        }
    }

    /// Report a public record. Returns the updated record.
    pub fn flag_community(&self, id: &RecordId) -> Result<Record, ModerationError> {
        self.apply(id, ModerationAction::CommunityFlag)
    }

    /// Apply a moderator decision (`approve`, `reject` or `dismiss_flags`).
    pub fn moderate(
        &self,
        id: &RecordId,
        action: ModerationAction,
    ) -> Result<Record, ModerationError> {
        if action == ModerationAction::CommunityFlag {
            return Err(ModerationError::NotModeratorAction(action));
        }
        self.apply(id, action)
    }

    /// Records awaiting a moderator.
    ///
    /// Held records plus public records with community reports, most reported
    /// first, then lowest trust, then oldest.
    pub fn pending(&self) -> Result<Vec<Record>, ModerationError> {
        let mut records = self
            .store
            .query(&|r: &Record| {
                r.status.is_pending_review()
                    || (r.status == RecordStatus::AutoApproved && r.community_flag_count > 0)
            })
            .map_err(ModerationError::from_store)?;

        records.sort_by(|a, b| {
            b.community_flag_count
                .cmp(&a.community_flag_count)
                .then(a.trust_score.cmp(&b.trust_score))
                .then(a.submitted_at.cmp(&b.submitted_at))
        });
        Ok(records)
    }

    /// Audit entries, oldest first.
    pub fn audit_log(&self) -> Vec<AuditEntry> {
        self.audit.lock().iter().cloned().collect()
    }

    fn apply(&self, id: &RecordId, action: ModerationAction) -> Result<Record, ModerationError> {
        // Held across the update so log order matches application order.
        let mut audit = self.audit.lock();

        let applied = self
            .store
            .update(id, |record| record.apply(action).map(|()| record.clone()))
            .map_err(ModerationError::from_store)?
            .ok_or(ModerationError::RecordNotFound(*id))?;

        let record = match applied {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    record_id = %id,
                    action = %action,
                    status = %e.status,
                    community_flags = e.community_flags,
                    "Refused moderation action"
                );
                return Err(e.into());
            }
        };

        if audit.len() == AUDIT_LOG_CAPACITY {
            audit.pop_front();
        }
        audit.push_back(AuditEntry {
            record_id: *id,
            action,
            timestamp: self.clock.now(),
        });

        info!(
            record_id = %id,
            action = %action,
            status = %record.status,
            community_flags = record.community_flag_count,
            "Applied moderation action"
        );
        Ok(record)
    }
}
