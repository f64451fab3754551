//! Service state management.
//!
//! Holds the admission pipeline, moderation queue and fingerprint deriver
//! shared by all handlers.

use std::sync::Arc;
use serde::{Deserialize, Serialize};

use crate::identity::{RateLimiter, SubmitterIdentity, SystemTimeSource, TimeSource, DEFAULT_TRACKED_FINGERPRINTS};
use crate::moderation::ModerationQueue;
use crate::pipeline::AdmissionPipeline;
use crate::policy::AdmissionPolicyV1;
use crate::store::CorpusStore;

/// Reference to the active scoring policy by hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyRef {
    /// Policy type identifier (e.g., "admission_policy_v1")
    pub policy_id: String,
    /// xxHash64 of the quantized policy parameters
    pub params_hash: String,
}

impl PolicyRef {
    /// Create a policy reference from an AdmissionPolicyV1.
    pub fn from_policy(policy: &AdmissionPolicyV1) -> Self {
        Self {
            policy_id: policy.policy_id().to_string(),
            params_hash: policy.params_hash(),
        }
    }
}

/// Service configuration read from the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// HMAC key for fingerprint derivation.
    pub fingerprint_salt: Vec<u8>,
    /// Maximum number of fingerprints with tracked submission windows.
    pub rate_limit_capacity: usize,
}

impl ServiceConfig {
    /// Read `FINGERPRINT_SALT` and `RATE_LIMIT_CAPACITY`.
    ///
    /// Falls back to a development salt if `FINGERPRINT_SALT` is not set.
    pub fn from_env() -> Self {
        let fingerprint_salt = match std::env::var("FINGERPRINT_SALT") {
            Ok(s) if !s.is_empty() => s.into_bytes(),
            _ => {
                tracing::warn!(
                    "FINGERPRINT_SALT not set, using development salt. \
                     Set this for production!"
                );
                b"development_only_salt_not_for_production".to_vec()
            }
        };

        let rate_limit_capacity = std::env::var("RATE_LIMIT_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TRACKED_FINGERPRINTS);

        Self {
            fingerprint_salt,
            rate_limit_capacity,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            fingerprint_salt: b"development_only_salt_not_for_production".to_vec(),
            rate_limit_capacity: DEFAULT_TRACKED_FINGERPRINTS,
        }
    }
}

/// Shared service state.
pub struct ServiceState<S: CorpusStore + 'static> {
    /// Admission pipeline.
    pub pipeline: Arc<AdmissionPipeline<S>>,
    /// Moderation queue over the same store.
    pub moderation: Arc<ModerationQueue<S>>,
    /// Fingerprint deriver.
    pub identity: SubmitterIdentity,
    /// Active policy reference.
    pub policy_ref: PolicyRef,
}

impl<S: CorpusStore + 'static> ServiceState<S> {
    /// Create service state on the system clock.
    pub fn new(store: S, policy: AdmissionPolicyV1, config: ServiceConfig) -> Self {
        Self::with_time_source(store, policy, config, Arc::new(SystemTimeSource))
    }

    /// Create service state with an explicit clock.
    pub fn with_time_source(
        store: S,
        policy: AdmissionPolicyV1,
        config: ServiceConfig,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        let store = Arc::new(store);
        let limiter = RateLimiter::with_time_source(
            policy.rate_limit.clone(),
            Arc::clone(&clock),
            config.rate_limit_capacity,
        );
        let policy_ref = PolicyRef::from_policy(&policy);

        Self {
            pipeline: Arc::new(AdmissionPipeline::with_limiter(Arc::clone(&store), policy, limiter)),
            moderation: Arc::new(ModerationQueue::with_time_source(store, clock)),
            identity: SubmitterIdentity::new(config.fingerprint_salt),
            policy_ref,
        }
    }

    /// Create service state with the default policy and environment config.
    pub fn from_env(store: S) -> Self {
        Self::new(store, AdmissionPolicyV1::default(), ServiceConfig::from_env())
    }
}

impl<S: CorpusStore + 'static> Clone for ServiceState<S> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            moderation: Arc::clone(&self.moderation),
            identity: self.identity.clone(),
            policy_ref: self.policy_ref.clone(),
        }
    }
}
