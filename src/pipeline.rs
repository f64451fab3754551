//! Admission pipeline.
//!
//! Orchestrates the rate-limit gate, anomaly detector, trust engine and corpus
//! append for a single submission.
//!
//! ## Sequence
//!
//! 1. Validate the candidate (no side effects on failure)
//! 2. Lock the submitter's window and check the rate limit
//! 3. Score against a corpus snapshot, then finalize trust
//! 4. Append the record
//! 5. Record the submission timestamp (only after the append succeeded)
//! 6. Compute comparison analytics (read-only)
//!
//! The window lock is held from step 2 through step 5, so concurrent
//! submissions from one fingerprint are linearized and a failed append leaves
//! no timestamp behind.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analytics::{self, Comparison};
use crate::anomaly::AnomalyDetector;
use crate::identity::{
    Fingerprint, RateLimitError, RateLimitReason, RateLimitStatus, RateLimiter, TimeSource,
    DEFAULT_TRACKED_FINGERPRINTS,
};
use crate::policy::AdmissionPolicyV1;
use crate::store::{CorpusQuery, CorpusStore};
use crate::trust::TrustEngine;
use crate::types::{Candidate, Flag, Record, RecordId, RecordStatus, ValidationError};

/// Error type for admission.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    /// Candidate failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Submitter hit the hard rate limit.
    #[error(transparent)]
    RateLimited(#[from] RateLimitError),
    /// Store error.
    #[error("Store error: {0}")]
    StoreError(String),
}

impl AdmissionError {
    /// Create a store error from any error type.
    pub fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::StoreError(e.to_string())
    }
}

/// Result of a successful admission.
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionOutcome {
    /// Id of the new record.
    pub record_id: RecordId,
    /// Initial lifecycle status.
    pub status: RecordStatus,
    /// Final trust score.
    pub trust_score: u8,
    /// Visible flags stored on the record.
    pub flags: Vec<Flag>,
    /// Advisory rate-limit warning, if the submitter is close to the limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<RateLimitReason>,
    /// Industry comparison, `None` only if the industry has no eligible records.
    pub comparison: Option<Comparison>,
}

/// Admits anonymous salary submissions into a corpus.
pub struct AdmissionPipeline<S: CorpusStore> {
    store: Arc<S>,
    policy: AdmissionPolicyV1,
    policy_hash: String,
    detector: AnomalyDetector,
    trust: TrustEngine,
    limiter: RateLimiter,
}

impl<S: CorpusStore> std::fmt::Debug for AdmissionPipeline<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionPipeline")
            .field("policy_id", &self.policy.policy_id())
            .field("policy_hash", &self.policy_hash)
            .field("limiter", &self.limiter)
            .finish()
    }
}

impl<S: CorpusStore> AdmissionPipeline<S> {
    /// Create a pipeline on the system clock.
    pub fn new(store: Arc<S>, policy: AdmissionPolicyV1) -> Self {
        let limiter = RateLimiter::new(policy.rate_limit.clone());
        Self::with_limiter(store, policy, limiter)
    }

    /// Create a pipeline with an explicit clock.
    pub fn with_time_source(
        store: Arc<S>,
        policy: AdmissionPolicyV1,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        let limiter = RateLimiter::with_time_source(
            policy.rate_limit.clone(),
            clock,
            DEFAULT_TRACKED_FINGERPRINTS,
        );
        Self::with_limiter(store, policy, limiter)
    }

    /// Create a pipeline around a preconfigured rate limiter.
    pub fn with_limiter(store: Arc<S>, policy: AdmissionPolicyV1, limiter: RateLimiter) -> Self {
        Self {
            store,
            policy_hash: policy.params_hash(),
            detector: AnomalyDetector::new(policy.clone()),
            trust: TrustEngine::new(policy.clone()),
            policy,
            limiter,
        }
    }

    /// The scoring policy.
    pub fn policy(&self) -> &AdmissionPolicyV1 {
        &self.policy
    }

    /// Stable hash of the scoring policy parameters.
    pub fn policy_hash(&self) -> &str {
        &self.policy_hash
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The rate limiter.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Admit a candidate submitted by `fingerprint`.
    pub fn submit(
        &self,
        candidate: &Candidate,
        fingerprint: &Fingerprint,
    ) -> Result<AdmissionOutcome, AdmissionError> {
        let submission = candidate.validate()?;

        let window = self.limiter.window(fingerprint);
        let mut window = window.lock();
        let now = self.limiter.now();

        let decision = window.check(now, self.limiter.policy());
        if decision.blocked {
            let retry_after_secs = decision
                .retry_after_secs()
                .unwrap_or(self.limiter.policy().window_secs);
            warn!(
                fingerprint = %fingerprint,
                recent = decision.recent,
                retry_after_secs,
                "Submission blocked by rate limit"
            );
            return Err(RateLimitError {
                fingerprint: fingerprint.clone(),
                recent: decision.recent,
                retry_after_secs,
            }
            .into());
        }

        let mut corpus = self.store.snapshot().map_err(AdmissionError::from_store)?;
        let report = self.detector.assess(&submission, &corpus);
        let assessment = self.trust.finalize(&report, &submission.friction);

        debug!(
            anomaly_score = assessment.anomaly_score,
            friction_bonus = assessment.friction_bonus,
            trust_score = assessment.trust_score,
            findings = report.findings.len(),
            corpus_size = corpus.len(),
            "Scored submission"
        );

        let record = Record {
            id: RecordId::generate(),
            title: submission.title,
            company: submission.company,
            industry: submission.industry,
            city: submission.city,
            experience: submission.experience,
            salary: submission.salary,
            submitted_at: now,
            verified: false,
            trust_score: assessment.trust_score,
            status: assessment.status,
            flags: assessment.flags.clone(),
            community_flag_count: 0,
            device_fingerprint: fingerprint.as_str().to_string(),
            friction: submission.friction,
        };

        self.store
            .append(record.clone())
            .map_err(AdmissionError::from_store)?;
        window.record(now);
        drop(window);

        info!(
            record_id = %record.id,
            industry = %record.industry,
            status = %record.status,
            trust_score = record.trust_score,
            rate_warn = decision.reason.is_some(),
            "Admitted submission"
        );

        let record_id = record.id;
        let (salary, industry) = (record.salary, record.industry);
        corpus.push(record);
        let comparison = analytics::compare(salary, industry, &corpus);

        Ok(AdmissionOutcome {
            record_id,
            status: assessment.status,
            trust_score: assessment.trust_score,
            flags: assessment.flags,
            rate_limit: decision.reason,
            comparison,
        })
    }

    /// Records matching a query, in insertion order.
    pub fn query_corpus(&self, query: &CorpusQuery) -> Result<Vec<Record>, AdmissionError> {
        self.store
            .query(&|r: &Record| query.matches(r))
            .map_err(AdmissionError::from_store)
    }

    /// Fetch a record by id.
    pub fn get(&self, id: &RecordId) -> Result<Option<Record>, AdmissionError> {
        self.store.get(id).map_err(AdmissionError::from_store)
    }

    /// Quota view for a fingerprint.
    pub fn rate_limit_status(&self, fingerprint: &Fingerprint) -> RateLimitStatus {
        self.limiter.status(fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ManualTimeSource;
    use crate::store::InMemoryCorpus;
    use crate::types::{ContractType, FrictionFields, Industry, SalaryType};
    use chrono::{Duration, TimeZone, Utc};

    fn clock() -> Arc<ManualTimeSource> {
        Arc::new(ManualTimeSource::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ))
    }

    fn pipeline(clock: Arc<ManualTimeSource>) -> AdmissionPipeline<InMemoryCorpus> {
        AdmissionPipeline::with_time_source(
            Arc::new(InMemoryCorpus::new()),
            AdmissionPolicyV1::default(),
            clock,
        )
    }

    fn candidate(salary: i64) -> Candidate {
        Candidate {
            title: "Data Analyst".to_string(),
            company: "Fawry".to_string(),
            industry: Industry::Finance,
            city: "Cairo".to_string(),
            experience: Some("1-3".to_string()),
            salary,
            friction: FrictionFields::default(),
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("disk full")]
    struct DiskFull;

    /// Store whose appends always fail.
    struct FailingStore;

    impl CorpusStore for FailingStore {
        type Error = DiskFull;

        fn append(&self, _record: Record) -> Result<(), DiskFull> {
            Err(DiskFull)
        }
        fn get(&self, _id: &RecordId) -> Result<Option<Record>, DiskFull> {
            Ok(None)
        }
        fn snapshot(&self) -> Result<Vec<Record>, DiskFull> {
            Ok(vec![])
        }
        fn query(&self, _p: &dyn Fn(&Record) -> bool) -> Result<Vec<Record>, DiskFull> {
            Ok(vec![])
        }
        fn update<T>(
            &self,
            _id: &RecordId,
            _f: impl FnOnce(&mut Record) -> T,
        ) -> Result<Option<T>, DiskFull> {
            Ok(None)
        }
        fn len(&self) -> Result<usize, DiskFull> {
            Ok(0)
        }
    }

    #[test]
    fn test_admits_record_with_computed_fields() {
        let pipeline = pipeline(clock());
        let fp = Fingerprint::new("device-a");

        let mut c = candidate(15_000);
        c.friction = FrictionFields {
            salary_type: Some(SalaryType::Net),
            contract_type: Some(ContractType::FullTime),
            ..FrictionFields::default()
        };
        let outcome = pipeline.submit(&c, &fp).unwrap();

        assert_eq!(outcome.trust_score, 100);
        assert_eq!(outcome.status, RecordStatus::AutoApproved);
        assert!(outcome.flags.is_empty());
        assert_eq!(outcome.rate_limit, None);

        let stored = pipeline.get(&outcome.record_id).unwrap().unwrap();
        assert_eq!(stored.device_fingerprint, "device-a");
        assert_eq!(stored.community_flag_count, 0);
        assert!(!stored.verified);
        assert_eq!(stored.friction.completed(), 2);
        assert_eq!(pipeline.rate_limit_status(&fp).recent, 1);
    }

    #[test]
    fn test_validation_failure_has_no_side_effects() {
        let pipeline = pipeline(clock());
        let fp = Fingerprint::new("device-a");

        let err = pipeline.submit(&candidate(0), &fp).unwrap_err();
        assert!(matches!(err, AdmissionError::Validation(_)));
        assert_eq!(pipeline.store().len().unwrap(), 0);
        assert_eq!(pipeline.rate_limit_status(&fp).recent, 0);
    }

    #[test]
    fn test_warns_then_blocks() {
        let clock = clock();
        let pipeline = pipeline(clock.clone());
        let fp = Fingerprint::new("device-a");

        for i in 0..3 {
            let outcome = pipeline.submit(&candidate(10_000 + i), &fp).unwrap();
            assert_eq!(outcome.rate_limit, None);
            clock.advance(Duration::minutes(1));
        }
        for i in 3..5 {
            let outcome = pipeline.submit(&candidate(10_000 + i), &fp).unwrap();
            assert_eq!(outcome.rate_limit, Some(RateLimitReason::RateWarn));
            clock.advance(Duration::minutes(1));
        }

        let err = pipeline.submit(&candidate(10_005), &fp).unwrap_err();
        match err {
            AdmissionError::RateLimited(e) => {
                assert_eq!(e.recent, 5);
                // First submission was 5 minutes ago.
                assert_eq!(e.retry_after_secs, 55 * 60);
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
        assert_eq!(pipeline.store().len().unwrap(), 5);

        // Other devices are unaffected.
        assert!(pipeline
            .submit(&candidate(10_006), &Fingerprint::new("device-b"))
            .is_ok());
    }

    #[test]
    fn test_failed_append_records_no_timestamp() {
        let clock = clock();
        let pipeline = AdmissionPipeline::with_time_source(
            Arc::new(FailingStore),
            AdmissionPolicyV1::default(),
            clock,
        );
        let fp = Fingerprint::new("device-a");

        let err = pipeline.submit(&candidate(12_000), &fp).unwrap_err();
        assert!(matches!(err, AdmissionError::StoreError(ref msg) if msg == "disk full"));
        assert_eq!(pipeline.rate_limit_status(&fp).recent, 0);
    }

    #[test]
    fn test_comparison_includes_new_record() {
        let pipeline = pipeline(clock());
        pipeline
            .submit(&candidate(10_000), &Fingerprint::new("a"))
            .unwrap();
        let outcome = pipeline
            .submit(&candidate(20_000), &Fingerprint::new("b"))
            .unwrap();

        let cmp = outcome.comparison.unwrap();
        assert_eq!(cmp.industry, Industry::Finance);
        assert_eq!(cmp.sample_size, 2);
        assert_eq!(cmp.industry_mean, 15_000.0);
        assert_eq!(cmp.percentile_rank, 50);
        assert_eq!(cmp.delta_pct, 33.3);
    }

    #[test]
    fn test_concurrent_submissions_from_one_device_are_linearized() {
        let pipeline = pipeline(clock());
        let fp = Fingerprint::new("device-a");

        let admitted: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..12)
                .map(|i| {
                    let pipeline = &pipeline;
                    let fp = &fp;
                    s.spawn(move || pipeline.submit(&candidate(9_000 + i), fp).is_ok())
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });

        assert_eq!(admitted, 5);
        assert_eq!(pipeline.store().len().unwrap(), 5);
    }

    #[test]
    fn test_query_corpus() {
        let pipeline = pipeline(clock());
        pipeline
            .submit(&candidate(10_000), &Fingerprint::new("a"))
            .unwrap();

        let public = pipeline.query_corpus(&CorpusQuery::public()).unwrap();
        assert_eq!(public.len(), 1);
        let energy = pipeline
            .query_corpus(&CorpusQuery::all().industry(Industry::Energy))
            .unwrap();
        assert!(energy.is_empty());
    }

    #[test]
    fn test_policy_hash_exposed() {
        let pipeline = pipeline(clock());
        assert_eq!(
            pipeline.policy_hash(),
            AdmissionPolicyV1::default().params_hash()
        );
    }
}
