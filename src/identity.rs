//! Submitter identity: device fingerprints and per-fingerprint rate limiting.
//!
//! There are no accounts. A submitter is recognised only by a keyed hash of a
//! fixed set of device attributes, and that hash is used for nothing except
//! the sliding-window rate limit below.
//!
//! ## Rate Limit
//!
//! | Submissions in trailing window | Outcome |
//! |--------------------------------|---------|
//! | `< warn_at` (3)                | allowed |
//! | `warn_at..block_at` (3–4)      | allowed, advisory `rate_warn` |
//! | `>= block_at` (5)              | blocked, `rate_hard` |
//!
//! Windows are pruned on every read. Each fingerprint has its own lock so
//! concurrent submissions from one device are linearized without serializing
//! unrelated devices.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use lru::LruCache;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::policy::RateLimitPolicy;

type HmacSha256 = Hmac<Sha256>;

/// Default number of fingerprints whose windows are tracked.
pub const DEFAULT_TRACKED_FINGERPRINTS: usize = 100_000;

// ─────────────────────────────────────────────────────────────────────────────
// Time
// ─────────────────────────────────────────────────────────────────────────────

/// Source of the current time.
///
/// Injected so window expiry can be tested without sleeping.
pub trait TimeSource: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced time source for tests and replays.
#[derive(Debug)]
pub struct ManualTimeSource {
    now: Mutex<DateTime<Utc>>,
}

impl ManualTimeSource {
    /// Start at the given instant.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }

    /// Jump to an instant.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fingerprints
// ─────────────────────────────────────────────────────────────────────────────

/// Device attributes a fingerprint is derived from.
///
/// The set is fixed; adding a field changes every fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceAttributes {
    /// Browser user agent.
    #[serde(default)]
    pub user_agent: String,
    /// Preferred language.
    #[serde(default)]
    pub language: String,
    /// OS / platform string.
    #[serde(default)]
    pub platform: String,
    /// Screen resolution, e.g. `1920x1080`.
    #[serde(default)]
    pub screen_resolution: String,
    /// Colour depth in bits.
    #[serde(default)]
    pub color_depth: u8,
    /// IANA timezone name.
    #[serde(default)]
    pub timezone: String,
    /// Logical CPU count.
    #[serde(default)]
    pub hardware_concurrency: u16,
}

impl DeviceAttributes {
    /// Deterministic `|`-joined encoding fed to the HMAC.
    fn canonical_string(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}",
            self.user_agent,
            self.language,
            self.platform,
            self.screen_resolution,
            self.color_depth,
            self.timezone,
            self.hardware_concurrency,
        )
    }
}

/// Opaque, non-personal submitter identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an already-derived fingerprint (e.g. supplied by a trusted edge).
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the fingerprint as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives fingerprints from device attributes.
///
/// Keyed with a deployment salt so fingerprints cannot be recomputed from
/// attributes alone.
#[derive(Clone)]
pub struct SubmitterIdentity {
    salt: Arc<Vec<u8>>,
}

impl std::fmt::Debug for SubmitterIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmitterIdentity").finish_non_exhaustive()
    }
}

impl SubmitterIdentity {
    /// Create an identity deriver with a salt (32+ bytes recommended).
    pub fn new(salt: Vec<u8>) -> Self {
        Self { salt: Arc::new(salt) }
    }

    /// Derive the fingerprint for a set of device attributes.
    pub fn identify(&self, attributes: &DeviceAttributes) -> Fingerprint {
        let mut mac = HmacSha256::new_from_slice(&self.salt)
            .expect("HMAC accepts any key size");
        mac.update(attributes.canonical_string().as_bytes());
        let digest = mac.finalize().into_bytes();
        Fingerprint(hex::encode(&digest[..16]))
    }
}

/// A submitter session: attributes plus the fingerprint derived from them.
///
/// The fingerprint is computed on first use and reused for every submission
/// in the session.
#[derive(Debug)]
pub struct SubmitterSession {
    attributes: DeviceAttributes,
    fingerprint: OnceLock<Fingerprint>,
}

impl SubmitterSession {
    /// Start a session for a device.
    pub fn new(attributes: DeviceAttributes) -> Self {
        Self {
            attributes,
            fingerprint: OnceLock::new(),
        }
    }

    /// Start a session whose fingerprint is already known.
    pub fn with_fingerprint(fingerprint: Fingerprint) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(fingerprint);
        Self {
            attributes: DeviceAttributes::default(),
            fingerprint: cell,
        }
    }

    /// The session fingerprint, derived once.
    pub fn fingerprint(&self, identity: &SubmitterIdentity) -> &Fingerprint {
        self.fingerprint.get_or_init(|| identity.identify(&self.attributes))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rate limiting
// ─────────────────────────────────────────────────────────────────────────────

/// Why a rate-limit decision is not a plain "allowed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitReason {
    /// Approaching the limit; advisory only.
    RateWarn,
    /// Limit reached; submission refused.
    RateHard,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    /// Whether the submission must be refused.
    pub blocked: bool,
    /// Warning or block reason, `None` when plainly allowed.
    pub reason: Option<RateLimitReason>,
    /// Submissions in the trailing window.
    pub recent: usize,
    /// Time until the submitter drops below the block threshold.
    #[serde(skip)]
    pub retry_after: Option<Duration>,
}

impl RateLimitDecision {
    /// Seconds until a blocked submitter may retry.
    pub fn retry_after_secs(&self) -> Option<u64> {
        self.retry_after.map(|d| d.num_seconds().max(0) as u64)
    }
}

/// A submitter hit the hard limit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Rate limit exceeded for {fingerprint}: {recent} submissions in the last hour, retry in {retry_after_secs}s")]
pub struct RateLimitError {
    /// Blocked fingerprint.
    pub fingerprint: Fingerprint,
    /// Submissions in the trailing window.
    pub recent: usize,
    /// Seconds until a retry can succeed.
    pub retry_after_secs: u64,
}

/// Submission timestamps of one fingerprint, oldest first.
#[derive(Debug, Default)]
pub struct SubmissionWindow {
    timestamps: VecDeque<DateTime<Utc>>,
}

impl SubmissionWindow {
    /// Drop entries that are `window` old or older.
    fn prune(&mut self, now: DateTime<Utc>, window: Duration) {
        while let Some(front) = self.timestamps.front() {
            if now - *front >= window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Prune, then decide whether one more submission is allowed.
    pub fn check(&mut self, now: DateTime<Utc>, policy: &RateLimitPolicy) -> RateLimitDecision {
        let window = Duration::seconds(policy.window_secs as i64);
        self.prune(now, window);
        let recent = self.timestamps.len();

        if recent >= policy.block_at {
            // Expiry of this entry brings the count below `block_at`. With
            // `block_at == 0` there is no such entry and the block never lifts.
            let retry_after = self
                .timestamps
                .get(recent - policy.block_at)
                .map(|pivot| *pivot + window - now);
            RateLimitDecision {
                blocked: true,
                reason: Some(RateLimitReason::RateHard),
                recent,
                retry_after,
            }
        } else if recent >= policy.warn_at {
            RateLimitDecision {
                blocked: false,
                reason: Some(RateLimitReason::RateWarn),
                recent,
                retry_after: None,
            }
        } else {
            RateLimitDecision {
                blocked: false,
                reason: None,
                recent,
                retry_after: None,
            }
        }
    }

    /// Record a committed submission.
    pub fn record(&mut self, now: DateTime<Utc>) {
        self.timestamps.push_back(now);
    }

    /// Entries currently held (including not-yet-pruned ones).
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether the window holds no entries.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Read-only view of a fingerprint's quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    /// Submissions in the trailing window.
    pub recent: usize,
    /// Submissions left before the hard block.
    pub remaining: usize,
    /// Seconds until a blocked submitter may retry.
    pub retry_after_secs: Option<u64>,
}

/// Per-fingerprint sliding-window rate limiter.
///
/// Owned by the admission pipeline; there is no process-global state.
pub struct RateLimiter {
    policy: RateLimitPolicy,
    windows: Mutex<LruCache<Fingerprint, Arc<Mutex<SubmissionWindow>>>>,
    clock: Arc<dyn TimeSource>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("policy", &self.policy)
            .field("tracked", &self.windows.lock().len())
            .finish()
    }
}

impl RateLimiter {
    /// Create a limiter on the system clock.
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self::with_time_source(policy, Arc::new(SystemTimeSource), DEFAULT_TRACKED_FINGERPRINTS)
    }

    /// Create a limiter with an explicit clock and fingerprint capacity.
    ///
    /// When more than `capacity` fingerprints are active, the least recently
    /// seen window is forgotten.
    pub fn with_time_source(
        policy: RateLimitPolicy,
        clock: Arc<dyn TimeSource>,
        capacity: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            policy,
            windows: Mutex::new(LruCache::new(capacity)),
            clock,
        }
    }

    /// The limiter's policy.
    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Current time according to the limiter's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Shared handle to a fingerprint's window, created on first use.
    ///
    /// Callers lock the returned window for the whole check → commit → record
    /// sequence. A window with outstanding handles is never evicted, so two
    /// in-flight submissions from one fingerprint always share a window. When
    /// every tracked window is in use the cache grows past its capacity.
    pub fn window(&self, fingerprint: &Fingerprint) -> Arc<Mutex<SubmissionWindow>> {
        let mut windows = self.windows.lock();
        if let Some(window) = windows.get(fingerprint) {
            return Arc::clone(window);
        }

        if windows.len() >= windows.cap().get() {
            // Handles are only cloned under this lock, so a count of one
            // means no caller holds the window.
            let idle = windows
                .iter()
                .rev()
                .find(|(_, window)| Arc::strong_count(window) == 1)
                .map(|(key, _)| key.clone());
            match idle {
                Some(key) => {
                    windows.pop(&key);
                }
                None => {
                    let grown = windows.cap().saturating_add(1);
                    windows.resize(grown);
                }
            }
        }

        let window = Arc::new(Mutex::new(SubmissionWindow::default()));
        windows.put(fingerprint.clone(), Arc::clone(&window));
        window
    }

    /// Check whether `fingerprint` may submit now.
    pub fn check_rate_limit(&self, fingerprint: &Fingerprint) -> RateLimitDecision {
        let window = self.window(fingerprint);
        let mut window = window.lock();
        window.check(self.clock.now(), &self.policy)
    }

    /// Record a committed submission for `fingerprint`.
    pub fn record_submission(&self, fingerprint: &Fingerprint) {
        let window = self.window(fingerprint);
        window.lock().record(self.clock.now());
    }

    /// Quota view without recording anything.
    pub fn status(&self, fingerprint: &Fingerprint) -> RateLimitStatus {
        let decision = self.check_rate_limit(fingerprint);
        RateLimitStatus {
            recent: decision.recent,
            remaining: self.policy.block_at.saturating_sub(decision.recent),
            retry_after_secs: decision.retry_after_secs(),
        }
    }

    /// Number of fingerprints currently tracked.
    pub fn tracked(&self) -> usize {
        self.windows.lock().len()
    }
}
