//! Statistical anomaly detection for candidate submissions.
//!
//! The detector is a pure function of `(submission, corpus snapshot, policy)`.
//! It never fails and never touches shared state, so any number of admissions
//! can score concurrently against their own snapshots.
//!
//! ## Signals
//!
//! | Signal | Precondition | Flag | Penalty |
//! |--------|--------------|------|---------|
//! | Industry z-score | ≥3 baseline records in industry | `extreme_outlier` (z>3) / `outlier` (2.5<z≤3) | 40 / 20 |
//! | Experience envelope | band has an envelope | `low_for_exp` / `high_for_exp` | 15 / 30 |
//! | Company consistency | ≥2 baseline records at company | `company_mismatch` | 25 |
//! | Round number | salary > 50k, multiple of 10k | `round_number` (silent) | 5 |
//! | Exact duplicate | same title, company, salary anywhere in corpus | `duplicate` | 50 |
//!
//! Statistics are accumulated with exact integer sums, so the result does not
//! depend on corpus order. Sums too large for `u128` fall back to a sorted
//! floating-point pass.

use serde::Serialize;

use crate::policy::{clamp_score, status_for_score, AdmissionPolicyV1};
use crate::types::{
    normalize_key, Flag, FlagSeverity, FlagType, Industry, Record, RecordStatus, Submission,
};

/// One signal that fired, with the deduction it carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// The flag, visible or silent.
    pub flag: Flag,
    /// Points deducted from the starting score.
    pub penalty: u8,
}

/// Result of scoring a submission against a corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnomalyReport {
    /// Every signal that fired, in signal order.
    pub findings: Vec<Finding>,
    /// Sum of all penalties.
    pub penalty_total: u32,
    /// `100 - penalty_total`, clamped to [0, 100].
    pub score: u8,
    /// Status implied by `score` alone.
    pub provisional_status: RecordStatus,
}

impl AnomalyReport {
    /// Flags to store on the record (silent findings excluded).
    pub fn visible_flags(&self) -> Vec<Flag> {
        self.findings
            .iter()
            .filter(|f| f.flag.visible)
            .map(|f| f.flag.clone())
            .collect()
    }

    /// Whether a given flag type fired (visible or not).
    pub fn has(&self, flag_type: FlagType) -> bool {
        self.findings.iter().any(|f| f.flag.flag_type == flag_type)
    }
}

/// Mean and population standard deviation of a salary sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalaryStats {
    /// Sample size.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Population standard deviation (divides by n).
    pub stddev: f64,
}

impl SalaryStats {
    /// Compute stats from salaries; `None` for an empty sample.
    ///
    /// Exact integer sums are used while they fit in `u128`. Samples large
    /// enough to overflow them fall back to Welford's running update in `f64`
    /// over the sorted sample, so the result still ignores input order.
    pub fn from_salaries(salaries: impl IntoIterator<Item = u64>) -> Option<Self> {
        let mut salaries: Vec<u64> = salaries.into_iter().collect();
        if salaries.is_empty() {
            return None;
        }
        Some(Self::exact(&salaries).unwrap_or_else(|| {
            salaries.sort_unstable();
            Self::welford(&salaries)
        }))
    }

    fn exact(salaries: &[u64]) -> Option<Self> {
        let count = salaries.len() as u128;
        let mut sum: u128 = 0;
        let mut sum_sq: u128 = 0;
        for &salary in salaries {
            let s = u128::from(salary);
            sum = sum.checked_add(s)?;
            sum_sq = sum_sq.checked_add(s.checked_mul(s)?)?;
        }

        // n²·variance = n·Σx² − (Σx)², exact in integers.
        let scaled_variance = count
            .checked_mul(sum_sq)?
            .saturating_sub(sum.checked_mul(sum)?);
        let n = count as f64;
        Some(Self {
            count: salaries.len(),
            mean: sum as f64 / n,
            stddev: (scaled_variance as f64).sqrt() / n,
        })
    }

    fn welford(salaries: &[u64]) -> Self {
        let mut mean = 0.0_f64;
        let mut m2 = 0.0_f64;
        for (i, &salary) in salaries.iter().enumerate() {
            let x = salary as f64;
            let delta = x - mean;
            mean += delta / (i + 1) as f64;
            m2 += delta * (x - mean);
        }
        Self {
            count: salaries.len(),
            mean,
            stddev: (m2.max(0.0) / salaries.len() as f64).sqrt(),
        }
    }
}

/// Scores submissions against a corpus under a fixed policy.
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    policy: AdmissionPolicyV1,
}

impl AnomalyDetector {
    /// Create a detector for a policy.
    pub fn new(policy: AdmissionPolicyV1) -> Self {
        Self { policy }
    }

    /// The detector's policy.
    pub fn policy(&self) -> &AdmissionPolicyV1 {
        &self.policy
    }

    /// Run every signal and total the penalties.
    pub fn assess(&self, submission: &Submission, corpus: &[Record]) -> AnomalyReport {
        let baseline: Vec<&Record> = corpus
            .iter()
            .filter(|r| self.policy.baseline.includes(r))
            .collect();

        let findings: Vec<Finding> = [
            self.industry_signal(submission, &baseline),
            self.experience_signal(submission),
            self.company_signal(submission, &baseline),
            self.round_number_signal(submission),
            self.duplicate_signal(submission, corpus),
        ]
        .into_iter()
        .flatten()
        .collect();

        let penalty_total: u32 = findings.iter().map(|f| u32::from(f.penalty)).sum();
        let score = clamp_score(100 - i64::from(penalty_total));

        AnomalyReport {
            findings,
            penalty_total,
            score,
            provisional_status: status_for_score(score, &self.policy),
        }
    }

    fn finding(&self, flag_type: FlagType, severity: FlagSeverity, detail: String) -> Finding {
        Finding {
            penalty: self.policy.penalties.get(flag_type),
            flag: Flag::new(flag_type, severity, detail),
        }
    }

    fn industry_signal(&self, submission: &Submission, baseline: &[&Record]) -> Option<Finding> {
        let stats = industry_stats(baseline, submission.industry)?;
        if stats.count < self.policy.min_industry_group {
            return None;
        }

        let stddev = stats.stddev.max(self.policy.stddev_floor);
        let z = (submission.salary as f64 - stats.mean).abs() / stddev;
        let detail = format!(
            "Salary is {:.1} standard deviations from the {} average of {} EGP",
            z,
            submission.industry,
            format_egp(stats.mean.round() as u64),
        );

        if z > self.policy.z_extreme {
            Some(self.finding(FlagType::ExtremeOutlier, FlagSeverity::High, detail))
        } else if z > self.policy.z_outlier {
            Some(self.finding(FlagType::Outlier, FlagSeverity::Medium, detail))
        } else {
            None
        }
    }

    fn experience_signal(&self, submission: &Submission) -> Option<Finding> {
        let envelope = self.policy.envelopes.lookup(submission.experience)?;
        let band = submission.experience?;
        let salary = submission.salary as f64;

        if salary < envelope.min as f64 * self.policy.envelope_low_factor {
            Some(self.finding(
                FlagType::LowForExp,
                FlagSeverity::Medium,
                format!(
                    "Salary is far below the usual {}–{} EGP for {}",
                    format_egp(envelope.min),
                    format_egp(envelope.max),
                    band,
                ),
            ))
        } else if salary > envelope.max as f64 * self.policy.envelope_high_factor {
            Some(self.finding(
                FlagType::HighForExp,
                FlagSeverity::High,
                format!(
                    "Salary is far above the usual {}–{} EGP for {}",
                    format_egp(envelope.min),
                    format_egp(envelope.max),
                    band,
                ),
            ))
        } else {
            None
        }
    }

    fn company_signal(&self, submission: &Submission, baseline: &[&Record]) -> Option<Finding> {
        let key = normalize_key(&submission.company);
        let stats = SalaryStats::from_salaries(
            baseline
                .iter()
                .filter(|r| normalize_key(&r.company) == key)
                .map(|r| r.salary),
        )?;
        if stats.count < self.policy.min_company_group || stats.mean <= 0.0 {
            return None;
        }

        let deviation = (submission.salary as f64 - stats.mean).abs() / stats.mean;
        (deviation > self.policy.company_deviation).then(|| {
            self.finding(
                FlagType::CompanyMismatch,
                FlagSeverity::High,
                format!(
                    "Salary differs by {:.0}% from {} other reports at {} (average {} EGP)",
                    deviation * 100.0,
                    stats.count,
                    submission.company,
                    format_egp(stats.mean.round() as u64),
                ),
            )
        })
    }

    fn round_number_signal(&self, submission: &Submission) -> Option<Finding> {
        self.policy.round_number.matches(submission.salary).then(|| {
            self.finding(
                FlagType::RoundNumber,
                FlagSeverity::Medium,
                format!("Round figure {} EGP", format_egp(submission.salary)),
            )
        })
    }

    fn duplicate_signal(&self, submission: &Submission, corpus: &[Record]) -> Option<Finding> {
        let duplicate = corpus.iter().any(|r| {
            r.salary == submission.salary
                && r.same_title(&submission.title)
                && r.same_company(&submission.company)
        });
        duplicate.then(|| {
            self.finding(
                FlagType::Duplicate,
                FlagSeverity::High,
                format!(
                    "Identical report already exists: {} at {} for {} EGP",
                    submission.title,
                    submission.company,
                    format_egp(submission.salary),
                ),
            )
        })
    }
}

/// Salary stats for one industry over the given records.
pub fn industry_stats(records: &[&Record], industry: Industry) -> Option<SalaryStats> {
    SalaryStats::from_salaries(
        records
            .iter()
            .filter(|r| r.industry == industry)
            .map(|r| r.salary),
    )
}

/// Format an amount with thousands separators, e.g. `85,000`.
pub fn format_egp(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExperienceBand, FrictionFields, RecordId};
    use chrono::Utc;

    fn make_record(title: &str, company: &str, industry: Industry, salary: u64) -> Record {
        Record {
            id: RecordId::generate(),
            title: title.to_string(),
            company: company.to_string(),
            industry,
            city: "Cairo".to_string(),
            experience: None,
            salary,
            submitted_at: Utc::now(),
            verified: false,
            trust_score: 100,
            status: RecordStatus::AutoApproved,
            flags: vec![],
            community_flag_count: 0,
            device_fingerprint: "seed".to_string(),
            friction: FrictionFields::default(),
        }
    }

    fn detector() -> AnomalyDetector {
        AnomalyDetector::default()
    }

    /// 11 Technology records: mean 30,000, population stddev 9,000.
    fn technology_corpus() -> Vec<Record> {
        [
            21_000u64, 39_000, 20_000, 40_000, 18_500, 41_500, 18_500, 41_500, 30_000, 30_000,
            30_000,
        ]
        .iter()
        .enumerate()
        .map(|(i, s)| make_record("Engineer", &format!("Co{i}"), Industry::Technology, *s))
        .collect()
    }

    #[test]
    fn test_salary_stats_population_stddev() {
        let stats = SalaryStats::from_salaries(technology_corpus().iter().map(|r| r.salary)).unwrap();
        assert_eq!(stats.count, 11);
        assert!((stats.mean - 30_000.0).abs() < 1e-9);
        assert!((stats.stddev - 9_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_salary_stats_huge_values_fall_back() {
        let big = i64::MAX as u64 / 2 + 1;
        let stats = SalaryStats::from_salaries(vec![big; 4]).unwrap();
        assert_eq!(stats.count, 4);
        assert!((stats.mean - big as f64).abs() / (big as f64) < 1e-12);
        assert!(stats.stddev.abs() < 1e-3 * big as f64);

        let top = i64::MAX as u64;
        let spread = SalaryStats::from_salaries(vec![top, top / 2, top, top / 2]).unwrap();
        let expected_mean = 0.75 * top as f64;
        let expected_stddev = 0.25 * top as f64;
        assert!((spread.mean - expected_mean).abs() / expected_mean < 1e-9);
        assert!((spread.stddev - expected_stddev).abs() / expected_stddev < 1e-9);
    }

    #[test]
    fn test_huge_salaries_score_without_panicking() {
        let big = i64::MAX as u64 / 2 + 1;
        let corpus: Vec<Record> = (0..4)
            .map(|i| make_record("Engineer", &format!("Co{i}"), Industry::Technology, big))
            .collect();
        let submission = Submission::new("Engineer", "Co9", Industry::Technology, None, big);
        let report = detector().assess(&submission, &corpus);
        assert!(!report.has(FlagType::ExtremeOutlier));
        assert!(!report.has(FlagType::Outlier));
    }

    #[test]
    fn test_extreme_outlier_scenario() {
        let corpus = technology_corpus();
        let submission = Submission::new("Engineer", "Startup", Industry::Technology, None, 85_000);
        let report = detector().assess(&submission, &corpus);

        // z = 55,000 / 9,000 ≈ 6.11
        assert!(report.has(FlagType::ExtremeOutlier));
        assert_eq!(report.penalty_total, 40);
        assert_eq!(report.score, 60);
    }

    #[test]
    fn test_outlier_band() {
        // Mean 10,000, stddev exactly 1,000 (half at 9k, half at 11k).
        let corpus: Vec<Record> = [9_000u64, 11_000, 9_000, 11_000]
            .iter()
            .enumerate()
            .map(|(i, s)| make_record("Lecturer", &format!("School{i}"), Industry::Education, *s))
            .collect();

        let outlier = Submission::new("Lecturer", "New School", Industry::Education, None, 12_800);
        let report = detector().assess(&outlier, &corpus);
        assert!(report.has(FlagType::Outlier));
        assert!(!report.has(FlagType::ExtremeOutlier));
        assert_eq!(report.score, 80);

        let at_cutoff = Submission::new("Lecturer", "New School", Industry::Education, None, 13_000);
        let report = detector().assess(&at_cutoff, &corpus);
        assert!(report.has(FlagType::Outlier), "z == 3.0 is an outlier, not extreme");

        let extreme = Submission::new("Lecturer", "New School", Industry::Education, None, 13_001);
        assert!(detector().assess(&extreme, &corpus).has(FlagType::ExtremeOutlier));
    }

    #[test]
    fn test_industry_signal_needs_three_records() {
        let corpus = vec![
            make_record("Engineer", "A", Industry::Technology, 20_000),
            make_record("Engineer", "B", Industry::Technology, 20_500),
        ];
        let submission = Submission::new("Engineer", "C", Industry::Technology, None, 900_000);
        let report = detector().assess(&submission, &corpus);
        assert!(!report.has(FlagType::ExtremeOutlier));
        assert!(!report.has(FlagType::Outlier));
    }

    #[test]
    fn test_identical_group_uses_stddev_floor() {
        let corpus: Vec<Record> = (0..3)
            .map(|i| make_record("Clerk", &format!("Shop{i}"), Industry::Retail, 8_000))
            .collect();
        let submission = Submission::new("Clerk", "Other", Industry::Retail, None, 8_002);
        // stddev 0 floored to 1 → z = 2 → no flag.
        assert!(detector().assess(&submission, &corpus).findings.is_empty());
    }

    #[test]
    fn test_experience_envelope_scenario() {
        let band = Some(ExperienceBand::ThreeToFive);

        let low = Submission::new("Analyst", "X", Industry::Finance, band, 5_000);
        let report = detector().assess(&low, &[]);
        assert!(report.has(FlagType::LowForExp));
        assert_eq!(report.score, 85);

        let high = Submission::new("Analyst", "X", Industry::Finance, band, 100_000);
        let report = detector().assess(&high, &[]);
        assert!(report.has(FlagType::HighForExp));

        let normal = Submission::new("Analyst", "X", Industry::Finance, band, 25_000);
        assert!(detector().assess(&normal, &[]).findings.is_empty());
    }

    #[test]
    fn test_unknown_band_skips_envelope() {
        let submission = Submission::new("Analyst", "X", Industry::Finance, None, 1);
        assert!(detector().assess(&submission, &[]).findings.is_empty());
    }

    #[test]
    fn test_company_mismatch() {
        let corpus = vec![
            make_record("Dev", "Vodafone", Industry::Telecommunications, 20_000),
            make_record("QA", "VODAFONE", Industry::Telecommunications, 22_000),
        ];
        let far = Submission::new("Dev", "vodafone", Industry::Telecommunications, None, 45_000);
        let report = detector().assess(&far, &corpus);
        assert!(report.has(FlagType::CompanyMismatch));

        let near = Submission::new("Dev", "vodafone", Industry::Telecommunications, None, 40_000);
        assert!(!detector().assess(&near, &corpus).has(FlagType::CompanyMismatch));
    }

    #[test]
    fn test_company_signal_needs_two_records() {
        let corpus = vec![make_record("Dev", "Orange", Industry::Telecommunications, 10_000)];
        let submission = Submission::new("Dev", "Orange", Industry::Telecommunications, None, 90_000);
        assert!(!detector().assess(&submission, &corpus).has(FlagType::CompanyMismatch));
    }

    #[test]
    fn test_round_number_is_silent() {
        let submission = Submission::new("Director", "X", Industry::Energy, None, 70_000);
        let report = detector().assess(&submission, &[]);
        assert!(report.has(FlagType::RoundNumber));
        assert!(report.visible_flags().is_empty());
        assert_eq!(report.score, 95);
    }

    #[test]
    fn test_duplicate_detection_case_insensitive() {
        let corpus = vec![make_record("Software Engineer", "Instabug", Industry::Technology, 45_000)];
        let submission =
            Submission::new("software engineer", "INSTABUG", Industry::Technology, None, 45_000);
        let report = detector().assess(&submission, &corpus);
        assert!(report.has(FlagType::Duplicate));
        assert!(report.score <= 50);

        let different_salary =
            Submission::new("software engineer", "INSTABUG", Industry::Technology, None, 45_001);
        assert!(!detector().assess(&different_salary, &corpus).has(FlagType::Duplicate));
    }

    #[test]
    fn test_duplicate_of_rejected_record_still_detected() {
        let mut rejected = make_record("Chef", "Hilton", Industry::Retail, 15_000);
        rejected.status = RecordStatus::Rejected;
        let submission = Submission::new("Chef", "Hilton", Industry::Retail, None, 15_000);
        assert!(detector().assess(&submission, &[rejected]).has(FlagType::Duplicate));
    }

    #[test]
    fn test_rejected_records_excluded_from_baseline() {
        let mut corpus: Vec<Record> = (0..3)
            .map(|i| make_record("Clerk", &format!("Shop{i}"), Industry::Retail, 8_000))
            .collect();
        for r in &mut corpus {
            r.status = RecordStatus::Rejected;
        }
        let submission = Submission::new("Clerk", "Other", Industry::Retail, None, 80_001);
        assert!(!detector().assess(&submission, &corpus).has(FlagType::ExtremeOutlier));

        let mut policy = AdmissionPolicyV1::default();
        policy.baseline = crate::policy::BaselinePopulation::All;
        let report = AnomalyDetector::new(policy).assess(&submission, &corpus);
        assert!(report.has(FlagType::ExtremeOutlier));
    }

    #[test]
    fn test_penalties_stack_and_clamp() {
        let band = Some(ExperienceBand::UnderOne);
        let corpus = vec![
            make_record("Intern", "Tiny", Industry::Consulting, 3_000),
            make_record("Intern", "Tiny", Industry::Consulting, 3_200),
            make_record("Intern", "Tiny", Industry::Consulting, 3_100),
            make_record("Intern", "Tiny", Industry::Consulting, 900_000),
        ];
        let submission = Submission::new("Intern", "Tiny", Industry::Consulting, band, 900_000);
        let report = detector().assess(&submission, &corpus);
        // high_for_exp 30 + company_mismatch 25 + round_number 5 + duplicate 50 = 110
        assert!(report.penalty_total >= 110);
        assert_eq!(report.score, 0);
        assert_eq!(report.provisional_status, RecordStatus::Flagged);
    }

    #[test]
    fn test_assessment_is_order_independent() {
        let corpus = technology_corpus();
        let mut reversed = corpus.clone();
        reversed.reverse();

        let submission = Submission::new("Engineer", "Co3", Industry::Technology, None, 58_000);
        assert_eq!(
            detector().assess(&submission, &corpus),
            detector().assess(&submission, &reversed)
        );
    }

    #[test]
    fn test_format_egp() {
        assert_eq!(format_egp(0), "0");
        assert_eq!(format_egp(999), "999");
        assert_eq!(format_egp(85_000), "85,000");
        assert_eq!(format_egp(1_234_567), "1,234,567");
    }
}
