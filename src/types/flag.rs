//! Anomaly flags attached to records at admission.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of anomaly a signal detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagType {
    /// Industry z-score above the extreme cut-off.
    ExtremeOutlier,
    /// Industry z-score between the outlier and extreme cut-offs.
    Outlier,
    /// Salary well below the experience envelope.
    LowForExp,
    /// Salary well above the experience envelope.
    HighForExp,
    /// Salary far from other reports for the same company.
    CompanyMismatch,
    /// Same title, company and salary as an existing record.
    Duplicate,
    /// Suspiciously round large figure. Scored, never shown.
    RoundNumber,
}

impl FlagType {
    /// Whether flags of this type are surfaced to readers and moderators.
    pub fn is_visible(&self) -> bool {
        !matches!(self, Self::RoundNumber)
    }

    /// Wire name of the flag type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtremeOutlier => "extreme_outlier",
            Self::Outlier => "outlier",
            Self::LowForExp => "low_for_exp",
            Self::HighForExp => "high_for_exp",
            Self::CompanyMismatch => "company_mismatch",
            Self::Duplicate => "duplicate",
            Self::RoundNumber => "round_number",
        }
    }
}

impl fmt::Display for FlagType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flag severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagSeverity {
    /// Worth a second look.
    Medium,
    /// Likely fabricated or erroneous.
    High,
}

/// A single anomaly finding.
///
/// Visible and silent findings share this type; `visible` decides whether the
/// flag is stored on the record or only contributes its penalty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    /// What was detected.
    #[serde(rename = "type")]
    pub flag_type: FlagType,
    /// How serious it is.
    pub severity: FlagSeverity,
    /// Human-readable explanation.
    pub detail: String,
    /// Whether the flag is surfaced.
    pub visible: bool,
}

impl Flag {
    /// Create a flag; visibility follows the flag type.
    pub fn new(flag_type: FlagType, severity: FlagSeverity, detail: impl Into<String>) -> Self {
        Self {
            flag_type,
            severity,
            detail: detail.into(),
            visible: flag_type.is_visible(),
        }
    }
}
