//! Record types for the compensation corpus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use std::fmt;

use super::flag::Flag;
use super::status::RecordStatus;

/// Unique identifier for a record in the corpus.
///
/// Wraps a UUID and implements `Ord` for deterministic ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Create a new RecordId from a UUID.
    pub fn new(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a fresh random RecordId.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a RecordId from a UUID string.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Industry a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    /// Software, IT services, internet.
    Technology,
    /// Banking, insurance, investment.
    Finance,
    /// Hospitals, pharma, clinics.
    Healthcare,
    /// Schools, universities, training.
    Education,
    /// Factories and industrial production.
    Manufacturing,
    /// Shops, e-commerce, FMCG distribution.
    Retail,
    /// Carriers and network operators.
    Telecommunications,
    /// Construction and real estate development.
    Construction,
    /// Oil, gas, power and utilities.
    Energy,
    /// Consulting and professional services.
    Consulting,
}

impl Industry {
    /// All industries in declaration order.
    pub const ALL: [Industry; 10] = [
        Self::Technology,
        Self::Finance,
        Self::Healthcare,
        Self::Education,
        Self::Manufacturing,
        Self::Retail,
        Self::Telecommunications,
        Self::Construction,
        Self::Energy,
        Self::Consulting,
    ];

    /// Parse industry from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "technology" => Some(Self::Technology),
            "finance" => Some(Self::Finance),
            "healthcare" => Some(Self::Healthcare),
            "education" => Some(Self::Education),
            "manufacturing" => Some(Self::Manufacturing),
            "retail" => Some(Self::Retail),
            "telecommunications" => Some(Self::Telecommunications),
            "construction" => Some(Self::Construction),
            "energy" => Some(Self::Energy),
            "consulting" => Some(Self::Consulting),
            _ => None,
        }
    }

    /// Wire name of the industry.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technology => "technology",
            Self::Finance => "finance",
            Self::Healthcare => "healthcare",
            Self::Education => "education",
            Self::Manufacturing => "manufacturing",
            Self::Retail => "retail",
            Self::Telecommunications => "telecommunications",
            Self::Construction => "construction",
            Self::Energy => "energy",
            Self::Consulting => "consulting",
        }
    }
}

impl Default for Industry {
    fn default() -> Self {
        Self::Technology
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Years-of-experience band, ordered from junior to senior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExperienceBand {
    /// Less than one year.
    #[serde(rename = "0-1")]
    UnderOne,
    /// One to three years.
    #[serde(rename = "1-3")]
    OneToThree,
    /// Three to five years.
    #[serde(rename = "3-5")]
    ThreeToFive,
    /// Five to ten years.
    #[serde(rename = "5-10")]
    FiveToTen,
    /// Ten to fifteen years.
    #[serde(rename = "10-15")]
    TenToFifteen,
    /// Fifteen years or more.
    #[serde(rename = "15+")]
    FifteenPlus,
}

impl ExperienceBand {
    /// All bands in ascending order.
    pub const ALL: [ExperienceBand; 6] = [
        Self::UnderOne,
        Self::OneToThree,
        Self::ThreeToFive,
        Self::FiveToTen,
        Self::TenToFifteen,
        Self::FifteenPlus,
    ];

    /// Parse a band label such as `"3-5"` or `"3-5 years"`.
    ///
    /// Returns `None` for labels outside the fixed set.
    pub fn parse(s: &str) -> Option<Self> {
        let label = s.trim().to_lowercase();
        let label = label.trim_end_matches("years").trim_end_matches("year").trim();
        match label {
            "0-1" => Some(Self::UnderOne),
            "1-3" => Some(Self::OneToThree),
            "3-5" => Some(Self::ThreeToFive),
            "5-10" => Some(Self::FiveToTen),
            "10-15" => Some(Self::TenToFifteen),
            "15+" => Some(Self::FifteenPlus),
            _ => None,
        }
    }

    /// Band label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnderOne => "0-1",
            Self::OneToThree => "1-3",
            Self::ThreeToFive => "3-5",
            Self::FiveToTen => "5-10",
            Self::TenToFifteen => "10-15",
            Self::FifteenPlus => "15+",
        }
    }
}

impl fmt::Display for ExperienceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} years", self.as_str())
    }
}

/// Whether the reported salary is before or after deductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryType {
    /// Before tax and insurance.
    Gross,
    /// Take-home pay.
    Net,
}

/// Employment contract type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    /// Permanent full-time.
    FullTime,
    /// Permanent part-time.
    PartTime,
    /// Fixed-term contract.
    Contract,
    /// Freelance or self-employed.
    Freelance,
    /// Internship.
    Internship,
}

/// Headcount band of the employer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CompanySize {
    /// 1 to 10 employees.
    #[serde(rename = "1-10")]
    Micro,
    /// 11 to 50 employees.
    #[serde(rename = "11-50")]
    Small,
    /// 51 to 200 employees.
    #[serde(rename = "51-200")]
    Medium,
    /// 201 to 1000 employees.
    #[serde(rename = "201-1000")]
    Large,
    /// More than 1000 employees.
    #[serde(rename = "1000+")]
    Enterprise,
}

/// Optional, effortful inputs whose completion raises trust.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrictionFields {
    /// Gross or net.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_type: Option<SalaryType>,
    /// Contract type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_type: Option<ContractType>,
    /// Whether the submitter received a raise in the last year.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_raise: Option<bool>,
    /// Employer headcount band.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_size: Option<CompanySize>,
}

impl FrictionFields {
    /// Number of friction fields the submitter filled in (0..=4).
    pub fn completed(&self) -> usize {
        [
            self.salary_type.is_some(),
            self.contract_type.is_some(),
            self.recent_raise.is_some(),
            self.company_size.is_some(),
        ]
        .iter()
        .filter(|filled| **filled)
        .count()
    }
}

/// An admitted compensation record.
///
/// Created once by the admission pipeline. Only `status`, `trust_score`,
/// `verified` and `community_flag_count` change afterwards, and only through
/// moderation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique record identifier.
    pub id: RecordId,
    /// Job title.
    pub title: String,
    /// Employer name as entered.
    pub company: String,
    /// Industry.
    pub industry: Industry,
    /// City.
    pub city: String,
    /// Experience band, `None` when the label was not recognised.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<ExperienceBand>,
    /// Monthly salary in EGP.
    pub salary: u64,
    /// When the record was admitted.
    pub submitted_at: DateTime<Utc>,
    /// Whether a moderator has approved the record.
    pub verified: bool,
    /// Trust score in [0, 100].
    pub trust_score: u8,
    /// Lifecycle status.
    pub status: RecordStatus,
    /// Anomaly flags raised at admission.
    #[serde(default)]
    pub flags: Vec<Flag>,
    /// Number of community reports.
    #[serde(default)]
    pub community_flag_count: u32,
    /// Opaque submitter fingerprint.
    pub device_fingerprint: String,
    /// Optional friction fields.
    #[serde(default, flatten)]
    pub friction: FrictionFields,
}

impl Record {
    /// Whether the record is shown to the public.
    pub fn is_public(&self) -> bool {
        self.status == RecordStatus::AutoApproved
    }

    /// Case-insensitive company comparison.
    pub fn same_company(&self, company: &str) -> bool {
        normalize_key(&self.company) == normalize_key(company)
    }

    /// Case-insensitive title comparison.
    pub fn same_title(&self, title: &str) -> bool {
        normalize_key(&self.title) == normalize_key(title)
    }
}

/// Normalize a free-text key for case-insensitive exact matching.
pub fn normalize_key(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experience_band_parse() {
        assert_eq!(ExperienceBand::parse("3-5"), Some(ExperienceBand::ThreeToFive));
        assert_eq!(ExperienceBand::parse("3-5 years"), Some(ExperienceBand::ThreeToFive));
        assert_eq!(ExperienceBand::parse("15+ Years"), Some(ExperienceBand::FifteenPlus));
        assert_eq!(ExperienceBand::parse("20-30"), None);
    }

    #[test]
    fn test_experience_bands_are_ordered() {
        let mut sorted = ExperienceBand::ALL;
        sorted.sort();
        assert_eq!(sorted, ExperienceBand::ALL);
    }

    #[test]
    fn test_industry_roundtrip_names() {
        for industry in Industry::ALL {
            assert_eq!(Industry::parse(industry.as_str()), Some(industry));
        }
        assert_eq!(Industry::parse(" Technology "), Some(Industry::Technology));
        assert_eq!(Industry::parse("agriculture"), None);
    }

    #[test]
    fn test_friction_completed() {
        let mut friction = FrictionFields::default();
        assert_eq!(friction.completed(), 0);

        friction.salary_type = Some(SalaryType::Net);
        friction.recent_raise = Some(false);
        assert_eq!(friction.completed(), 2);

        friction.contract_type = Some(ContractType::FullTime);
        friction.company_size = Some(CompanySize::Large);
        assert_eq!(friction.completed(), 4);
    }

    #[test]
    fn test_serde_wire_names() {
        let json = serde_json::to_string(&ExperienceBand::FifteenPlus).unwrap();
        assert_eq!(json, "\"15+\"");
        let json = serde_json::to_string(&ContractType::FullTime).unwrap();
        assert_eq!(json, "\"full_time\"");
        let json = serde_json::to_string(&Industry::Telecommunications).unwrap();
        assert_eq!(json, "\"telecommunications\"");
    }
}
