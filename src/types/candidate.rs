//! Incoming submissions and required-field validation.

use serde::{Deserialize, Serialize};

use super::record::{ExperienceBand, FrictionFields, Industry};

/// A required field was missing or malformed.
///
/// Validation failures are user-correctable and never cause side effects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Field is absent or blank.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    /// Field is present but not acceptable.
    #[error("Invalid value for {field}: {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Why it was refused.
        reason: String,
    },
}

/// A submission exactly as received from a caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Candidate {
    /// Job title.
    #[serde(default)]
    pub title: String,
    /// Employer name.
    #[serde(default)]
    pub company: String,
    /// Industry.
    pub industry: Industry,
    /// City.
    #[serde(default)]
    pub city: String,
    /// Experience band label, e.g. `"3-5"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<String>,
    /// Monthly salary; must be a positive integer.
    #[serde(default)]
    pub salary: i64,
    /// Optional friction fields.
    #[serde(default, flatten)]
    pub friction: FrictionFields,
}

/// A candidate whose required fields passed validation.
///
/// The only input accepted by the anomaly detector and trust engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    /// Trimmed job title.
    pub title: String,
    /// Trimmed employer name.
    pub company: String,
    /// Industry.
    pub industry: Industry,
    /// Trimmed city.
    pub city: String,
    /// Recognised experience band, `None` otherwise.
    pub experience: Option<ExperienceBand>,
    /// Monthly salary.
    pub salary: u64,
    /// Optional friction fields.
    pub friction: FrictionFields,
}

impl Candidate {
    /// Validate required fields and normalise whitespace.
    pub fn validate(&self) -> Result<Submission, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingField("title"));
        }

        let company = self.company.trim();
        if company.is_empty() {
            return Err(ValidationError::MissingField("company"));
        }

        if self.salary <= 0 {
            return Err(ValidationError::InvalidField {
                field: "salary",
                reason: format!("must be a positive integer, got {}", self.salary),
            });
        }

        Ok(Submission {
            title: title.to_string(),
            company: company.to_string(),
            industry: self.industry,
            city: self.city.trim().to_string(),
            experience: self.experience.as_deref().and_then(ExperienceBand::parse),
            salary: self.salary as u64,
            friction: self.friction.clone(),
        })
    }
}

impl Submission {
    /// Build a submission directly, bypassing string parsing (for tests and benches).
    pub fn new(
        title: impl Into<String>,
        company: impl Into<String>,
        industry: Industry,
        experience: Option<ExperienceBand>,
        salary: u64,
    ) -> Self {
        Self {
            title: title.into(),
            company: company.into(),
            industry,
            city: String::new(),
            experience,
            salary,
            friction: FrictionFields::default(),
        }
    }

    /// Set friction fields.
    pub fn with_friction(mut self, friction: FrictionFields) -> Self {
        self.friction = friction;
        self
    }
}
