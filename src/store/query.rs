//! Read-only corpus queries for display consumers.

use serde::{Deserialize, Serialize};

use crate::types::{normalize_key, Industry, Record, RecordStatus};

/// Conjunctive filter over records.
///
/// Every set field must match; an empty query matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusQuery {
    /// Restrict to one industry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<Industry>,
    /// Restrict to one status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordStatus>,
    /// Case-insensitive exact company match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    /// Inclusive lower salary bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_salary: Option<u64>,
    /// Inclusive upper salary bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_salary: Option<u64>,
    /// Only publicly visible records.
    #[serde(default)]
    pub public_only: bool,
}

impl CorpusQuery {
    /// Query matching every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Query matching publicly visible records.
    pub fn public() -> Self {
        Self {
            public_only: true,
            ..Self::default()
        }
    }

    /// Restrict to an industry.
    pub fn industry(mut self, industry: Industry) -> Self {
        self.industry = Some(industry);
        self
    }

    /// Restrict to a status.
    pub fn status(mut self, status: RecordStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict to a company.
    pub fn company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    /// Restrict to a salary range (inclusive).
    pub fn salary_between(mut self, min: u64, max: u64) -> Self {
        self.min_salary = Some(min);
        self.max_salary = Some(max);
        self
    }

    /// Whether a record satisfies the query.
    pub fn matches(&self, record: &Record) -> bool {
        if self.public_only && !record.is_public() {
            return false;
        }
        if self.industry.is_some_and(|i| i != record.industry) {
            return false;
        }
        if self.status.is_some_and(|s| s != record.status) {
            return false;
        }
        if let Some(company) = &self.company {
            if normalize_key(company) != normalize_key(&record.company) {
                return false;
            }
        }
        if self.min_salary.is_some_and(|min| record.salary < min) {
            return false;
        }
        if self.max_salary.is_some_and(|max| record.salary > max) {
            return false;
        }
        true
    }
}
