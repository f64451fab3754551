//! Core types for the admission kernel.

pub mod record;
pub mod flag;
pub mod status;
pub mod candidate;

pub use record::{
    RecordId, Record, Industry, ExperienceBand, SalaryType, ContractType, CompanySize,
    FrictionFields, normalize_key,
};
pub use flag::{Flag, FlagType, FlagSeverity};
pub use status::{RecordStatus, ModerationAction, TransitionError, APPROVED_TRUST_FLOOR};
pub use candidate::{Candidate, Submission, ValidationError};
