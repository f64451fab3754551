//! Experience-band salary envelopes.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::ExperienceBand;

/// Plausible monthly salary range (EGP) for an experience band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalaryEnvelope {
    /// Typical floor.
    pub min: u64,
    /// Typical ceiling.
    pub max: u64,
}

impl SalaryEnvelope {
    /// Create an envelope; bounds are swapped if given in the wrong order.
    pub fn new(min: u64, max: u64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }
}

/// Band → envelope table.
///
/// Bands without an entry, and submissions without a recognised band, have no
/// envelope: the plausibility signal stays silent for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeTable(BTreeMap<ExperienceBand, SalaryEnvelope>);

impl EnvelopeTable {
    /// Create an empty table.
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Insert or replace the envelope for a band.
    pub fn with(mut self, band: ExperienceBand, envelope: SalaryEnvelope) -> Self {
        self.0.insert(band, envelope);
        self
    }

    /// Look up the envelope for a (possibly unrecognised) band.
    pub fn lookup(&self, band: Option<ExperienceBand>) -> Option<SalaryEnvelope> {
        band.and_then(|b| self.0.get(&b).copied())
    }

    /// Iterate entries in band order.
    pub fn iter(&self) -> impl Iterator<Item = (&ExperienceBand, &SalaryEnvelope)> {
        self.0.iter()
    }
}

impl Default for EnvelopeTable {
    fn default() -> Self {
        Self::empty()
            .with(ExperienceBand::UnderOne, SalaryEnvelope::new(4_000, 15_000))
            .with(ExperienceBand::OneToThree, SalaryEnvelope::new(7_000, 30_000))
            .with(ExperienceBand::ThreeToFive, SalaryEnvelope::new(12_000, 60_000))
            .with(ExperienceBand::FiveToTen, SalaryEnvelope::new(20_000, 100_000))
            .with(ExperienceBand::TenToFifteen, SalaryEnvelope::new(30_000, 150_000))
            .with(ExperienceBand::FifteenPlus, SalaryEnvelope::new(45_000, 250_000))
    }
}
