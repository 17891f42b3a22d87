//! Shared primitive types used across the entire simulator.
//!
//! RULE: Industry and revenue-band strings are parsed exactly once,
//! at the edge of the system. Everything past the parse works with
//! the closed enums below.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mean number of attacks per simulated period (Poisson mean).
pub type FrequencyParam = f64;

/// Mean cost of a single attack (Normal mean).
pub type SeverityParam = f64;

/// A synthetic company identifier, 1-based.
pub type CompanyId = u64;

/// The canonical analysis-run identifier.
pub type RunId = String;

/// Industry categories covered by the stats table.
/// Variants are never reordered: `Industry::ALL` order drives
/// synthetic-company generation and therefore seeded output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Industry {
    Healthcare,
    Finance,
    Retail,
    Manufacturing,
    Construction,
}

impl Industry {
    pub const ALL: [Industry; 5] = [
        Industry::Healthcare,
        Industry::Finance,
        Industry::Retail,
        Industry::Manufacturing,
        Industry::Construction,
    ];

    /// Lower-case key used in the stats file and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthcare    => "healthcare",
            Self::Finance       => "finance",
            Self::Retail        => "retail",
            Self::Manufacturing => "manufacturing",
            Self::Construction  => "construction",
        }
    }
}

impl fmt::Display for Industry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Industry {
    type Err = SimError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> SimResult<Self> {
        let key = s.trim().to_ascii_lowercase();
        Industry::ALL
            .into_iter()
            .find(|i| i.as_str() == key)
            .ok_or_else(|| SimError::InvalidIndustry { value: s.to_string() })
    }
}

/// Revenue bands in millions. Each band covers (lower, upper];
/// the first band also owns revenue 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RevenueBand {
    #[serde(rename = "10M")]
    Band10M,
    #[serde(rename = "100M")]
    Band100M,
    #[serde(rename = "500M")]
    Band500M,
    #[serde(rename = "1B")]
    Band1B,
}

impl RevenueBand {
    pub const ALL: [RevenueBand; 4] = [
        RevenueBand::Band10M,
        RevenueBand::Band100M,
        RevenueBand::Band500M,
        RevenueBand::Band1B,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Band10M  => "10M",
            Self::Band100M => "100M",
            Self::Band500M => "500M",
            Self::Band1B   => "1B",
        }
    }
}

impl fmt::Display for RevenueBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for RevenueBand {
    type Err = SimError;

    /// Labels are matched exactly ("10M", "100M", "500M", "1B").
    fn from_str(s: &str) -> SimResult<Self> {
        RevenueBand::ALL
            .into_iter()
            .find(|b| b.label() == s.trim())
            .ok_or_else(|| SimError::InvalidBand { label: s.to_string() })
    }
}
