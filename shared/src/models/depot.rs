//! Depot model

use serde::{Deserialize, Serialize};

/// Short uppercase depot code as used by the stock API (`DEP`, `MUNDOCAB`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepotCode(pub String);

impl DepotCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DepotCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DepotCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A physical warehouse location.
///
/// Priority points and the per-unit multiplier come from the depot catalog
/// and are static for the life of a process run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Depot {
    pub code: DepotCode,
    /// Flat points added to every score this depot participates in
    pub priority_points: i64,
    /// Multiplier applied per coverable unit
    pub unit_multiplier: i64,
    /// Human-readable alias written into note ledgers (LOC)
    pub alias: String,
}
