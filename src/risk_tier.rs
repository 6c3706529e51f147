//! Three-tier risk verdict over a default probability.
//!
//! The thresholds are fixed constants of the design, not learned, so the
//! decision boundary operators see stays stable across model retrains.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{RiskError, RiskResult};

/// Probabilities below this are no-risk.
pub const LESS_RISK_THRESHOLD: f64 = 0.2;
/// Probabilities at or above this are high-risk.
pub const HIGH_RISK_THRESHOLD: f64 = 0.3;

/// Ordered risk verdict. Intervals are half-open, lower bound inclusive:
/// `[0, 0.2)` no-risk, `[0.2, 0.3)` less-risk, `[0.3, 1.0]` high-risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskTier {
    NoRisk,
    LessRisk,
    HighRisk,
}

impl RiskTier {
    /// Map a probability to its tier. Probabilities outside `[0, 1]` are
    /// rejected rather than clamped.
    pub fn from_probability(probability: f64) -> RiskResult<Self> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(RiskError::validation(
                "probability",
                format!("{probability} is outside [0, 1]"),
            ));
        }
        if probability < LESS_RISK_THRESHOLD {
            Ok(RiskTier::NoRisk)
        } else if probability < HIGH_RISK_THRESHOLD {
            Ok(RiskTier::LessRisk)
        } else {
            Ok(RiskTier::HighRisk)
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::NoRisk => "no-risk",
            RiskTier::LessRisk => "less-risk",
            RiskTier::HighRisk => "high-risk",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
