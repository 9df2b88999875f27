//! Shared models and types
//!
//! Types used by more than one component live here to avoid
//! circular dependencies between the analyzer, the decision system
//! and the web API.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Entry decision for a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Decision {
    /// Vehicle may enter; the barrier opens
    Allow,
    /// Vehicle must not enter
    Deny,
    /// Ambiguous or unavailable analysis; an operator has to decide
    Review,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "ALLOW",
            Decision::Deny => "DENY",
            Decision::Review => "REVIEW",
        }
    }

    /// Whether this decision actuates the barrier
    pub fn opens_barrier(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one vehicle analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Free-text rationale returned by the vision model
    pub analysis: String,
    pub decision: Decision,
    /// Unix seconds with fractional part
    pub timestamp: f64,
}

impl AnalysisResult {
    /// Create a result stamped with the current time
    pub fn now(analysis: impl Into<String>, decision: Decision) -> Self {
        Self {
            analysis: analysis.into(),
            decision,
            timestamp: unix_now(),
        }
    }
}

/// Current time as fractional Unix seconds
pub fn unix_now() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    pub barrier: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Decision::Allow).unwrap(), "\"ALLOW\"");
        let d: Decision = serde_json::from_str("\"REVIEW\"").unwrap();
        assert_eq!(d, Decision::Review);
        assert!(serde_json::from_str::<Decision>("\"allow\"").is_err());
    }

    #[test]
    fn test_only_allow_opens_barrier() {
        assert!(Decision::Allow.opens_barrier());
        assert!(!Decision::Deny.opens_barrier());
        assert!(!Decision::Review.opens_barrier());
    }

    #[test]
    fn test_unix_now_is_recent() {
        let ts = unix_now();
        assert!(ts > 1_600_000_000.0);
    }
}
