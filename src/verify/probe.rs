//! Probe values and per-node verification outcomes

use serde::Serialize;

use crate::config::NodeAddress;

/// Random alphanumeric probe value
pub fn random_value(rng: &mut fastrand::Rng, len: usize) -> String {
    (0..len).map(|_| rng.alphanumeric()).collect()
}

/// How a single replica check ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ProbeOutcome {
    /// Replica returned the expected value
    Pass,
    /// Replica returned a different value, or none
    Mismatch,
    /// Replica could not be connected to or read from
    ReadFailed(String),
    /// No probe key could be located on the primary (cluster mode)
    Unresolved(String),
}

/// One verification outcome: what was expected where, and what was seen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub key: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub primary: NodeAddress,
    pub replica: NodeAddress,
    pub outcome: ProbeOutcome,
}

impl ProbeResult {
    /// Compare what the replica returned against what the primary holds
    pub fn compare(
        key: &str,
        expected: &str,
        actual: Option<String>,
        primary: &NodeAddress,
        replica: &NodeAddress,
    ) -> Self {
        let outcome = if actual.as_deref() == Some(expected) {
            ProbeOutcome::Pass
        } else {
            ProbeOutcome::Mismatch
        };
        Self {
            key: key.to_string(),
            expected: Some(expected.to_string()),
            actual,
            primary: primary.clone(),
            replica: replica.clone(),
            outcome,
        }
    }

    pub fn read_failed(
        key: &str,
        expected: Option<&str>,
        primary: &NodeAddress,
        replica: &NodeAddress,
        error: impl ToString,
    ) -> Self {
        Self {
            key: key.to_string(),
            expected: expected.map(String::from),
            actual: None,
            primary: primary.clone(),
            replica: replica.clone(),
            outcome: ProbeOutcome::ReadFailed(error.to_string()),
        }
    }

    pub fn unresolved(primary: &NodeAddress, replica: &NodeAddress, reason: impl ToString) -> Self {
        Self {
            key: String::new(),
            expected: None,
            actual: None,
            primary: primary.clone(),
            replica: replica.clone(),
            outcome: ProbeOutcome::Unresolved(reason.to_string()),
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome == ProbeOutcome::Pass
    }
}
