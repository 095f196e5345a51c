use serde::{Deserialize, Serialize};

/// What happens when a second signal of an existing kind is ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateSignalPolicy {
    /// Fail with `InvalidInput` on the `kind` field.
    #[default]
    Reject,
    /// Keep both; scoring uses the most recently updated one.
    LatestWins,
}

/// Tunable workflow rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DischargePolicy {
    /// At most one accepted placement per encounter; accepting one declines
    /// the remaining open requests.
    pub exclusive_placement: bool,
    pub duplicate_signals: DuplicateSignalPolicy,
}

impl Default for DischargePolicy {
    fn default() -> Self {
        Self {
            exclusive_placement: true,
            duplicate_signals: DuplicateSignalPolicy::Reject,
        }
    }
}
