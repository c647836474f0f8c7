//! Training job lifecycle status.

use super::ParseTrainingStatusError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status shared by local records and the training host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    /// The host is still training.
    Training,
    /// Training finished and a result is available.
    Success,
    /// Training failed.
    Failed,
    /// Training was cancelled.
    Cancelled,
}

impl TrainingStatus {
    /// Returns the canonical wire and storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Training => "training",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns whether no further transition is allowed.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Training)
    }

    /// Returns whether a record in this status may move to `next`.
    ///
    /// Only `training` moves; terminal statuses are final.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(self, Self::Training) && !matches!(next, Self::Training)
    }
}

impl fmt::Display for TrainingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TrainingStatus {
    type Error = ParseTrainingStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "training" => Ok(Self::Training),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseTrainingStatusError(value.to_owned())),
        }
    }
}
