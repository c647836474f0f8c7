//! Training host base URL.

use super::TrainingDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base URL of an operator-managed training host.
///
/// Stored without a trailing slash so endpoint paths can be appended
/// directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostUrl(String);

impl HostUrl {
    /// Validates and normalizes a host URL.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingDomainError::InvalidHost`] unless the value is an
    /// `http://` or `https://` URL with a non-empty authority.
    pub fn new(value: impl Into<String>) -> Result<Self, TrainingDomainError> {
        let raw = value.into();
        let normalized = raw.trim().trim_end_matches('/');
        let authority = normalized
            .strip_prefix("https://")
            .or_else(|| normalized.strip_prefix("http://"));
        match authority {
            Some(rest) if !rest.is_empty() && !rest.starts_with('/') => {
                Ok(Self(normalized.to_owned()))
            }
            _ => Err(TrainingDomainError::InvalidHost(raw)),
        }
    }

    /// Returns the normalized URL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Appends an endpoint path to the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.0, path.trim_start_matches('/'))
    }
}

impl fmt::Display for HostUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HostUrl {
    type Error = TrainingDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HostUrl> for String {
    fn from(value: HostUrl) -> Self {
        value.0
    }
}
