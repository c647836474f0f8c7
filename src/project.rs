//! Project identity shared by every training lifecycle record.
//!
//! Backups, training jobs, and model artifacts are each scoped to exactly one
//! project. The identifier doubles as a directory name under the storage
//! roots, so it is restricted to a filesystem-safe alphabet.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum accepted project identifier length.
const MAX_PROJECT_ID_LENGTH: usize = 64;

/// Identifier of the chatbot project that owns a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

/// Error returned when a project identifier fails validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProjectIdError {
    /// The identifier is empty after trimming.
    #[error("project identifier must not be empty")]
    Empty,

    /// The identifier exceeds the storage limit.
    #[error("project identifier exceeds {MAX_PROJECT_ID_LENGTH} characters: {0}")]
    TooLong(String),

    /// The identifier contains characters outside `[A-Za-z0-9_-]`.
    #[error(
        "project identifier '{0}' contains invalid characters (only ASCII alphanumerics, '-' and '_' allowed)"
    )]
    InvalidCharacters(String),
}

impl ProjectId {
    /// Creates a validated project identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectIdError`] when the value is empty, too long, or would
    /// not be a safe single path component.
    pub fn new(value: impl Into<String>) -> Result<Self, ProjectIdError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ProjectIdError::Empty);
        }
        if trimmed.chars().count() > MAX_PROJECT_ID_LENGTH {
            return Err(ProjectIdError::TooLong(raw));
        }
        let is_valid = trimmed
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
        if !is_valid {
            return Err(ProjectIdError::InvalidCharacters(raw));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the identifier as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ProjectId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for ProjectId {
    type Error = ProjectIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = ProjectIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProjectId> for String {
    fn from(value: ProjectId) -> Self {
        value.0
    }
}
