//! Named per-project model pointers.

use std::fmt;

/// Symbolic pointer maintained in each project's model directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelPointer {
    /// Follows the most recently captured artifact.
    Latest,
    /// Follows the deployed artifact.
    Current,
}

impl ModelPointer {
    /// Returns the link name on disk.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Current => "current",
        }
    }
}

impl fmt::Display for ModelPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}
