//! Recognized training submission options.

use crate::config::ConfigError;

/// Caller-supplied options for a training submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrainingOptions {
    name: Option<String>,
    image: Option<String>,
    extra_args: Vec<String>,
    node: Option<String>,
}

/// Options with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTrainingOptions {
    /// Display name for the job and its artifact.
    pub name: Option<String>,
    /// Container image reference.
    pub image: String,
    /// Extra command-line arguments passed to the trainer.
    pub extra_args: Vec<String>,
    /// Preferred compute node on the host.
    pub node: Option<String>,
}

impl TrainingOptions {
    /// Creates options with nothing set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the job name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the container image reference.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Sets extra trainer arguments.
    #[must_use]
    pub fn with_extra_args(mut self, extra_args: impl IntoIterator<Item = String>) -> Self {
        self.extra_args = extra_args.into_iter().collect();
        self
    }

    /// Sets the preferred compute node.
    #[must_use]
    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    /// Returns the job name, if set.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Applies process defaults.
    ///
    /// Blank strings count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingImage`] when neither the options nor
    /// `default_image` name a container image.
    pub fn resolve(
        &self,
        default_image: Option<&str>,
    ) -> Result<ResolvedTrainingOptions, ConfigError> {
        let image = non_blank(self.image.as_deref())
            .or_else(|| non_blank(default_image))
            .ok_or(ConfigError::MissingImage)?;
        Ok(ResolvedTrainingOptions {
            name: non_blank(self.name.as_deref()),
            image,
            extra_args: self.extra_args.clone(),
            node: non_blank(self.node.as_deref()),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}
