//! Trained model artifacts and their activation.
//!
//! Artifacts are written under a per-project directory and tracked as
//! [`domain::ModelArtifact`] records. Two symbolic-link pointers exist per
//! project: `latest` follows the newest captured file and `current` follows
//! the deployed one. At most one artifact per project is deployed at a time.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
