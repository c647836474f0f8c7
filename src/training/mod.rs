//! Training job lifecycle: submission, reconciliation, and cancellation.
//!
//! A training run is snapshotted through the backup context, submitted to an
//! operator-managed host, tracked in a job registry with optimistic updates,
//! and, once the host reports success, captured into the artifact store. The
//! module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
