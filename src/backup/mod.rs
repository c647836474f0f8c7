//! Pre-training project snapshots and rollback.
//!
//! A backup is a full point-in-time export of a project, written to the
//! backup storage root before any risky remote operation. Restoring a backup
//! ("checkout") hands the stored export back to the import pipeline with a
//! wipe-before-restore flag. The module follows hexagonal architecture:
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
