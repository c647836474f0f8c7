//! Trainyard: training job and model artifact lifecycle.
//!
//! This crate snapshots a project before a risky remote operation, submits
//! training jobs to an operator-managed compute host, reconciles local job
//! records against remote state, captures the resulting model artifacts, and
//! activates exactly one artifact per project.
//!
//! # Architecture
//!
//! Trainyard follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, HTTP,
//!   filesystem)
//!
//! # Modules
//!
//! - [`backup`]: Pre-training project snapshots and restore
//! - [`artifact`]: Model artifact capture and deployment
//! - [`training`]: Job submission, reconciliation, and cancellation
//! - [`storage`]: Crash-safe file writes and pointer publication
//! - [`config`]: Environment-driven operator configuration

pub mod artifact;
pub mod backup;
pub mod config;
pub mod postgres;
pub mod project;
pub mod storage;
pub mod telemetry;
pub mod training;
