//! Adapter implementations for backup ports.

pub mod filesystem;
pub mod memory;
pub mod postgres;
