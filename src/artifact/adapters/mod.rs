//! Adapter implementations for artifact ports.

pub mod filesystem;
pub mod memory;
pub mod postgres;
