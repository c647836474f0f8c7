//! Adapter implementations for training ports.

pub mod http;
pub mod lifecycle;
pub mod memory;
pub mod postgres;
