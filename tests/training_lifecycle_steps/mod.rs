//! Step definitions for training lifecycle scenarios.

pub mod world;

mod given;
mod then;
mod when;
