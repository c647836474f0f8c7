//! Unit tests for the backup context.
