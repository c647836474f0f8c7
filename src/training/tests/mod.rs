//! Unit tests for the training context.
