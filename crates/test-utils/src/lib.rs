//! Shared fixtures for semantic-layer tests.

pub mod fixtures;
pub mod tracing;

pub use crate::fixtures::{CountingBuilder, CountingIndex, TestModule};
pub use crate::tracing::init_tracing_for_test;
