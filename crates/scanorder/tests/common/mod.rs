//! Shared test utilities for scanorder integration tests.
//!
//! This module provides:
//! - `TestHarness` for running scans against an isolated workbook
//! - Builder patterns for seeding sheets and configurations
//! - `FailingWorkbook` for injecting store failures

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{TestHarness, T0};
