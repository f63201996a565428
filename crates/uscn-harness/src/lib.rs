//! Conformance and property-testing harness for the USCN protocol engine.
//!
//! This crate provides:
//! - Structured JSONL logging for test/e2e/perf workflows
//!   ([`structured_log`]).
//! - The six named scenarios (S1-S6) of spec §8 and the schema/config
//!   fixture they share ([`scenarios`]).
//! - A small [`TestRunner`] that builds a fresh
//!   [`uscn_membrane::Validator`] from a scenario's schema/config and drives
//!   one input buffer through it, for callers (the `harness` binary) that
//!   want to run a named scenario outside the `#[test]` harness.

#![deny(unsafe_code)]

pub mod scenarios;
pub mod structured_log;

use uscn_core::buffer::Buffer;
use uscn_core::error::UscnResult;
use uscn_membrane::{Validator, ValidatorConfig};

/// Builds a validator from `schema`/`config` and runs it against one input
/// buffer, for ad hoc scenario replay outside the test harness.
pub struct TestRunner {
    label: String,
}

impl TestRunner {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Validate `input` against `schema`/`config`, returning whatever
    /// [`Validator::validate`] returns.
    pub fn run(
        &self,
        schema: uscn_core::schema::Schema,
        config: ValidatorConfig,
        input: Vec<u8>,
    ) -> UscnResult<uscn_membrane::ValidationOutcome> {
        let validator = Validator::new(schema, config)?;
        let mut buffer = Buffer::from_bytes(input)?;
        validator.validate(&mut buffer)
    }
}
