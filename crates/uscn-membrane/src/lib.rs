//! # uscn-membrane
//!
//! Zero-trust enforcement policy, the admission cost evaluator, and the
//! validation orchestrator that ties `uscn-core`'s buffer, normalizer,
//! automaton, and schema together into the seven-step pipeline of spec
//! §4.3, plus the mandatory eighth step of an audit entry per terminating
//! path. `Validator` owns its `uscn-audit::AuditLog` outright; it never
//! needs a caller to wire one in for the step itself to run.
//!
//! No `unsafe` code is permitted at the crate level.

#![deny(unsafe_code)]

pub mod config;
pub mod cost;
pub mod validator;

pub use config::{resolved_policy, EnforcementPolicy, ValidatorConfig};
pub use cost::{CostBreakdown, CostEvaluator};
pub use validator::{ValidationOutcome, Validator};
