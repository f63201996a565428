//! # uscn-cli
//!
//! Library half of the thin CLI collaborator: just the YAML schema loader.
//! `main.rs` is the binary; it contains no protocol logic of its own, only
//! clap plumbing that constructs a [`uscn_membrane::Validator`] (or
//! `Normalizer`/`AuditLog`) and calls into it in the prescribed order.

pub mod schema_yaml;
