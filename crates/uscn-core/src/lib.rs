//! # uscn-core
//!
//! The canonicalizing buffer, normalizer, automaton, schema, error taxonomy,
//! and hasher underlying the USCN protocol engine. `uscn-core` has no
//! internal dependency on the rest of the workspace: `uscn-membrane` (cost
//! evaluation, the validator, and zero-trust policy) and `uscn-audit` (the
//! tamper-evident log) are built on top of it.
//!
//! No `unsafe` code is permitted at the crate level.

#![deny(unsafe_code)]

pub mod automaton;
pub mod buffer;
pub mod error;
pub mod hash;
pub mod normalize;
pub mod schema;

pub use automaton::{Automaton, AutomatonAccept};
pub use buffer::{Buffer, GovernanceZone, SecurityLevel, MAX_BUFFER_SIZE};
pub use error::{UscnError, UscnResult};
pub use hash::{encode_pattern_hash, fingerprint32, fingerprint_hex, pattern_hash_hex, HASH_SIZE};
pub use normalize::{normalize_bounded, Normalizer, NormalizerConfig};
pub use schema::{
    FieldDescriptor, FieldDoc, FieldType, NormalizationDoc, Schema, SchemaDoc, MAX_FIELDS,
    MAX_FIELD_NAME_LEN,
};
