//! Closed error taxonomy shared by every stage of the protocol engine.
//!
//! Every variant carries a stable textual kind (see [`UscnError::kind`]) plus
//! a single-line contextual message. Per the zero-trust contract, messages
//! never echo buffer contents or schema internals — only what stage failed
//! and why in general terms.

use thiserror::Error;

/// The full error taxonomy surfaced on the wire (spec §6, §7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UscnError {
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    #[error("VALIDATION_FAILED: {0}")]
    ValidationFailed(String),

    #[error("AUDIT_REQUIRED: {0}")]
    AuditRequired(String),

    #[error("ZERO_TRUST_VIOLATION: {0}")]
    ZeroTrustViolation(String),

    #[error("BUFFER_OVERFLOW: {0}")]
    BufferOverflow(String),

    #[error("NUMERICAL_INSTABILITY: {0}")]
    NumericalInstability(String),

    #[error("SINPHASE_VIOLATION: {0}")]
    SinphaseViolation(String),

    #[error("NORMALIZATION_FAILED: {0}")]
    NormalizationFailed(String),

    #[error("DFA_TRANSITION_FAILED: {0}")]
    DfaTransitionFailed(String),

    #[error("SCHEMA_MISMATCH: {0}")]
    SchemaMismatch(String),
}

impl UscnError {
    /// The stable textual kind, as it appears on the wire (spec §6).
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::ValidationFailed(_) => "VALIDATION_FAILED",
            Self::AuditRequired(_) => "AUDIT_REQUIRED",
            Self::ZeroTrustViolation(_) => "ZERO_TRUST_VIOLATION",
            Self::BufferOverflow(_) => "BUFFER_OVERFLOW",
            Self::NumericalInstability(_) => "NUMERICAL_INSTABILITY",
            Self::SinphaseViolation(_) => "SINPHASE_VIOLATION",
            Self::NormalizationFailed(_) => "NORMALIZATION_FAILED",
            Self::DfaTransitionFailed(_) => "DFA_TRANSITION_FAILED",
            Self::SchemaMismatch(_) => "SCHEMA_MISMATCH",
        }
    }
}

/// Result alias used throughout the core and membrane crates.
pub type UscnResult<T> = Result<T, UscnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_wire_taxonomy() {
        assert_eq!(
            UscnError::BufferOverflow("x".into()).kind(),
            "BUFFER_OVERFLOW"
        );
        assert_eq!(
            UscnError::SinphaseViolation("x".into()).kind(),
            "SINPHASE_VIOLATION"
        );
    }

    #[test]
    fn display_includes_kind_and_message() {
        let err = UscnError::ValidationFailed("missing field 'signature'".into());
        let rendered = err.to_string();
        assert!(rendered.starts_with("VALIDATION_FAILED:"));
        assert!(rendered.contains("missing field"));
    }
}
