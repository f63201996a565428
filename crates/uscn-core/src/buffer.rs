//! Owned byte container with length, capacity, and admission status flags.
//!
//! A [`Buffer`] is created by the caller, mutably borrowed into
//! [`crate`]-level and `uscn-membrane` validation calls, and never retained
//! by the validator across calls (spec §3, Ownership).

use crate::error::{UscnError, UscnResult};
use crate::hash::HASH_SIZE;

/// Hard resource cap on buffer length (spec §5).
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Buffer security classification. Total order: `NONE < LOW < MEDIUM < HIGH
/// < CRITICAL` (spec §3). The core only enforces the upper bound
/// (`security_level <= CRITICAL`, which is always true for this type) —
/// per spec §9 open question (b), finer policy branching on this field is
/// left to a future extension; `Ord` is derived so that extension needs no
/// data model change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum SecurityLevel {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

/// Governance zone assigned by the cost evaluator (spec §4.4). `Governance`
/// is always rejecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GovernanceZone {
    Autonomous,
    Warning,
    Governance,
}

impl GovernanceZone {
    /// Classify a cost value into its zone (spec §3: `AUTONOMOUS` <= 0.5,
    /// `WARNING` in (0.5, 0.6], `GOVERNANCE` > 0.6).
    #[must_use]
    pub fn classify(cost_value: f64) -> Self {
        if cost_value <= 0.5 {
            Self::Autonomous
        } else if cost_value <= 0.6 {
            Self::Warning
        } else {
            Self::Governance
        }
    }

    /// `GOVERNANCE` is always rejecting (spec §3).
    #[must_use]
    pub const fn is_rejecting(self) -> bool {
        matches!(self, Self::Governance)
    }
}

/// Owned byte container with capacity, status flags, and the fields the
/// cost evaluator and automaton populate as validation progresses.
#[derive(Debug, Clone)]
pub struct Buffer {
    data: Vec<u8>,
    max_size: usize,
    security_level: SecurityLevel,
    normalized: bool,
    validated: bool,
    cost_value: f64,
    governance_zone: Option<GovernanceZone>,
    pattern_hash: Option<[u8; HASH_SIZE]>,
}

impl Buffer {
    /// Construct a buffer from raw bytes. Fails `INVALID_INPUT` if
    /// `max_size` exceeds [`MAX_BUFFER_SIZE`], and `BUFFER_OVERFLOW` if
    /// `data.len() > max_size` (spec §3: `length <= max_size`).
    pub fn new(data: Vec<u8>, max_size: usize, security_level: SecurityLevel) -> UscnResult<Self> {
        if max_size > MAX_BUFFER_SIZE {
            return Err(UscnError::InvalidInput(format!(
                "max_size {max_size} exceeds MAX_BUFFER_SIZE {MAX_BUFFER_SIZE}"
            )));
        }
        if data.len() > max_size {
            return Err(UscnError::BufferOverflow(format!(
                "length {} exceeds max_size {max_size}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            max_size,
            security_level,
            normalized: false,
            validated: false,
            cost_value: 0.0,
            governance_zone: None,
            pattern_hash: None,
        })
    }

    /// Convenience constructor: `max_size = MAX_BUFFER_SIZE`, `security_level
    /// = NONE`.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> UscnResult<Self> {
        Self::new(data.into(), MAX_BUFFER_SIZE, SecurityLevel::None)
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn length(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    #[must_use]
    pub fn security_level(&self) -> SecurityLevel {
        self.security_level
    }

    #[must_use]
    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    #[must_use]
    pub fn is_validated(&self) -> bool {
        self.validated
    }

    #[must_use]
    pub fn cost_value(&self) -> f64 {
        self.cost_value
    }

    #[must_use]
    pub fn governance_zone(&self) -> Option<GovernanceZone> {
        self.governance_zone
    }

    #[must_use]
    pub fn pattern_hash(&self) -> Option<[u8; HASH_SIZE]> {
        self.pattern_hash
    }

    /// Replace the buffer's bytes with the normalizer's canonical output and
    /// set `normalized = true`. Fails `NORMALIZATION_FAILED` if the output
    /// would exceed `max_size` or is empty (spec §4.1).
    pub fn set_normalized(&mut self, canonical: Vec<u8>) -> UscnResult<()> {
        if canonical.is_empty() {
            return Err(UscnError::NormalizationFailed(
                "canonical output is empty".to_string(),
            ));
        }
        if canonical.len() > self.max_size {
            return Err(UscnError::NormalizationFailed(format!(
                "canonical output length {} exceeds max_size {}",
                canonical.len(),
                self.max_size
            )));
        }
        self.data = canonical;
        self.normalized = true;
        Ok(())
    }

    /// Record the automaton's accept outcome (spec §4.2): `pattern_hash` is
    /// set iff the automaton has accepted.
    pub fn set_pattern_hash(&mut self, pattern_hash: [u8; HASH_SIZE]) {
        self.pattern_hash = Some(pattern_hash);
    }

    /// Record the cost evaluator's outcome (spec §4.4).
    pub fn set_cost(&mut self, cost_value: f64, zone: GovernanceZone) {
        self.cost_value = cost_value;
        self.governance_zone = Some(zone);
    }

    /// Mark the buffer validated. Per spec §3's invariant
    /// (`validated ⇒ normalized ∧ cost_value >= 0 ∧ zone != GOVERNANCE`),
    /// this only succeeds once every prerequisite has actually been recorded.
    pub fn mark_validated(&mut self) -> UscnResult<()> {
        if !self.normalized {
            return Err(UscnError::ValidationFailed(
                "cannot validate an unnormalized buffer".to_string(),
            ));
        }
        let zone = self.governance_zone.ok_or_else(|| {
            UscnError::ValidationFailed("cannot validate before cost evaluation".to_string())
        })?;
        if zone.is_rejecting() {
            return Err(UscnError::SinphaseViolation(
                "governance zone is rejecting".to_string(),
            ));
        }
        if self.cost_value < 0.0 {
            return Err(UscnError::NumericalInstability(
                "cost_value is negative".to_string(),
            ));
        }
        self.validated = true;
        Ok(())
    }

    /// Structural check (spec §4.3 step 1): `length > 0`, `length <=
    /// MAX_BUFFER_SIZE`, `security_level <= CRITICAL`.
    pub fn check_structural(&self) -> UscnResult<()> {
        if self.data.is_empty() {
            return Err(UscnError::InvalidInput("buffer is empty".to_string()));
        }
        if self.data.len() > MAX_BUFFER_SIZE {
            return Err(UscnError::BufferOverflow(format!(
                "length {} exceeds MAX_BUFFER_SIZE {MAX_BUFFER_SIZE}",
                self.data.len()
            )));
        }
        if self.security_level > SecurityLevel::Critical {
            return Err(UscnError::ValidationFailed(
                "security_level exceeds CRITICAL".to_string(),
            ));
        }
        Ok(())
    }
}
