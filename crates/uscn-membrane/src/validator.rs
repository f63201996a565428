//! Seven-step validation orchestrator (spec §4.3).
//!
//! `Validator::validate` runs, in order: (1) structural check, (2) the
//! zero-trust gate (reject an unnormalized buffer outright, or let it
//! through, per [`EnforcementPolicy`](crate::config::EnforcementPolicy) and
//! `ValidatorConfig::disable_zero_trust`), (3) normalization — unconditional,
//! not just the inline fallback of an un-gated buffer — (4) automaton
//! recognition and field parsing, (5) schema-directed field validation, (6)
//! cost evaluation and governance-zone classification, (7) marking the
//! buffer validated (which itself enforces the invariant chain — see
//! [`uscn_core::buffer::Buffer::mark_validated`]), and (8) an audit entry for
//! the outcome, success or failure (spec §3 ownership, §7: "the validator
//! must not report SUCCESS if the audit write failed"). The validator owns
//! its audit handle outright: [`Validator::new`] gives it a
//! [`discard`](AuditLog::discard)-backed one so the step can never be
//! skipped even when nobody asked for a durable trail, and
//! [`Validator::with_audit_log`] swaps in a real [`AuditLog::init`] handle
//! for a caller that wants one (see `uscn-cli`).

use std::collections::HashMap;

use uscn_audit::AuditLog;
use uscn_core::buffer::Buffer;
use uscn_core::buffer::GovernanceZone;
use uscn_core::error::{UscnError, UscnResult};
use uscn_core::normalize::{normalize_bounded, Normalizer, NormalizerConfig};
use uscn_core::schema::Schema;
use uscn_core::Automaton;

use crate::config::{EnforcementPolicy, ValidatorConfig};
use crate::cost::{CostBreakdown, CostEvaluator};

/// Everything a successful [`Validator::validate`] produced: the parsed
/// fields, the pattern hash, the cost breakdown, and the governance zone
/// (spec §4.3's closing state, mirrored onto the buffer itself).
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub fields: HashMap<String, String>,
    pub pattern_hash: [u8; uscn_core::hash::HASH_SIZE],
    pub cost: CostBreakdown,
    pub governance_zone: GovernanceZone,
}

/// Orchestrates normalization, recognition, schema checks, cost evaluation,
/// and audit logging against one fixed [`Schema`] (spec §3: "schema loaded
/// once", "the validator exclusively owns its normalizer, automaton,
/// schema, and audit handle").
pub struct Validator {
    schema: Schema,
    normalizer: Normalizer,
    automaton: Automaton,
    cost_evaluator: CostEvaluator,
    config: ValidatorConfig,
    audit: AuditLog,
}

impl Validator {
    /// Construct a validator against a fixed `schema` and `config`, owning a
    /// [`discard`](AuditLog::discard)-backed audit log — every call still
    /// writes an audit entry, it simply has nowhere durable to land unless
    /// the caller asked for one (see [`Validator::with_audit_log`]). Fails
    /// `NUMERICAL_INSTABILITY` if `config`'s `(alpha, beta)` weights violate
    /// spec §6's construction constraint (spec §8 scenario S5).
    pub fn new(schema: Schema, config: ValidatorConfig) -> UscnResult<Self> {
        let audit = AuditLog::discard(default_session_id())?;
        Self::with_audit_log(schema, config, audit)
    }

    /// Construct a validator that writes its mandatory audit entries through
    /// `audit` (e.g. a disk-backed [`AuditLog::init`] handle), rather than
    /// the `discard`-backed one [`Validator::new`] builds on its own.
    pub fn with_audit_log(
        schema: Schema,
        config: ValidatorConfig,
        audit: AuditLog,
    ) -> UscnResult<Self> {
        config.check_weights()?;
        config.check_zero_trust_override()?;
        Ok(Self {
            schema,
            normalizer: Normalizer::new(NormalizerConfig {
                case_sensitive: config.case_sensitive,
                whitespace_fold: config.whitespace_fold,
            }),
            automaton: Automaton::new(),
            cost_evaluator: CostEvaluator::new(config.alpha, config.beta),
            config,
            audit,
        })
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn config(&self) -> ValidatorConfig {
        self.config
    }

    /// The audit handle this validator owns, for a caller that wants to
    /// close out the session (e.g. call [`AuditLog::cleanup`]) after the
    /// last `validate` call.
    #[must_use]
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Run the full validation pipeline against `buffer`, mutating it with
    /// each step's outcome, and write exactly one audit entry for the
    /// result before returning (spec §4.3 step 7, §7). Returns `Err` at the
    /// first failing step; the buffer's partial state (e.g. `normalized`
    /// having already flipped to `true`) is left as-is, since callers that
    /// catch an error are expected to discard the buffer rather than retry
    /// in place (spec §7). If the audit write itself fails, that failure
    /// replaces whatever the pipeline produced: a successful validation is
    /// never reported unless its audit entry was durably written.
    pub fn validate(&self, buffer: &mut Buffer) -> UscnResult<ValidationOutcome> {
        let result = self.run_pipeline(buffer);
        match &result {
            Ok(outcome) => self.audit.log("VALIDATE", Some(outcome.pattern_hash), "OK")?,
            Err(err) => self.audit.log("VALIDATE_REJECTED", None, err.kind())?,
        };
        result
    }

    fn run_pipeline(&self, buffer: &mut Buffer) -> UscnResult<ValidationOutcome> {
        buffer.check_structural()?;

        if !buffer.is_normalized()
            && !self.config.disable_zero_trust
            && self.config.enforcement_policy == EnforcementPolicy::RejectUnnormalized
        {
            return Err(UscnError::ZeroTrustViolation(
                "buffer must be normalized before validation".to_string(),
            ));
        }

        // Normalization is mandatory and unconditional (spec §4.3 step 3):
        // the gate above only governs whether an unnormalized buffer is
        // rejected outright, never whether normalization itself runs. Safe
        // to re-run on an already-normalized buffer by idempotence.
        let canonical = normalize_bounded(&self.normalizer, buffer.data(), buffer.max_size())?;
        buffer.set_normalized(canonical)?;

        let accept = self.automaton.run(buffer.data())?;
        buffer.set_pattern_hash(accept.pattern_hash);

        self.schema.validate_values(&accept.fields)?;

        let cost = self.cost_evaluator.evaluate(buffer.data());
        if !cost.cost_value.is_finite() || !cost.kl_divergence.is_finite() || !cost.entropy_delta.is_finite() {
            return Err(UscnError::NumericalInstability(
                "cost evaluation produced a non-finite value".to_string(),
            ));
        }
        let zone = GovernanceZone::classify(cost.cost_value);
        buffer.set_cost(cost.cost_value, zone);

        buffer.mark_validated()?;

        Ok(ValidationOutcome {
            fields: accept.fields,
            pattern_hash: accept.pattern_hash,
            cost,
            governance_zone: zone,
        })
    }
}

fn default_session_id() -> String {
    let pid = std::process::id();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("validator_{pid}_{nanos}")
}
