//! Zero-trust enforcement policy.
//!
//! The policy is resolved once, from the `USCN_ENFORCEMENT` environment
//! variable, and cached — the same non-blocking atomic state machine the
//! upstream membrane config used, so that resolving the environment variable
//! on a reentrant call path can never deadlock. A [`Validator`](crate::validator::Validator)
//! is always constructed with an explicit [`EnforcementPolicy`]; callers that
//! don't care what the ambient default is should read it once via
//! [`resolved_policy`] and pass it through, rather than have validation
//! silently consult the environment per call.

use std::sync::atomic::{AtomicU8, Ordering};

use uscn_core::error::{UscnError, UscnResult};

/// Whether the zero-trust gate may normalize an unnormalized buffer inline,
/// or must reject it outright (spec §3, §9 open question (a)).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnforcementPolicy {
    /// Normalize an unnormalized buffer as part of validation.
    #[default]
    NormalizeInline,
    /// Reject any buffer that has not already been normalized by the caller.
    RejectUnnormalized,
}

impl EnforcementPolicy {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "reject" | "reject_unnormalized" | "strict" => Self::RejectUnnormalized,
            _ => Self::NormalizeInline,
        }
    }

    #[must_use]
    pub const fn normalizes_inline(self) -> bool {
        matches!(self, Self::NormalizeInline)
    }
}

// Atomic cache: 0=unresolved, 1=NormalizeInline, 2=RejectUnnormalized, 255=resolving.
static CACHED_POLICY: AtomicU8 = AtomicU8::new(0);

const POLICY_UNRESOLVED: u8 = 0;
const POLICY_INLINE: u8 = 1;
const POLICY_REJECT: u8 = 2;
const POLICY_RESOLVING: u8 = 255;

fn policy_to_u8(policy: EnforcementPolicy) -> u8 {
    match policy {
        EnforcementPolicy::NormalizeInline => POLICY_INLINE,
        EnforcementPolicy::RejectUnnormalized => POLICY_REJECT,
    }
}

fn u8_to_policy(v: u8) -> EnforcementPolicy {
    match v {
        POLICY_REJECT => EnforcementPolicy::RejectUnnormalized,
        _ => EnforcementPolicy::NormalizeInline,
    }
}

/// Resolve the ambient default policy (reads `USCN_ENFORCEMENT` on first
/// call, caches thereafter). Used by the CLI to pick a default when no
/// `--no-zero-trust`-family flag overrides it; validators themselves are
/// always constructed with an explicit policy.
#[must_use]
pub fn resolved_policy() -> EnforcementPolicy {
    let cached = CACHED_POLICY.load(Ordering::Relaxed);
    if cached != POLICY_UNRESOLVED && cached != POLICY_RESOLVING {
        return u8_to_policy(cached);
    }
    if cached == POLICY_RESOLVING {
        return EnforcementPolicy::NormalizeInline;
    }
    if CACHED_POLICY
        .compare_exchange(
            POLICY_UNRESOLVED,
            POLICY_RESOLVING,
            Ordering::SeqCst,
            Ordering::Relaxed,
        )
        .is_err()
    {
        let v = CACHED_POLICY.load(Ordering::Relaxed);
        return if v != POLICY_UNRESOLVED && v != POLICY_RESOLVING {
            u8_to_policy(v)
        } else {
            EnforcementPolicy::NormalizeInline
        };
    }
    let policy = std::env::var("USCN_ENFORCEMENT")
        .map(|v| EnforcementPolicy::from_str_loose(&v))
        .unwrap_or_default();
    CACHED_POLICY.store(policy_to_u8(policy), Ordering::Release);
    policy
}

/// Construction-time configuration for a [`Validator`](crate::validator::Validator)
/// (spec §3, §4.3, §4.4).
#[derive(Debug, Clone, Copy)]
pub struct ValidatorConfig {
    pub enforcement_policy: EnforcementPolicy,
    /// Cost weight on the KL-divergence term (spec §4.4, default `0.5`).
    pub alpha: f64,
    /// Cost weight on the entropy-delta term (spec §4.4, default `0.5`).
    pub beta: f64,
    /// Normalizer knob (spec §3, Normalizer state): `false` (default) folds
    /// ASCII case. Fed from a YAML schema's `normalization.case_sensitivity`
    /// (negated) when loaded via `uscn-cli::schema_yaml`.
    pub case_sensitive: bool,
    /// Normalizer knob (spec §3): `true` (default) collapses whitespace runs.
    pub whitespace_fold: bool,
    /// Caller requests the zero-trust gate not reject an unnormalized buffer
    /// under [`EnforcementPolicy::RejectUnnormalized`] — the CLI's
    /// `--no-zero-trust` flag sets this. Normalization itself (spec §4.3
    /// step 3) still always runs; this only waives the gate's *rejection*.
    pub disable_zero_trust: bool,
    /// `true` if this validator's profile forbids `disable_zero_trust`
    /// (spec §4.3 Construction constraints). Checked once at
    /// [`Validator::new`](crate::validator::Validator::new); `false` by
    /// default, matching spec §4.3 step 2's permissive default.
    pub profile_forbids_disabling_zero_trust: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            enforcement_policy: EnforcementPolicy::default(),
            alpha: 0.5,
            beta: 0.5,
            case_sensitive: false,
            whitespace_fold: true,
            disable_zero_trust: false,
            profile_forbids_disabling_zero_trust: false,
        }
    }
}

/// Tolerance on the `alpha + beta <= 1` constraint (spec §6).
const WEIGHT_SUM_TOLERANCE: f64 = 1e-4;

impl ValidatorConfig {
    /// Validate the `(alpha, beta)` weights against spec §6's construction
    /// constraint: each in `[0,1]`, summing to no more than `1 + 1e-4`.
    /// Fails `NUMERICAL_INSTABILITY` otherwise (spec §8 scenario S5).
    pub fn check_weights(&self) -> UscnResult<()> {
        if !(0.0..=1.0).contains(&self.alpha) || !(0.0..=1.0).contains(&self.beta) {
            return Err(UscnError::NumericalInstability(format!(
                "alpha ({}) and beta ({}) must each lie in [0,1]",
                self.alpha, self.beta
            )));
        }
        if self.alpha + self.beta > 1.0 + WEIGHT_SUM_TOLERANCE {
            return Err(UscnError::NumericalInstability(format!(
                "alpha + beta ({}) exceeds 1 + {WEIGHT_SUM_TOLERANCE}",
                self.alpha + self.beta
            )));
        }
        Ok(())
    }

    /// Validate the zero-trust override against this profile's permission
    /// (spec §4.3 Construction constraints). Fails `ZERO_TRUST_VIOLATION` if
    /// the caller requests `disable_zero_trust` on a profile that forbids it.
    pub fn check_zero_trust_override(&self) -> UscnResult<()> {
        if self.disable_zero_trust && self.profile_forbids_disabling_zero_trust {
            return Err(UscnError::ZeroTrustViolation(
                "this profile forbids disabling the zero-trust gate".to_string(),
            ));
        }
        Ok(())
    }
}
