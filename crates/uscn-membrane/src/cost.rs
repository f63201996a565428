//! Admission cost evaluator (spec §4.4).
//!
//! `C = alpha * KL(P || Q) + beta * delta_H` over two discrete distributions
//! built from the first `k = min(n, 16)` bytes of the (already normalized)
//! buffer: `P_i = (b_i + 1) / Z` weights each of those `k` byte positions by
//! its own value (Laplace-shifted so a zero byte never collapses a bucket to
//! probability zero), and `Q` is uniform `1/k`. `delta_H` is the absolute
//! entropy deviation between `P` and `Q`. This is the same information-
//! geometry shape as a divergence-from-baseline controller monitor: a fixed
//! reference distribution, an observed one, and a scalar distance between
//! them gating admission.

/// Epsilon floor for `Q_i` inside the KL ratio (spec §4.4): guards against a
/// division by zero without perturbing `Q`'s own value anywhere else.
const EPSILON: f64 = 1e-12;

/// Cap on the number of leading bytes considered (spec §4.4: `k = min(n,
/// 16)`).
const MAX_ALPHABET: usize = 16;

/// Per-field breakdown of a cost evaluation, for `--verbose` CLI output and
/// the conformance harness (spec §4.4 supplement).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostBreakdown {
    pub kl_divergence: f64,
    pub entropy_delta: f64,
    pub cost_value: f64,
    pub alpha: f64,
    pub beta: f64,
}

/// Build `P` over the first `k` bytes of `bytes`: `P_i = (b_i + 1) / Z`.
fn leading_byte_distribution(bytes: &[u8]) -> Vec<f64> {
    let k = bytes.len().min(MAX_ALPHABET);
    let weights: Vec<f64> = bytes[..k].iter().map(|&b| f64::from(b) + 1.0).collect();
    let z: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / z).collect()
}

/// The uniform reference distribution `Q` over the same `k` symbols.
fn uniform_reference(k: usize) -> Vec<f64> {
    vec![1.0 / k as f64; k]
}

fn shannon_entropy(p: &[f64]) -> f64 {
    -p.iter()
        .filter(|&&pi| pi > 0.0)
        .map(|&pi| pi * pi.log2())
        .sum::<f64>()
}

fn kl_divergence(p: &[f64], q: &[f64]) -> f64 {
    p.iter()
        .zip(q.iter())
        .filter(|&(&pi, _)| pi > 0.0)
        .map(|(&pi, &qi)| pi * (pi / qi.max(EPSILON)).log2())
        .sum()
}

/// Evaluates admission cost for normalized buffers (spec §4.4). Holds the
/// `alpha`/`beta` weights; stateless otherwise, safe to share across
/// threads.
#[derive(Debug, Clone, Copy)]
pub struct CostEvaluator {
    alpha: f64,
    beta: f64,
}

impl CostEvaluator {
    #[must_use]
    pub fn new(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }

    /// Evaluate the admission cost of `bytes` (the buffer's canonical form).
    /// `bytes` must be non-empty; the validator never calls this before
    /// normalization has guaranteed that (spec §4.1).
    #[must_use]
    pub fn evaluate(&self, bytes: &[u8]) -> CostBreakdown {
        debug_assert!(!bytes.is_empty(), "cost evaluator requires n >= 1");
        let k = bytes.len().min(MAX_ALPHABET).max(1);
        let p = leading_byte_distribution(bytes);
        let q = uniform_reference(k);
        let kl_divergence = kl_divergence(&p, &q).max(0.0);
        let entropy_delta = (shannon_entropy(&p) - shannon_entropy(&q)).abs();
        let cost_value = self.alpha * kl_divergence + self.beta * entropy_delta;
        CostBreakdown {
            kl_divergence,
            entropy_delta,
            cost_value,
            alpha: self.alpha,
            beta: self.beta,
        }
    }
}

impl Default for CostEvaluator {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_leading_bytes_match_the_uniform_reference() {
        // Every byte in [0, k) is the same value, so P collapses to uniform
        // too (spec §8 property 5, cost identity).
        let evaluator = CostEvaluator::default();
        let bytes = vec![b'a'; 16];
        let breakdown = evaluator.evaluate(&bytes);
        assert!(breakdown.kl_divergence < 1e-9, "{breakdown:?}");
        assert!(breakdown.entropy_delta < 1e-9, "{breakdown:?}");
        assert!(breakdown.cost_value < 1e-9, "{breakdown:?}");
    }

    #[test]
    fn only_the_first_sixteen_bytes_are_considered() {
        let evaluator = CostEvaluator::default();
        let mut padded = vec![b'a'; 16];
        padded.extend_from_slice(&[0u8; 512]);
        let short = vec![b'a'; 16];
        assert_eq!(
            evaluator.evaluate(&padded).cost_value,
            evaluator.evaluate(&short).cost_value
        );
    }

    #[test]
    fn skewed_leading_bytes_have_higher_cost_than_uniform() {
        let evaluator = CostEvaluator::default();
        let uniform = vec![b'a'; 16];
        let skewed: Vec<u8> = (0..16u8).collect();
        let uniform_cost = evaluator.evaluate(&uniform).cost_value;
        let skewed_cost = evaluator.evaluate(&skewed).cost_value;
        assert!(skewed_cost > uniform_cost, "{skewed_cost} vs {uniform_cost}");
    }

    #[test]
    fn cost_value_is_never_negative() {
        let evaluator = CostEvaluator::default();
        for sample in [&b"a"[..], b"{\"id\":\"1\"}", &vec![0u8; 64]] {
            assert!(evaluator.evaluate(sample).cost_value >= 0.0);
        }
    }

    #[test]
    fn beta_zero_makes_cost_monotone_in_kl_divergence() {
        let low_skew = CostEvaluator::new(1.0, 0.0);
        let uniform = vec![b'a'; 16];
        let mild: Vec<u8> = vec![10, 10, 10, 10, 10, 10, 10, 10, 20, 20, 20, 20, 20, 20, 20, 20];
        let sharp: Vec<u8> = (0..16u8).collect();
        let c_uniform = low_skew.evaluate(&uniform).cost_value;
        let c_mild = low_skew.evaluate(&mild).cost_value;
        let c_sharp = low_skew.evaluate(&sharp).cost_value;
        assert!(c_uniform <= c_mild);
        assert!(c_mild <= c_sharp);
    }

    #[test]
    fn weights_scale_the_combined_cost() {
        let low = CostEvaluator::new(0.1, 0.1);
        let high = CostEvaluator::new(5.0, 5.0);
        let sample: Vec<u8> = (0..16u8).collect();
        assert!(high.evaluate(&sample).cost_value > low.evaluate(&sample).cost_value);
    }

    #[test]
    fn breakdown_echoes_configured_weights() {
        let evaluator = CostEvaluator::new(2.0, 3.0);
        let breakdown = evaluator.evaluate(b"sample");
        assert_eq!(breakdown.alpha, 2.0);
        assert_eq!(breakdown.beta, 3.0);
    }

    #[test]
    fn short_input_uses_its_own_length_as_k() {
        let evaluator = CostEvaluator::default();
        let breakdown = evaluator.evaluate(b"a");
        assert!(breakdown.kl_divergence < 1e-9, "{breakdown:?}");
    }
}
