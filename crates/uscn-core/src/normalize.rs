//! USCN — the canonical-form reducer (spec §4.1).
//!
//! Three fixed-order phases: longest-match-first multi-byte mapping, ASCII
//! case folding, whitespace folding. The ordering is load-bearing (spec
//! §4.1 "Ordering rationale"): mapping runs first because some mapping keys
//! contain hex letters whose case the longest-match rule already normalizes;
//! whitespace folding runs last so that mappings which *produce* whitespace
//! (`%20 -> ' '`) participate in the final collapse.

use crate::error::UscnResult;

/// One `(encoded, canonical)` entry of the mapping table. Both sides are
/// plain byte strings; the canonical side need not be shorter in bytes
/// (`../` is 3 bytes, same as `%2f`, `%c0%af`, `%c0%ae` collapse inputs
/// larger than 3 bytes down to 1 or 3) but is always a reduction of the
/// input's *equivalence class*, per spec §3's canonical-table contract.
#[derive(Debug, Clone, Copy)]
struct MappingEntry {
    encoded: &'static [u8],
    canonical: &'static [u8],
}

/// The required minimum mapping table (spec §4.1), longest-match-first.
/// Hex digits in `encoded` are matched case-insensitively (see
/// [`hex_insensitive_eq`]); every other byte matches literally.
const MAPPING_TABLE: &[MappingEntry] = &[
    MappingEntry {
        encoded: b"%2e%2e%2f",
        canonical: b"../",
    },
    MappingEntry {
        encoded: b"%2e%2e/",
        canonical: b"../",
    },
    MappingEntry {
        encoded: b".%2e/",
        canonical: b"../",
    },
    MappingEntry {
        encoded: b"%c0%af",
        canonical: b"../",
    },
    MappingEntry {
        encoded: b"%c0%ae",
        canonical: b".",
    },
    MappingEntry {
        encoded: b"%20",
        canonical: b" ",
    },
    MappingEntry {
        encoded: b"%2f",
        canonical: b"/",
    },
    MappingEntry {
        encoded: b"%2e",
        canonical: b".",
    },
];

const WHITESPACE: &[u8] = b" \t\r\n\x0b\x0c";

fn is_whitespace(b: u8) -> bool {
    WHITESPACE.contains(&b)
}

/// Compare one encoded-pattern byte against one input byte: hex digits fold
/// case, everything else must match exactly (spec §4.1: "table is
/// case-insensitive on hex digits").
fn hex_insensitive_eq(input_byte: u8, pattern_byte: u8) -> bool {
    if pattern_byte.is_ascii_hexdigit() && input_byte.is_ascii_hexdigit() {
        input_byte.to_ascii_lowercase() == pattern_byte.to_ascii_lowercase()
    } else {
        input_byte == pattern_byte
    }
}

fn match_entry_at(input: &[u8], pos: usize, entry: &MappingEntry) -> bool {
    let pattern = entry.encoded;
    if pos + pattern.len() > input.len() {
        return false;
    }
    input[pos..pos + pattern.len()]
        .iter()
        .zip(pattern.iter())
        .all(|(&i, &p)| hex_insensitive_eq(i, p))
}

/// One step of the mapping pass, recorded for [`NormalizationTrace`].
#[derive(Debug, Clone)]
pub struct MappingStep {
    /// Byte offset in the *input to the mapping pass* where the match started.
    pub offset: usize,
    /// Length, in input bytes, of the matched span.
    pub matched_len: usize,
    /// Canonical bytes emitted for this span.
    pub canonical: Vec<u8>,
}

/// Diagnostic record of how an input normalized, for CLI `--verbose` output
/// and the conformance harness. Purely observational: it never changes the
/// normalized bytes (spec §4.1 defines those independent of the trace).
#[derive(Debug, Clone, Default)]
pub struct NormalizationTrace {
    pub mapping_steps: Vec<MappingStep>,
}

/// Construction-time knobs for the normalizer (spec §3, Normalizer state).
/// Read-only once built into a [`Normalizer`].
#[derive(Debug, Clone, Copy)]
pub struct NormalizerConfig {
    /// `false` (default) folds ASCII A-Z to a-z.
    pub case_sensitive: bool,
    /// `true` (default) collapses whitespace runs to a single space and
    /// strips one trailing space.
    pub whitespace_fold: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            whitespace_fold: true,
        }
    }
}

/// The canonical-form reducer. Constructed once, read-only thereafter
/// (spec §3, Normalizer state lifecycle).
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    #[must_use]
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Reduce `input` to its canonical equivalence-class representative
    /// (spec §4.1). Never fails on its own; emptiness/size failures are
    /// surfaced by [`crate::buffer::Buffer::set_normalized`], which is the
    /// sole place `max_size` is known.
    #[must_use]
    pub fn normalize(&self, input: &[u8]) -> Vec<u8> {
        let mut out = self.mapping_pass(input, None);
        if !self.config.case_sensitive {
            fold_case(&mut out);
        }
        if self.config.whitespace_fold {
            out = fold_whitespace(&out);
        }
        out
    }

    /// Same as [`normalize`](Self::normalize) but also records a
    /// [`NormalizationTrace`] of the mapping-pass steps (spec §4.1
    /// supplement: diagnostics).
    #[must_use]
    pub fn normalize_with_trace(&self, input: &[u8]) -> (Vec<u8>, NormalizationTrace) {
        let mut trace = NormalizationTrace::default();
        let mut out = self.mapping_pass(input, Some(&mut trace));
        if !self.config.case_sensitive {
            fold_case(&mut out);
        }
        if self.config.whitespace_fold {
            out = fold_whitespace(&out);
        }
        (out, trace)
    }

    fn mapping_pass(&self, input: &[u8], mut trace: Option<&mut NormalizationTrace>) -> Vec<u8> {
        let mut out = Vec::with_capacity(input.len());
        let mut pos = 0;
        while pos < input.len() {
            match MAPPING_TABLE
                .iter()
                .find(|entry| match_entry_at(input, pos, entry))
            {
                Some(entry) => {
                    out.extend_from_slice(entry.canonical);
                    if let Some(trace) = trace.as_deref_mut() {
                        trace.mapping_steps.push(MappingStep {
                            offset: pos,
                            matched_len: entry.encoded.len(),
                            canonical: entry.canonical.to_vec(),
                        });
                    }
                    pos += entry.encoded.len();
                }
                None => {
                    out.push(input[pos]);
                    pos += 1;
                }
            }
        }
        out
    }
}

fn fold_case(bytes: &mut [u8]) {
    for byte in bytes {
        byte.make_ascii_lowercase();
    }
}

fn fold_whitespace(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut run = false;
    for &byte in input {
        if is_whitespace(byte) {
            if !run {
                out.push(b' ');
                run = true;
            }
        } else {
            out.push(byte);
            run = false;
        }
    }
    if out.last() == Some(&b' ') {
        out.pop();
    }
    out
}

/// Top-level entry point used by `uscn-membrane`'s zero-trust gate: reduce
/// `input` and fail `NORMALIZATION_FAILED` per the empty/oversize rules in
/// spec §4.1, bounded by `max_size`.
pub fn normalize_bounded(
    normalizer: &Normalizer,
    input: &[u8],
    max_size: usize,
) -> UscnResult<Vec<u8>> {
    let canonical = normalizer.normalize(input);
    if canonical.is_empty() {
        return Err(crate::error::UscnError::NormalizationFailed(
            "canonical output is empty".to_string(),
        ));
    }
    if canonical.len() > max_size {
        return Err(crate::error::UscnError::NormalizationFailed(format!(
            "canonical output length {} exceeds max_size {max_size}",
            canonical.len()
        )));
    }
    Ok(canonical)
}
