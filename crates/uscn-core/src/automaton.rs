//! Minimized DFA recognizer for the flat canonical object grammar (spec §4.2).
//!
//! The grammar accepted is `{}` or `{"name":"value"(,"name":"value")*}` where
//! a name is `[a-z0-9_]+` (lowercase only — the zero-trust gate always runs
//! the normalizer's case fold before the automaton sees a buffer) and a
//! value is zero or more printable ASCII bytes excluding unescaped `"` and
//! `\`. The recognizer doubles as the message parser: accepting a buffer
//! also yields its `name -> value` map, consumed by `uscn-core::schema`.

use std::collections::HashMap;

use crate::error::{UscnError, UscnResult};
use crate::hash::{encode_pattern_hash, fingerprint32, HASH_SIZE};

type StateId = u32;

const INITIAL: StateId = 0;
const OBJECT_OPEN: StateId = 1;
const OBJECT_CONTINUE: StateId = 2;
const FIELD_NAME_START: StateId = 3;
const FIELD_NAME_BODY: StateId = 4;
const FIELD_NAME_CLOSE: StateId = 5;
const EXPECT_VALUE_QUOTE: StateId = 6;
const FIELD_VALUE: StateId = 7;
const VALUE_CLOSE: StateId = 8;
const ACCEPT: StateId = 9;
const REJECT: StateId = 10;
const NUM_STATES: usize = 11;

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_'
}

fn is_value_byte(b: u8) -> bool {
    (0x20..=0x7e).contains(&b) && b != b'"' && b != b'\\'
}

/// Build the hand-specified transition table (spec §4.2 grammar). Every
/// cell defaults to [`REJECT`]; rejection is a sink (spec's "rejection-
/// closure" requirement: once rejected, every further byte stays rejected).
fn build_table() -> Vec<[StateId; 256]> {
    let mut table = vec![[REJECT; 256]; NUM_STATES];

    table[INITIAL as usize][b'{' as usize] = OBJECT_OPEN;

    table[OBJECT_OPEN as usize][b'"' as usize] = FIELD_NAME_START;
    table[OBJECT_OPEN as usize][b'}' as usize] = ACCEPT;

    table[OBJECT_CONTINUE as usize][b'"' as usize] = FIELD_NAME_START;

    for b in 0u16..256 {
        let b = b as u8;
        if is_name_byte(b) {
            table[FIELD_NAME_START as usize][b as usize] = FIELD_NAME_BODY;
            table[FIELD_NAME_BODY as usize][b as usize] = FIELD_NAME_BODY;
        }
        if is_value_byte(b) {
            table[FIELD_VALUE as usize][b as usize] = FIELD_VALUE;
        }
    }
    table[FIELD_NAME_BODY as usize][b'"' as usize] = FIELD_NAME_CLOSE;
    table[FIELD_NAME_CLOSE as usize][b':' as usize] = EXPECT_VALUE_QUOTE;
    table[EXPECT_VALUE_QUOTE as usize][b'"' as usize] = FIELD_VALUE;
    table[FIELD_VALUE as usize][b'"' as usize] = VALUE_CLOSE;
    table[VALUE_CLOSE as usize][b',' as usize] = OBJECT_CONTINUE;
    table[VALUE_CLOSE as usize][b'}' as usize] = ACCEPT;

    // ACCEPT and REJECT are both sinks to REJECT: no byte may follow a
    // completed object, and a rejected run never recovers.
    table
}

fn accepting_states() -> Vec<bool> {
    (0..NUM_STATES).map(|s| s as StateId == ACCEPT).collect()
}

/// The result of a successful [`Automaton::run`]: the parsed `name -> value`
/// map plus the pattern hash of the consumed canonical bytes (spec §4.2,
/// §4.5).
#[derive(Debug, Clone)]
pub struct AutomatonAccept {
    pub fields: HashMap<String, String>,
    pub pattern_hash: [u8; HASH_SIZE],
}

/// The minimized DFA recognizer. Built once; the transition table and
/// accepting set never change after construction.
#[derive(Debug, Clone)]
pub struct Automaton {
    table: Vec<[StateId; 256]>,
}

impl Default for Automaton {
    fn default() -> Self {
        Self::new()
    }
}

impl Automaton {
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: build_table(),
        }
    }

    /// Run the automaton over `input`, consuming every byte. Fails
    /// `DFA_TRANSITION_FAILED` on any undefined transition or if the input
    /// ends outside [`ACCEPT`] (spec §4.2).
    pub fn run(&self, input: &[u8]) -> UscnResult<AutomatonAccept> {
        let mut state = INITIAL;
        let mut fields = HashMap::new();
        let mut name_buf = Vec::new();
        let mut value_buf = Vec::new();
        let mut pending_name: Option<String> = None;

        for (offset, &byte) in input.iter().enumerate() {
            if state == FIELD_NAME_START || state == FIELD_NAME_BODY {
                if is_name_byte(byte) {
                    name_buf.push(byte);
                }
            } else if state == FIELD_VALUE && is_value_byte(byte) {
                value_buf.push(byte);
            }

            let next = self.table[state as usize][byte as usize];
            if next == REJECT {
                return Err(UscnError::DfaTransitionFailed(format!(
                    "no transition for byte {byte:#04x} at offset {offset} in state {state}"
                )));
            }

            if next == FIELD_NAME_CLOSE {
                let name = String::from_utf8(std::mem::take(&mut name_buf)).map_err(|_| {
                    UscnError::DfaTransitionFailed("field name is not valid UTF-8".to_string())
                })?;
                pending_name = Some(name);
            }
            if next == VALUE_CLOSE {
                let name = pending_name.take().ok_or_else(|| {
                    UscnError::DfaTransitionFailed("value closed with no pending name".to_string())
                })?;
                let value = String::from_utf8(std::mem::take(&mut value_buf)).map_err(|_| {
                    UscnError::DfaTransitionFailed("field value is not valid UTF-8".to_string())
                })?;
                fields.insert(name, value);
            }

            state = next;
        }

        if state != ACCEPT {
            return Err(UscnError::DfaTransitionFailed(
                "input ended outside an accepting state".to_string(),
            ));
        }

        let fingerprint = fingerprint32(input);
        Ok(AutomatonAccept {
            fields,
            pattern_hash: encode_pattern_hash(fingerprint),
        })
    }
}

/// Hopcroft-style partition refinement: collapse states with identical
/// future behavior into one block. Returns the number of distinct blocks
/// in the minimal automaton equivalent to `table`/`accepting`. Used as a
/// structural check on [`build_table`], not on the hot validation path —
/// the hand-specified grammar above is already minimal, so this is a
/// correctness invariant, not a code path this crate executes per message.
#[must_use]
pub fn minimized_state_count(table: &[[StateId; 256]], accepting: &[bool]) -> usize {
    let n = table.len();
    let mut partition: Vec<usize> = accepting.iter().map(|&a| usize::from(a)).collect();

    loop {
        let mut signature_to_block: HashMap<Vec<usize>, usize> = HashMap::new();
        let mut new_partition = vec![0usize; n];
        for state in 0..n {
            let mut signature = Vec::with_capacity(257);
            signature.push(partition[state]);
            for &next in &table[state] {
                signature.push(partition[next as usize]);
            }
            let next_id = signature_to_block.len();
            let block = *signature_to_block.entry(signature).or_insert(next_id);
            new_partition[state] = block;
        }
        if new_partition == partition {
            break;
        }
        let distinct: std::collections::HashSet<_> = new_partition.iter().collect();
        if distinct.len() == signature_to_block.len() {
            partition = new_partition;
            break;
        }
        partition = new_partition;
    }

    partition
        .iter()
        .collect::<std::collections::HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_empty_object() {
        let automaton = Automaton::new();
        let accept = automaton.run(b"{}").unwrap();
        assert!(accept.fields.is_empty());
    }

    #[test]
    fn accepts_and_parses_single_field() {
        let automaton = Automaton::new();
        let accept = automaton.run(br#"{"id":"42"}"#).unwrap();
        assert_eq!(accept.fields.get("id"), Some(&"42".to_string()));
    }

    #[test]
    fn accepts_and_parses_multiple_fields() {
        let automaton = Automaton::new();
        let accept = automaton
            .run(br#"{"id":"42","name":"widget"}"#)
            .unwrap();
        assert_eq!(accept.fields.get("id"), Some(&"42".to_string()));
        assert_eq!(accept.fields.get("name"), Some(&"widget".to_string()));
    }

    #[test]
    fn rejects_trailing_comma() {
        let automaton = Automaton::new();
        let err = automaton.run(br#"{"id":"42",}"#).unwrap_err();
        assert_eq!(err.kind(), "DFA_TRANSITION_FAILED");
    }

    #[test]
    fn rejects_empty_field_name() {
        let automaton = Automaton::new();
        let err = automaton.run(br#"{"":"42"}"#).unwrap_err();
        assert_eq!(err.kind(), "DFA_TRANSITION_FAILED");
    }

    #[test]
    fn rejects_unescaped_quote_in_value() {
        let automaton = Automaton::new();
        let err = automaton.run(br#"{"id":"4"2"}"#).unwrap_err();
        assert_eq!(err.kind(), "DFA_TRANSITION_FAILED");
    }

    #[test]
    fn rejects_trailing_bytes_after_close() {
        let automaton = Automaton::new();
        let err = automaton.run(br#"{"id":"42"}garbage"#).unwrap_err();
        assert_eq!(err.kind(), "DFA_TRANSITION_FAILED");
    }

    #[test]
    fn rejects_truncated_input() {
        let automaton = Automaton::new();
        let err = automaton.run(br#"{"id":"42""#).unwrap_err();
        assert_eq!(err.kind(), "DFA_TRANSITION_FAILED");
    }

    #[test]
    fn empty_value_is_accepted() {
        let automaton = Automaton::new();
        let accept = automaton.run(br#"{"note":""}"#).unwrap();
        assert_eq!(accept.fields.get("note"), Some(&String::new()));
    }

    #[test]
    fn pattern_hash_is_deterministic_for_equal_input() {
        let automaton = Automaton::new();
        let a = automaton.run(br#"{"id":"1"}"#).unwrap();
        let b = automaton.run(br#"{"id":"1"}"#).unwrap();
        assert_eq!(a.pattern_hash, b.pattern_hash);
    }

    #[test]
    fn pattern_hash_differs_for_different_input() {
        let automaton = Automaton::new();
        let a = automaton.run(br#"{"id":"1"}"#).unwrap();
        let b = automaton.run(br#"{"id":"2"}"#).unwrap();
        assert_ne!(a.pattern_hash, b.pattern_hash);
    }

    #[test]
    fn hand_built_grammar_table_is_already_minimal() {
        let table = build_table();
        let accepting = accepting_states();
        // REJECT is reachable and behaviorally distinct from every other
        // state (it is the only non-accepting sink); every other state has
        // a distinguishing suffix by construction, so no further collapse
        // is possible: minimizing should return exactly NUM_STATES blocks.
        assert_eq!(minimized_state_count(&table, &accepting), NUM_STATES);
    }

    #[test]
    fn minimization_is_idempotent() {
        let table = build_table();
        let accepting = accepting_states();
        let first = minimized_state_count(&table, &accepting);
        let second = minimized_state_count(&table, &accepting);
        assert_eq!(first, second);
    }

    #[test]
    fn minimization_collapses_duplicate_dead_states() {
        // Two REJECT-equivalent extra sink states appended to the grammar
        // table must collapse into the existing REJECT block.
        let mut table = build_table();
        let mut accepting = accepting_states();
        table.push([REJECT; 256]);
        table.push([REJECT; 256]);
        accepting.push(false);
        accepting.push(false);
        assert_eq!(minimized_state_count(&table, &accepting), NUM_STATES);
    }
}
