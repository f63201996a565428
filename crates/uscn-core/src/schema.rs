//! Schema-directed field validation (spec §3, §4.3 step 4).
//!
//! A [`Schema`] is a closed set of [`FieldDescriptor`]s, loaded once and
//! reused across every `validate` call. Regex patterns are compiled at
//! load time (`Schema::new` / `Schema::from_doc`), never per-field-check —
//! compiling a pattern on every validated message would make the cost of
//! validation depend on how many messages arrive, which spec §4.3 forbids.

use std::collections::HashSet;

use regex::Regex;
use serde::Deserialize;

use crate::error::{UscnError, UscnResult};

/// Upper bound on the number of fields a schema may declare (spec §3).
pub const MAX_FIELDS: usize = 64;

/// Upper bound on a field name's length in bytes (spec §3).
pub const MAX_FIELD_NAME_LEN: usize = 128;

/// The wire-level scalar types a field may declare (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Uint64,
    Timestamp,
    /// Base64-encoded binary payload.
    Binary,
    /// Base64-encoded 32-byte SHA-256 digest.
    Sha256Digest,
    String,
}

impl FieldType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uint64 => "uint64",
            Self::Timestamp => "timestamp",
            Self::Binary => "binary",
            Self::Sha256Digest => "sha256_digest",
            Self::String => "string",
        }
    }

    /// Parse the wire-level type name (as it appears in a schema document).
    pub fn parse(name: &str) -> UscnResult<Self> {
        match name {
            "uint64" => Ok(Self::Uint64),
            "timestamp" => Ok(Self::Timestamp),
            "binary" => Ok(Self::Binary),
            "sha256_digest" => Ok(Self::Sha256Digest),
            "string" => Ok(Self::String),
            other => Err(UscnError::SchemaMismatch(format!(
                "unknown field type '{other}'"
            ))),
        }
    }
}

/// One field's declaration within a [`Schema`] (spec §3).
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: String,
    field_type: FieldType,
    required: bool,
    max_length: Option<usize>,
    pattern: Option<Regex>,
}

impl FieldDescriptor {
    /// Build a field descriptor, compiling `pattern` once if present. Fails
    /// `SCHEMA_MISMATCH` if the name is empty, too long, or the pattern does
    /// not compile.
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        required: bool,
        max_length: Option<usize>,
        pattern: Option<&str>,
    ) -> UscnResult<Self> {
        let name = name.into();
        if name.is_empty() || name.len() > MAX_FIELD_NAME_LEN {
            return Err(UscnError::SchemaMismatch(format!(
                "field name length {} outside (0, {MAX_FIELD_NAME_LEN}]",
                name.len()
            )));
        }
        let compiled = pattern
            .map(Regex::new)
            .transpose()
            .map_err(|e| UscnError::SchemaMismatch(format!("pattern for '{name}' invalid: {e}")))?;
        Ok(Self {
            name,
            field_type,
            required,
            max_length,
            pattern: compiled,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    #[must_use]
    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    #[must_use]
    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    /// Check a raw field value against this descriptor's type, length, and
    /// pattern constraints (spec §4.3 step 4). Does not decode base64 or hex
    /// payloads; see `uscn-membrane::validator` for full message-shape
    /// checks that dereference the automaton's parsed fields.
    pub fn check_value(&self, value: &str) -> UscnResult<()> {
        if let Some(max_length) = self.max_length {
            if value.len() > max_length {
                return Err(UscnError::SchemaMismatch(format!(
                    "field '{}' length {} exceeds max_length {max_length}",
                    self.name,
                    value.len()
                )));
            }
        }
        match self.field_type {
            FieldType::Uint64 => {
                parse_uint64(value).ok_or_else(|| {
                    UscnError::SchemaMismatch(format!(
                        "field '{}' is not a valid uint64",
                        self.name
                    ))
                })?;
            }
            FieldType::Timestamp => {
                let secs = parse_uint64(value).ok_or_else(|| {
                    UscnError::SchemaMismatch(format!(
                        "field '{}' is not a valid timestamp",
                        self.name
                    ))
                })?;
                if secs > max_future_timestamp() {
                    return Err(UscnError::SchemaMismatch(format!(
                        "field '{}' timestamp is too far in the future",
                        self.name
                    )));
                }
            }
            FieldType::Sha256Digest => {
                if value.len() != 64 || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return Err(UscnError::SchemaMismatch(format!(
                        "field '{}' is not 64 hex digits",
                        self.name
                    )));
                }
            }
            FieldType::Binary => {
                decode_base64(value).ok_or_else(|| {
                    UscnError::SchemaMismatch(format!(
                        "field '{}' is not valid base64",
                        self.name
                    ))
                })?;
            }
            FieldType::String => {}
        }
        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(value) {
                return Err(UscnError::SchemaMismatch(format!(
                    "field '{}' does not match its pattern",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// One field entry of a [`SchemaDoc`] (spec §6: YAML schema file `fields`
/// list). Plain deserialization target — no regex compilation, no
/// validation — so this crate's only YAML-adjacent dependency is `serde`
/// itself; the actual YAML parsing is the external collaborator's job
/// (spec §1), currently `uscn-cli::schema_yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    pub max_length: Option<usize>,
    /// YAML key is `validation` (spec §6); this crate's field descriptor
    /// calls it `pattern` to match spec §3's data-model vocabulary.
    pub validation: Option<String>,
}

/// The `normalization` block of a [`SchemaDoc`] (spec §6). Feeds the
/// normalizer knobs on `uscn_membrane::ValidatorConfig`; absent entirely,
/// both knobs keep [`crate::normalize::NormalizerConfig::default`]'s values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NormalizationDoc {
    #[serde(default)]
    pub case_sensitivity: Option<bool>,
    #[serde(default)]
    pub whitespace_fold: Option<bool>,
}

/// Plain deserialization target for the whole YAML schema document (spec
/// §6). `message_type`, `version`, `compliance`, `normalization`, and
/// `audit` are carried through for collaborators that want them (the CLI's
/// `--schema` echo, audit's `compliance` tag) but only `fields` feeds
/// [`Schema::from_doc`].
#[derive(Debug, Clone, Deserialize)]
pub struct SchemaDoc {
    pub message_type: String,
    pub version: String,
    #[serde(default)]
    pub compliance: Option<String>,
    #[serde(default)]
    pub normalization: NormalizationDoc,
    pub fields: Vec<FieldDoc>,
}

/// A closed, load-once set of field descriptors (spec §3, §4.3).
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    /// Build a schema from already-constructed field descriptors. Fails
    /// `SCHEMA_MISMATCH` if there are more than [`MAX_FIELDS`] or any two
    /// names collide (spec §3: "names pairwise distinct").
    pub fn new(fields: Vec<FieldDescriptor>) -> UscnResult<Self> {
        if fields.len() > MAX_FIELDS {
            return Err(UscnError::SchemaMismatch(format!(
                "schema declares {} fields, exceeds MAX_FIELDS {MAX_FIELDS}",
                fields.len()
            )));
        }
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(UscnError::SchemaMismatch(format!(
                    "duplicate field name '{}'",
                    field.name
                )));
            }
        }
        Ok(Self { fields })
    }

    /// Build a validated, regex-compiled [`Schema`] from a parsed
    /// [`SchemaDoc`] (spec §6). The YAML parser is the collaborator that
    /// yields `SchemaDoc`; this is the one place its field list is checked
    /// against the core's own invariants.
    pub fn from_doc(doc: &SchemaDoc) -> UscnResult<Self> {
        let fields = doc
            .fields
            .iter()
            .map(|f| {
                FieldDescriptor::new(
                    f.name.clone(),
                    FieldType::parse(&f.field_type)?,
                    f.required,
                    f.max_length,
                    f.validation.as_deref(),
                )
            })
            .collect::<UscnResult<Vec<_>>>()?;
        Self::new(fields)
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check every declared-required field is present in `values`, and every
    /// present field passes its own [`FieldDescriptor::check_value`] (spec
    /// §4.3 step 4). `values` is the automaton's parsed `name -> value` map.
    pub fn validate_values(
        &self,
        values: &std::collections::HashMap<String, String>,
    ) -> UscnResult<()> {
        for field in &self.fields {
            match values.get(field.name.as_str()) {
                Some(value) => field.check_value(value)?,
                None if field.required => {
                    return Err(UscnError::SchemaMismatch(format!(
                        "required field '{}' is missing",
                        field.name
                    )));
                }
                None => {}
            }
        }
        Ok(())
    }
}

/// Seconds in 365 days, used as the `timestamp` field's forward-drift
/// allowance (spec §4.3.1: "a `uint64` whose value is <= current wall-clock
/// seconds + 365*86400").
const TIMESTAMP_FUTURE_SLACK_SECS: u64 = 365 * 86_400;

/// `now + 365 days`, the upper bound a `timestamp` field's value must not
/// exceed (spec §4.3.1).
fn max_future_timestamp() -> u64 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    now.saturating_add(TIMESTAMP_FUTURE_SLACK_SECS)
}

/// Parse a `uint64` field value per spec §4.3.1: a non-empty ASCII digit
/// sequence with no leading zero unless the value is exactly `"0"`.
fn parse_uint64(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if value.len() > 1 && value.as_bytes()[0] == b'0' {
        return None;
    }
    value.parse::<u64>().ok()
}

/// Minimal standard-alphabet base64 decoder, used only to check well-
/// formedness and decoded length of `binary`/`sha256_digest` fields — this
/// crate never needs to re-encode, so a dependency-free decoder is enough
/// (spec §9: "regex as collaborator" sets the precedent of pulling in a
/// crate only where dedicated codec depth is actually needed; base64
/// decoding here is a handful of lines, not a codec).
///
/// Rejects more than two trailing `=` padding characters and a final group
/// left with a single dangling symbol (spec §4.3.1) — one base64 symbol
/// encodes only 6 bits, never enough to recover a whole byte on its own.
fn decode_base64(input: &str) -> Option<Vec<u8>> {
    let padding = input.bytes().rev().take_while(|&b| b == b'=').count();
    if padding > 2 {
        return None;
    }
    let data = &input[..input.len() - padding];
    if data.is_empty() {
        return Some(Vec::new());
    }
    if data.len() % 4 == 1 {
        return None;
    }
    let mut bits: u32 = 0;
    let mut bit_count = 0u32;
    let mut out = Vec::with_capacity(data.len() * 3 / 4 + 1);
    for ch in data.bytes() {
        let value = base64_value(ch)?;
        bits = (bits << 6) | u32::from(value);
        bit_count += 6;
        if bit_count >= 8 {
            bit_count -= 8;
            out.push((bits >> bit_count) as u8);
        }
    }
    Some(out)
}

fn base64_value(byte: u8) -> Option<u8> {
    match byte {
        b'A'..=b'Z' => Some(byte - b'A'),
        b'a'..=b'z' => Some(byte - b'a' + 26),
        b'0'..=b'9' => Some(byte - b'0' + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn field(name: &str, ty: FieldType, required: bool) -> FieldDescriptor {
        FieldDescriptor::new(name, ty, required, None, None).unwrap()
    }

    #[test]
    fn rejects_duplicate_field_names() {
        let err = Schema::new(vec![
            field("id", FieldType::Uint64, true),
            field("id", FieldType::String, false),
        ])
        .unwrap_err();
        assert_eq!(err.kind(), "SCHEMA_MISMATCH");
    }

    #[test]
    fn rejects_too_many_fields() {
        let fields = (0..MAX_FIELDS + 1)
            .map(|i| field(&format!("f{i}"), FieldType::String, false))
            .collect();
        assert_eq!(Schema::new(fields).unwrap_err().kind(), "SCHEMA_MISMATCH");
    }

    #[test]
    fn invalid_pattern_fails_at_construction() {
        let err = FieldDescriptor::new("name", FieldType::String, true, None, Some("(unterminated"))
            .unwrap_err();
        assert_eq!(err.kind(), "SCHEMA_MISMATCH");
    }

    #[test]
    fn missing_required_field_is_schema_mismatch() {
        let schema = Schema::new(vec![field("id", FieldType::Uint64, true)]).unwrap();
        let values = HashMap::new();
        assert_eq!(
            schema.validate_values(&values).unwrap_err().kind(),
            "SCHEMA_MISMATCH"
        );
    }

    #[test]
    fn uint64_field_rejects_non_numeric_value() {
        let schema = Schema::new(vec![field("id", FieldType::Uint64, true)]).unwrap();
        let mut values = HashMap::new();
        values.insert("id".to_string(), "not-a-number".to_string());
        assert_eq!(
            schema.validate_values(&values).unwrap_err().kind(),
            "SCHEMA_MISMATCH"
        );
    }

    #[test]
    fn uint64_field_rejects_leading_zero() {
        let schema = Schema::new(vec![field("id", FieldType::Uint64, true)]).unwrap();
        let mut values = HashMap::new();
        values.insert("id".to_string(), "007".to_string());
        assert_eq!(
            schema.validate_values(&values).unwrap_err().kind(),
            "SCHEMA_MISMATCH"
        );
    }

    #[test]
    fn uint64_field_accepts_exactly_zero() {
        let schema = Schema::new(vec![field("id", FieldType::Uint64, true)]).unwrap();
        let mut values = HashMap::new();
        values.insert("id".to_string(), "0".to_string());
        schema.validate_values(&values).unwrap();
    }

    #[test]
    fn timestamp_field_rejects_value_too_far_in_the_future() {
        let schema = Schema::new(vec![field("ts", FieldType::Timestamp, true)]).unwrap();
        let mut values = HashMap::new();
        // Comfortably past "now + 365 days" for any reasonable clock.
        values.insert("ts".to_string(), "99999999999".to_string());
        assert_eq!(
            schema.validate_values(&values).unwrap_err().kind(),
            "SCHEMA_MISMATCH"
        );
    }

    #[test]
    fn timestamp_field_accepts_a_past_value() {
        let schema = Schema::new(vec![field("ts", FieldType::Timestamp, true)]).unwrap();
        let mut values = HashMap::new();
        values.insert("ts".to_string(), "1700000000".to_string());
        schema.validate_values(&values).unwrap();
    }

    #[test]
    fn sha256_digest_field_requires_64_hex_digits() {
        let schema = Schema::new(vec![field("digest", FieldType::Sha256Digest, true)]).unwrap();
        let mut values = HashMap::new();
        values.insert("digest".to_string(), "abc123".to_string());
        assert_eq!(
            schema.validate_values(&values).unwrap_err().kind(),
            "SCHEMA_MISMATCH"
        );
    }

    #[test]
    fn sha256_digest_field_accepts_64_hex_digits() {
        let schema = Schema::new(vec![field("digest", FieldType::Sha256Digest, true)]).unwrap();
        let mut values = HashMap::new();
        values.insert("digest".to_string(), "a".repeat(64));
        schema.validate_values(&values).unwrap();
    }

    #[test]
    fn sha256_digest_field_rejects_odd_characters() {
        let schema = Schema::new(vec![field("digest", FieldType::Sha256Digest, true)]).unwrap();
        let mut values = HashMap::new();
        values.insert("digest".to_string(), format!("{}z", "a".repeat(63)));
        assert_eq!(
            schema.validate_values(&values).unwrap_err().kind(),
            "SCHEMA_MISMATCH"
        );
    }

    #[test]
    fn binary_field_accepts_well_formed_base64() {
        let schema = Schema::new(vec![field("payload", FieldType::Binary, true)]).unwrap();
        let mut values = HashMap::new();
        values.insert("payload".to_string(), "aGVsbG8=".to_string());
        schema.validate_values(&values).unwrap();
    }

    #[test]
    fn binary_field_rejects_three_trailing_padding_characters() {
        let schema = Schema::new(vec![field("payload", FieldType::Binary, true)]).unwrap();
        let mut values = HashMap::new();
        values.insert("payload".to_string(), "aGVsbG8===".to_string());
        assert_eq!(
            schema.validate_values(&values).unwrap_err().kind(),
            "SCHEMA_MISMATCH"
        );
    }

    #[test]
    fn binary_field_rejects_a_dangling_single_symbol_final_group() {
        let schema = Schema::new(vec![field("payload", FieldType::Binary, true)]).unwrap();
        let mut values = HashMap::new();
        // "aGVsbG8=" is one well-formed group; the trailing unpadded "A" is a
        // fifth byte with nowhere to go.
        values.insert("payload".to_string(), "aGVsbG8=A".to_string());
        assert_eq!(
            schema.validate_values(&values).unwrap_err().kind(),
            "SCHEMA_MISMATCH"
        );
    }

    #[test]
    fn pattern_constrains_string_field() {
        let f = FieldDescriptor::new("code", FieldType::String, true, None, Some("^[A-Z]{3}$"))
            .unwrap();
        assert!(f.check_value("ABC").is_ok());
        assert_eq!(f.check_value("abc").unwrap_err().kind(), "SCHEMA_MISMATCH");
    }

    #[test]
    fn max_length_is_enforced_before_type_check() {
        let f = FieldDescriptor::new("name", FieldType::String, true, Some(3), None).unwrap();
        assert_eq!(f.check_value("abcd").unwrap_err().kind(), "SCHEMA_MISMATCH");
    }

    #[test]
    fn optional_field_absent_is_not_an_error() {
        let schema = Schema::new(vec![field("nickname", FieldType::String, false)]).unwrap();
        schema.validate_values(&HashMap::new()).unwrap();
    }

    #[test]
    fn from_doc_builds_a_schema_from_parsed_fields() {
        let doc = SchemaDoc {
            message_type: "EXAMPLE".to_string(),
            version: "1.0".to_string(),
            compliance: Some("SOC2".to_string()),
            normalization: NormalizationDoc::default(),
            fields: vec![
                FieldDoc {
                    name: "id".to_string(),
                    field_type: "uint64".to_string(),
                    required: true,
                    max_length: None,
                    validation: None,
                },
                FieldDoc {
                    name: "code".to_string(),
                    field_type: "string".to_string(),
                    required: false,
                    max_length: Some(8),
                    validation: Some("^[A-Z]{3}$".to_string()),
                },
            ],
        };
        let schema = Schema::from_doc(&doc).unwrap();
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(schema.field("id").unwrap().field_type(), FieldType::Uint64);
        assert!(schema.field("code").unwrap().pattern().is_some());
    }

    #[test]
    fn from_doc_rejects_unknown_field_type() {
        let doc = SchemaDoc {
            message_type: "EXAMPLE".to_string(),
            version: "1.0".to_string(),
            compliance: None,
            normalization: NormalizationDoc::default(),
            fields: vec![FieldDoc {
                name: "x".to_string(),
                field_type: "not_a_type".to_string(),
                required: false,
                max_length: None,
                validation: None,
            }],
        };
        assert_eq!(Schema::from_doc(&doc).unwrap_err().kind(), "SCHEMA_MISMATCH");
    }
}
