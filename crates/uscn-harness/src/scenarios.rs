//! The six concrete scenarios of spec §8, encoded as named integration tests
//! against one fixed default schema. Each scenario is also reachable as a
//! plain function so `uscn-cli`'s `benchmark`/`validate` commands and the
//! `harness` binary can reuse the same fixture instead of re-deriving it.

use uscn_core::buffer::Buffer;
use uscn_core::schema::{FieldDescriptor, FieldType, Schema};
use uscn_membrane::{EnforcementPolicy, ValidatorConfig, Validator};

/// The schema spec §6 calls "the §6 defaults": the six fields exercised by
/// S1-S4 (`id`, `timestamp`, `payload`, `signature`, `message_type`,
/// `source_id`).
#[must_use]
pub fn default_schema() -> Schema {
    Schema::new(vec![
        FieldDescriptor::new("id", FieldType::Uint64, true, None, None).unwrap(),
        FieldDescriptor::new("timestamp", FieldType::Timestamp, true, None, None).unwrap(),
        FieldDescriptor::new("payload", FieldType::Binary, true, None, None).unwrap(),
        FieldDescriptor::new(
            "signature",
            FieldType::String,
            true,
            None,
            Some("^[0-9a-f]{64}$"),
        )
        .unwrap(),
        FieldDescriptor::new("message_type", FieldType::String, true, None, None).unwrap(),
        FieldDescriptor::new("source_id", FieldType::String, true, None, None).unwrap(),
    ])
    .unwrap()
}

/// `(alpha, beta) = (0.5, 0.5)`, `NormalizeInline` — the baseline config used
/// by every scenario except S5, which constructs its own.
#[must_use]
pub fn default_config() -> ValidatorConfig {
    ValidatorConfig::default()
}

/// Build a 64-hex-digit `signature` fixture by repeating one byte's hex
/// pair, matching spec §8's `<64-hex>` placeholder.
fn hex64(byte: u8) -> String {
    format!("{byte:02x}").repeat(32)
}

/// S1's canonical accept input (spec §8).
#[must_use]
pub fn s1_input() -> Vec<u8> {
    format!(
        "{{\"id\":\"12345\",\"timestamp\":\"1700000000\",\"payload\":\"aGVsbG8=\",\"signature\":\"{}\",\"message_type\":\"DATA\",\"source_id\":\"node_a\"}}",
        hex64(0xab)
    )
    .into_bytes()
}
