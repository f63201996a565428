//! YAML schema loading (spec §6, §1 "external collaborator").
//!
//! `uscn-core` deserializes `SchemaDoc`/`FieldDoc` with plain `serde` but
//! carries no YAML parser itself; this module is the one place `serde_yaml`
//! is pulled in, turning a schema file on disk into the validated,
//! regex-compiled `Schema` that `uscn-membrane::Validator` is built against.

use std::fs;
use std::path::Path;

use uscn_core::error::{UscnError, UscnResult};
use uscn_core::schema::{Schema, SchemaDoc};

/// Read and parse the YAML schema file at `path`, returning both the
/// compiled [`Schema`] and the raw [`SchemaDoc`] (the caller wants
/// `message_type`/`compliance`/`normalization` too, e.g. for the audit
/// log's `COMPLIANCE` tag and the validator's normalizer knobs).
pub fn load(path: &Path) -> UscnResult<(Schema, SchemaDoc)> {
    let text = fs::read_to_string(path).map_err(|e| {
        UscnError::InvalidInput(format!("cannot read schema file {}: {e}", path.display()))
    })?;
    let doc: SchemaDoc = serde_yaml::from_str(&text).map_err(|e| {
        UscnError::SchemaMismatch(format!("schema file {} is not valid: {e}", path.display()))
    })?;
    let schema = Schema::from_doc(&doc)?;
    Ok((schema, doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_yaml(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_a_well_formed_schema_file() {
        let file = write_yaml(
            r#"
message_type: ORDER_EVENT
version: "1.0"
compliance: SOC2
normalization:
  case_sensitivity: false
fields:
  - name: id
    type: uint64
    required: true
  - name: signature
    type: sha256_digest
    required: true
"#,
        );
        let (schema, doc) = load(file.path()).unwrap();
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(doc.message_type, "ORDER_EVENT");
        assert_eq!(doc.compliance.as_deref(), Some("SOC2"));
        assert_eq!(doc.normalization.case_sensitivity, Some(false));
    }

    #[test]
    fn missing_file_is_invalid_input() {
        let err = load(Path::new("/nonexistent/schema.yaml")).unwrap_err();
        assert_eq!(err.kind(), "INVALID_INPUT");
    }

    #[test]
    fn malformed_yaml_is_schema_mismatch() {
        let file = write_yaml("not: [valid, schema");
        let err = load(file.path()).unwrap_err();
        assert_eq!(err.kind(), "SCHEMA_MISMATCH");
    }

    #[test]
    fn unknown_field_type_surfaces_as_schema_mismatch() {
        let file = write_yaml(
            r#"
message_type: ORDER_EVENT
version: "1.0"
fields:
  - name: id
    type: not_a_real_type
"#,
        );
        let err = load(file.path()).unwrap_err();
        assert_eq!(err.kind(), "SCHEMA_MISMATCH");
    }
}
