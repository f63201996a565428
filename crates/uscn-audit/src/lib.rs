//! # uscn-audit
//!
//! Append-only, checksum-protected audit trail (spec §4.6). Every entry
//! carries a monotone per-session sequence number and a checksum computed
//! over its own fields, so tampering with an on-disk line is detectable by
//! [`AuditLog::verify`] without needing to trust anything but the reader.
//!
//! The log itself is guarded by a `parking_lot::Mutex`, the same collaborator
//! the upstream membrane used for its own shared-state singletons: cheaper
//! uncontended locking than the standard library's mutex, and no poisoning
//! to thread through every call site. The mutex guards a boxed `Write` sink
//! rather than a bare `File` directly, so a caller that does not want a
//! durable trail (tests, benches, fuzz targets, a CLI invocation with no
//! `--audit-log`) can still own a log that runs the same write-and-flush
//! path via [`AuditLog::discard`], against `io::sink()` instead of a file.
//!
//! No `unsafe` code is permitted at the crate level.

#![deny(unsafe_code)]

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use uscn_core::error::{UscnError, UscnResult};
use uscn_core::hash::{fingerprint32, pattern_hash_hex, HASH_SIZE};

/// Upper bound on an operation tag's length in bytes (spec §4.6).
pub const MAX_OPERATION_LEN: usize = 64;

const FIELD_SEP: char = '|';

/// One audit entry, in both its structured and wire forms (spec §4.6,
/// §6 wire format).
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub timestamp: u64,
    pub operation: String,
    pub hash_reference: Option<[u8; HASH_SIZE]>,
    pub context: String,
    pub compliance: String,
    pub sequence: u64,
    pub checksum: u32,
}

impl AuditEntry {
    /// The checksummed payload: every field but `CHECKSUM` itself, in the
    /// `KEY=value` wire form of spec §6.
    fn payload(
        timestamp: u64,
        operation: &str,
        hash_ref_hex: &str,
        context: &str,
        compliance: &str,
        sequence: u64,
    ) -> String {
        format!(
            "TIMESTAMP={timestamp}{FIELD_SEP}OPERATION={operation}{FIELD_SEP}HASH_REF={hash_ref_hex}{FIELD_SEP}CONTEXT={context}{FIELD_SEP}COMPLIANCE={compliance}{FIELD_SEP}SEQ={sequence}"
        )
    }

    fn new(
        timestamp: u64,
        operation: String,
        hash_reference: Option<[u8; HASH_SIZE]>,
        context: String,
        compliance: String,
        sequence: u64,
    ) -> Self {
        let hash_ref_hex = pattern_hash_hex(hash_reference);
        let payload = Self::payload(
            timestamp,
            &operation,
            &hash_ref_hex,
            &context,
            &compliance,
            sequence,
        );
        let checksum = fingerprint32(payload.as_bytes());
        Self {
            timestamp,
            operation,
            hash_reference,
            context,
            compliance,
            sequence,
            checksum,
        }
    }

    /// Render this entry as one pipe-delimited `KEY=value` wire-format line
    /// (spec §6), without a trailing newline.
    #[must_use]
    pub fn to_line(&self) -> String {
        let hash_ref_hex = pattern_hash_hex(self.hash_reference);
        format!(
            "{}{FIELD_SEP}CHECKSUM={:08x}",
            Self::payload(
                self.timestamp,
                &self.operation,
                &hash_ref_hex,
                &self.context,
                &self.compliance,
                self.sequence,
            ),
            self.checksum
        )
    }

    /// Parse one `KEY=value` wire-format line back into an entry, without
    /// validating its checksum (see [`AuditLog::verify`] for that).
    pub fn parse_line(line: &str) -> UscnResult<Self> {
        let parts: Vec<&str> = line.split(FIELD_SEP).collect();
        if parts.len() != 7 {
            return Err(UscnError::InvalidInput(format!(
                "audit line has {} fields, expected 7",
                parts.len()
            )));
        }
        let value = |part: &'static str, idx: usize| -> UscnResult<&str> {
            parts[idx].strip_prefix(part).ok_or_else(|| {
                UscnError::InvalidInput(format!("audit line field {idx} missing '{part}' key"))
            })
        };
        let timestamp = value("TIMESTAMP=", 0)?
            .parse::<u64>()
            .map_err(|_| UscnError::InvalidInput("audit line timestamp is not numeric".into()))?;
        let operation = value("OPERATION=", 1)?.to_string();
        let hash_ref_field = value("HASH_REF=", 2)?;
        let hash_reference = if hash_ref_field == "NULL_HASH" {
            None
        } else {
            let fingerprint = u32::from_str_radix(hash_ref_field, 16).map_err(|_| {
                UscnError::InvalidInput("audit line hash reference is not hex".into())
            })?;
            Some(uscn_core::hash::encode_pattern_hash(fingerprint))
        };
        let context = value("CONTEXT=", 3)?.to_string();
        let compliance = value("COMPLIANCE=", 4)?.to_string();
        let sequence = value("SEQ=", 5)?
            .parse::<u64>()
            .map_err(|_| UscnError::InvalidInput("audit line sequence is not numeric".into()))?;
        let checksum = u32::from_str_radix(value("CHECKSUM=", 6)?, 16)
            .map_err(|_| UscnError::InvalidInput("audit line checksum is not hex".into()))?;
        Ok(Self {
            timestamp,
            operation,
            hash_reference,
            context,
            compliance,
            sequence,
            checksum,
        })
    }

    /// Recompute this entry's checksum from its own fields and compare
    /// against the stored one.
    #[must_use]
    pub fn checksum_is_valid(&self) -> bool {
        let hash_ref_hex = pattern_hash_hex(self.hash_reference);
        let payload = Self::payload(
            self.timestamp,
            &self.operation,
            &hash_ref_hex,
            &self.context,
            &self.compliance,
            self.sequence,
        );
        fingerprint32(payload.as_bytes()) == self.checksum
    }
}

struct AuditLogState {
    sink: Box<dyn Write + Send>,
    session_id: String,
    sequence: u64,
}

/// An append-only audit log for one session, identified by `session_id`
/// (spec §4.6). `context` for every entry this log writes is
/// `SESSION_<id>_SEQ_<n>`. `path` is `None` for a [`discard`](Self::discard)
/// log, which has nothing on disk for [`verify`](Self::verify) to re-read.
pub struct AuditLog {
    state: Mutex<AuditLogState>,
    path: Option<PathBuf>,
}

impl AuditLog {
    /// Open (creating if absent) the audit log at `path` in append mode and
    /// write the `AUDIT_INIT` lifecycle entry (spec §4.6 session lifecycle).
    pub fn init(path: impl AsRef<Path>, session_id: impl Into<String>) -> UscnResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| UscnError::InvalidInput(format!("cannot open audit log: {e}")))?;
        Self::from_sink(Box::new(file), Some(path), session_id)
    }

    /// A session-scoped audit log that discards every entry instead of
    /// persisting it. For a caller that never asked for a durable trail (no
    /// `--audit-log`, a test fixture, a benchmark or fuzz target), the audit
    /// stage still runs and still fails closed on a write error — only its
    /// destination differs from a file on disk.
    pub fn discard(session_id: impl Into<String>) -> UscnResult<Self> {
        Self::from_sink(Box::new(std::io::sink()), None, session_id)
    }

    fn from_sink(
        sink: Box<dyn Write + Send>,
        path: Option<PathBuf>,
        session_id: impl Into<String>,
    ) -> UscnResult<Self> {
        let log = Self {
            state: Mutex::new(AuditLogState {
                sink,
                session_id: session_id.into(),
                sequence: 0,
            }),
            path,
        };
        log.log_internal("AUDIT_INIT", None, "SESSION_START")?;
        Ok(log)
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one audit entry for `operation` (spec §4.6). Fails
    /// `INVALID_INPUT` if `operation` exceeds [`MAX_OPERATION_LEN`] bytes.
    pub fn log(
        &self,
        operation: &str,
        hash_reference: Option<[u8; HASH_SIZE]>,
        compliance: &str,
    ) -> UscnResult<u64> {
        if operation.len() > MAX_OPERATION_LEN {
            return Err(UscnError::InvalidInput(format!(
                "operation tag length {} exceeds MAX_OPERATION_LEN {MAX_OPERATION_LEN}",
                operation.len()
            )));
        }
        self.log_internal(operation, hash_reference, compliance)
    }

    /// Write one entry and flush it to the underlying sink before returning
    /// (spec §4.6: "entries are flushed to durable storage before the call
    /// returns"). Either failure is fatal and surfaces as `AUDIT_REQUIRED`
    /// (spec §7): a caller must never treat the audit stage as best-effort.
    fn log_internal(
        &self,
        operation: &str,
        hash_reference: Option<[u8; HASH_SIZE]>,
        compliance: &str,
    ) -> UscnResult<u64> {
        let mut state = self.state.lock();
        let sequence = state.sequence;
        let context = format!("SESSION_{}_SEQ_{sequence}", state.session_id);
        let timestamp = unix_timestamp();
        let entry = AuditEntry::new(
            timestamp,
            operation.to_string(),
            hash_reference,
            context,
            compliance.to_string(),
            sequence,
        );
        writeln!(state.sink, "{}", entry.to_line())
            .map_err(|e| UscnError::AuditRequired(format!("cannot write audit log: {e}")))?;
        state
            .sink
            .flush()
            .map_err(|e| UscnError::AuditRequired(format!("cannot flush audit log: {e}")))?;
        state.sequence += 1;
        Ok(sequence)
    }

    /// Write the `AUDIT_CLEANUP` lifecycle entry (spec §4.6 session
    /// lifecycle). The log remains open and usable afterward; this marks
    /// session end without closing the underlying file.
    pub fn cleanup(&self) -> UscnResult<u64> {
        self.log_internal("AUDIT_CLEANUP", None, "SESSION_END")
    }

    /// Re-read `path` and verify every entry's checksum. Returns the
    /// indices (0-based, in file order) of entries whose checksum does not
    /// match their own fields (spec §8 scenario S6).
    pub fn verify(path: impl AsRef<Path>) -> UscnResult<VerifyReport> {
        let file = File::open(path.as_ref())
            .map_err(|e| UscnError::InvalidInput(format!("cannot open audit log: {e}")))?;
        let reader = BufReader::new(file);
        let mut total_entries = 0usize;
        let mut mismatched_indices = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line =
                line.map_err(|e| UscnError::InvalidInput(format!("cannot read audit log: {e}")))?;
            if line.is_empty() {
                continue;
            }
            total_entries += 1;
            let entry = AuditEntry::parse_line(&line)?;
            if !entry.checksum_is_valid() {
                mismatched_indices.push(index);
            }
        }
        Ok(VerifyReport {
            total_entries,
            mismatched_indices,
        })
    }
}

/// The result of [`AuditLog::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub total_entries: usize,
    pub mismatched_indices: Vec<usize>,
}

impl VerifyReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.mismatched_indices.is_empty()
    }
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn init_writes_audit_init_entry() {
        let file = NamedTempFile::new().unwrap();
        let log = AuditLog::init(file.path(), "abc123").unwrap();
        drop(log);
        let contents = std::fs::read_to_string(file.path()).unwrap();
        assert!(contents.contains("AUDIT_INIT"));
        assert!(contents.contains("SESSION_abc123_SEQ_0"));
    }

    #[test]
    fn sequence_numbers_are_monotone_per_session() {
        let file = NamedTempFile::new().unwrap();
        let log = AuditLog::init(file.path(), "sess").unwrap();
        let first = log.log("VALIDATE", None, "OK").unwrap();
        let second = log.log("VALIDATE", None, "OK").unwrap();
        assert_eq!(first, 1); // AUDIT_INIT took sequence 0
        assert_eq!(second, 2);
    }

    #[test]
    fn operation_tag_over_max_length_is_rejected() {
        let file = NamedTempFile::new().unwrap();
        let log = AuditLog::init(file.path(), "sess").unwrap();
        let long_tag = "x".repeat(MAX_OPERATION_LEN + 1);
        let err = log.log(&long_tag, None, "OK").unwrap_err();
        assert_eq!(err.kind(), "INVALID_INPUT");
    }

    #[test]
    fn roundtrip_through_to_line_and_parse_line() {
        let entry = AuditEntry::new(
            1_700_000_000,
            "VALIDATE".to_string(),
            Some(uscn_core::hash::encode_pattern_hash(0xdead_beef)),
            "SESSION_x_SEQ_3".to_string(),
            "COMPLIANT".to_string(),
            3,
        );
        let line = entry.to_line();
        let parsed = AuditEntry::parse_line(&line).unwrap();
        assert_eq!(parsed, entry);
        assert!(parsed.checksum_is_valid());
    }

    #[test]
    fn verify_detects_a_tampered_line() {
        let file = NamedTempFile::new().unwrap();
        {
            let log = AuditLog::init(file.path(), "sess").unwrap();
            log.log("VALIDATE", None, "OK").unwrap();
            log.cleanup().unwrap();
        }
        let mut contents = std::fs::read_to_string(file.path()).unwrap();
        contents = contents.replacen("VALIDATE", "VALIDATE_TAMPERED", 1);
        std::fs::write(file.path(), contents).unwrap();

        let report = AuditLog::verify(file.path()).unwrap();
        assert!(!report.is_valid());
        assert_eq!(report.mismatched_indices, vec![1]);
    }

    #[test]
    fn verify_accepts_an_untampered_log() {
        let file = NamedTempFile::new().unwrap();
        {
            let log = AuditLog::init(file.path(), "sess").unwrap();
            log.log("VALIDATE", None, "OK").unwrap();
            log.log("VALIDATE", None, "OK").unwrap();
            log.cleanup().unwrap();
        }
        let report = AuditLog::verify(file.path()).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.total_entries, 4);
    }

    #[test]
    fn null_hash_sentinel_roundtrips() {
        let entry = AuditEntry::new(
            1,
            "AUDIT_INIT".to_string(),
            None,
            "SESSION_x_SEQ_0".to_string(),
            "SESSION_START".to_string(),
            0,
        );
        let parsed = AuditEntry::parse_line(&entry.to_line()).unwrap();
        assert_eq!(parsed.hash_reference, None);
    }

    #[test]
    fn discard_log_has_no_path_but_still_assigns_sequence_numbers() {
        let log = AuditLog::discard("ephemeral").unwrap();
        assert_eq!(log.path(), None);
        let sequence = log.log("VALIDATE", None, "OK").unwrap();
        assert_eq!(sequence, 1); // AUDIT_INIT took sequence 0
    }
}
