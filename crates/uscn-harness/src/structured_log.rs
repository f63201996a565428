//! Structured logging contract for the conformance harness's scenario/perf
//! workflows.
//!
//! Provides:
//! - [`LogEntry`]: canonical JSONL log record with required + optional fields.
//! - [`ArtifactIndex`]: links logs to verification artifacts with SHA-256 integrity.
//! - [`LogEmitter`]: writes JSONL lines to a file or stdout.
//! - [`validate_log_line`]: validates a single JSONL line against the schema.
//! - [`validate_log_file`]: validates an entire JSONL file.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

// ---------------------------------------------------------------------------
// Log entry
// ---------------------------------------------------------------------------

/// Severity level for log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

/// A `validate()` call's governance-zone decision (spec §3, §4.4), mirrored
/// into the log for dashboards that join on admission outcome rather than
/// re-deriving it from `governance_zone`/`cost_value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Accept,
    Warn,
    Reject,
}

/// Scenario/test outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
    Skip,
    Error,
    Timeout,
}

/// Evidence stream / workflow domain, so unit, conformance, e2e, and perf
/// runs can be aggregated from one log schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Unit,
    Conformance,
    E2e,
    Perf,
    Release,
}

/// Canonical structured log entry.
///
/// Required fields: `timestamp`, `trace_id`, `level`, `event`.
/// Optional fields provide context for scenario-replay and perf workflows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    // Required
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,

    // Optional
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamKind>,
    /// Pipeline step / gate name (e.g. `conformance_suite`, `perf_gate`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate: Option<String>,
    /// Enforcement policy in effect for this event (`normalize_inline` /
    /// `reject_unnormalized`), when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforcement_mode: Option<String>,
    /// Crate/module the event originated in (e.g. `uscn-membrane`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    /// Operation within `component` (e.g. `validate`, `normalize`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// Optional span id for multi-step traces under one `trace_id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    /// Optional parent span id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    /// Governance zone reached by this event's `validate()` call, when
    /// applicable (spec §3, §4.4).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub governance_zone: Option<String>,
    /// Admission cost value, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_value: Option<f64>,
    /// The automaton's pattern hash, hex-encoded, when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern_hash: Option<String>,
    /// `validate()`'s governance-zone decision, mirrored for dashboards
    /// (`Accept`/`Warn`/`Reject`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    /// The `UscnError` wire kind (spec §6), when this event records a
    /// rejection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    /// Exit code for external processes/scripts when relevant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ns: Option<u64>,
    /// Wall-clock duration for a higher-level gate step (milliseconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_refs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// Create a new log entry with required fields only.
    #[must_use]
    pub fn new(trace_id: impl Into<String>, level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: trace_id.into(),
            level,
            event: event.into(),
            session_id: None,
            stream: None,
            gate: None,
            enforcement_mode: None,
            component: None,
            operation: None,
            span_id: None,
            parent_span_id: None,
            governance_zone: None,
            cost_value: None,
            pattern_hash: None,
            decision: None,
            error_kind: None,
            outcome: None,
            exit_code: None,
            latency_ns: None,
            duration_ms: None,
            artifact_refs: None,
            details: None,
        }
    }

    /// Set the audit session id this event belongs to.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the evidence stream kind.
    #[must_use]
    pub fn with_stream(mut self, stream: StreamKind) -> Self {
        self.stream = Some(stream);
        self
    }

    /// Set the pipeline step / gate name.
    #[must_use]
    pub fn with_gate(mut self, gate: impl Into<String>) -> Self {
        self.gate = Some(gate.into());
        self
    }

    /// Set the enforcement mode in effect.
    #[must_use]
    pub fn with_enforcement_mode(mut self, mode: impl Into<String>) -> Self {
        self.enforcement_mode = Some(mode.into());
        self
    }

    /// Set the originating component and operation.
    #[must_use]
    pub fn with_component(mut self, component: impl Into<String>, operation: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self.operation = Some(operation.into());
        self
    }

    /// Set span identifiers (optional).
    #[must_use]
    pub fn with_span(mut self, span_id: impl Into<String>, parent_span_id: Option<String>) -> Self {
        self.span_id = Some(span_id.into());
        self.parent_span_id = parent_span_id;
        self
    }

    /// Set the governance zone and cost value reached by a `validate()` call.
    #[must_use]
    pub fn with_cost(mut self, governance_zone: impl Into<String>, cost_value: f64) -> Self {
        self.governance_zone = Some(governance_zone.into());
        self.cost_value = Some(cost_value);
        self
    }

    /// Set the hex-encoded pattern hash.
    #[must_use]
    pub fn with_pattern_hash(mut self, pattern_hash: impl Into<String>) -> Self {
        self.pattern_hash = Some(pattern_hash.into());
        self
    }

    /// Set the governance-zone decision (`Accept`/`Warn`/`Reject`).
    #[must_use]
    pub fn with_decision(mut self, decision: Decision) -> Self {
        self.decision = Some(decision);
        self
    }

    /// Set the `UscnError` wire kind for a rejection event.
    #[must_use]
    pub fn with_error_kind(mut self, error_kind: impl Into<String>) -> Self {
        self.error_kind = Some(error_kind.into());
        self
    }

    /// Set the outcome.
    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Set exit code.
    #[must_use]
    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = Some(exit_code);
        self
    }

    /// Set latency in nanoseconds.
    #[must_use]
    pub fn with_latency_ns(mut self, ns: u64) -> Self {
        self.latency_ns = Some(ns);
        self
    }

    /// Set duration in milliseconds.
    #[must_use]
    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    /// Add artifact references.
    #[must_use]
    pub fn with_artifacts(mut self, refs: Vec<String>) -> Self {
        self.artifact_refs = Some(refs);
        self
    }

    /// Set free-form details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Build a log entry from a validator's outcome (spec §4.3's closing
    /// state), for scenario-replay logging.
    #[must_use]
    pub fn from_validation_outcome(
        trace_id: impl Into<String>,
        outcome: &uscn_membrane::ValidationOutcome,
    ) -> Self {
        let zone = format!("{:?}", outcome.governance_zone);
        let decision = match outcome.governance_zone {
            uscn_core::buffer::GovernanceZone::Autonomous => Decision::Accept,
            uscn_core::buffer::GovernanceZone::Warning => Decision::Warn,
            uscn_core::buffer::GovernanceZone::Governance => Decision::Reject,
        };
        Self::new(trace_id, LogLevel::Info, "validate")
            .with_component("uscn-membrane", "validate")
            .with_cost(zone, outcome.cost.cost_value)
            .with_pattern_hash(uscn_core::hash::pattern_hash_hex(Some(outcome.pattern_hash)))
            .with_decision(decision)
            .with_outcome(Outcome::Pass)
    }

    /// Build a log entry from a validation rejection, for scenario-replay
    /// logging.
    #[must_use]
    pub fn from_validation_error(trace_id: impl Into<String>, error: &uscn_core::error::UscnError) -> Self {
        Self::new(trace_id, LogLevel::Warn, "validate")
            .with_component("uscn-membrane", "validate")
            .with_error_kind(error.kind())
            .with_decision(Decision::Reject)
            .with_outcome(Outcome::Fail)
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Artifact index
// ---------------------------------------------------------------------------

/// A single artifact entry in the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub path: String,
    pub kind: String,
    pub sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Artifact index linking logs to verification artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactIndex {
    pub index_version: u32,
    pub run_id: String,
    pub session_id: String,
    pub generated_utc: String,
    pub artifacts: Vec<ArtifactEntry>,
}

impl ArtifactIndex {
    /// Create a new artifact index.
    #[must_use]
    pub fn new(run_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            index_version: 1,
            run_id: run_id.into(),
            session_id: session_id.into(),
            generated_utc: now_utc(),
            artifacts: Vec::new(),
        }
    }

    /// Add an artifact entry.
    pub fn add(
        &mut self,
        path: impl Into<String>,
        kind: impl Into<String>,
        sha256: impl Into<String>,
    ) -> &mut Self {
        self.artifacts.push(ArtifactEntry {
            path: path.into(),
            kind: kind.into(),
            sha256: sha256.into(),
            size_bytes: None,
            description: None,
        });
        self
    }

    /// Hash `path` on disk and add it as an artifact entry, recording its
    /// size alongside the digest.
    pub fn add_from_file(
        &mut self,
        path: impl AsRef<Path>,
        kind: impl Into<String>,
    ) -> std::io::Result<&mut Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let digest = sha256_hex(&data);
        self.artifacts.push(ArtifactEntry {
            path: path.display().to_string(),
            kind: kind.into(),
            sha256: digest,
            size_bytes: Some(data.len() as u64),
            description: None,
        });
        Ok(self)
    }

    /// Re-hash every artifact on disk and report any whose recorded
    /// `sha256` no longer matches the file's current contents.
    pub fn verify(&self, root: impl AsRef<Path>) -> std::io::Result<Vec<String>> {
        let root = root.as_ref();
        let mut mismatched = Vec::new();
        for artifact in &self.artifacts {
            let full_path = root.join(&artifact.path);
            let data = std::fs::read(&full_path)?;
            let actual = sha256_hex(&data);
            if !actual.eq_ignore_ascii_case(&artifact.sha256) {
                mismatched.push(artifact.path.clone());
            }
        }
        Ok(mismatched)
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn sha256_hex(data: &[u8]) -> String {
    use sha2::Digest;
    let digest = sha2::Sha256::digest(data);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

// ---------------------------------------------------------------------------
// Log emitter
// ---------------------------------------------------------------------------

/// Writes structured JSONL log entries to a file or stdout.
pub struct LogEmitter {
    writer: Box<dyn Write>,
    seq: u64,
    session_id: String,
    run_id: String,
}

impl LogEmitter {
    /// Create an emitter that writes to a file.
    pub fn to_file(path: &Path, session_id: &str, run_id: &str) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self {
            writer: Box::new(std::io::BufWriter::new(file)),
            seq: 0,
            session_id: session_id.to_string(),
            run_id: run_id.to_string(),
        })
    }

    /// Create an emitter that writes to a `Vec<u8>` buffer (for testing).
    #[must_use]
    pub fn to_buffer(session_id: &str, run_id: &str) -> Self {
        Self {
            writer: Box::new(Vec::new()),
            seq: 0,
            session_id: session_id.to_string(),
            run_id: run_id.to_string(),
        }
    }

    /// Generate the next trace ID.
    fn next_trace_id(&mut self) -> String {
        self.seq += 1;
        format!("{}::{}::{:03}", self.session_id, self.run_id, self.seq)
    }

    /// Emit a log entry with auto-generated trace_id and session_id.
    pub fn emit(&mut self, level: LogLevel, event: &str) -> std::io::Result<LogEntry> {
        let trace_id = self.next_trace_id();
        let entry = LogEntry::new(&trace_id, level, event).with_session(&self.session_id);
        let line = serde_json::to_string(&entry).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")?;
        Ok(entry)
    }

    /// Emit a fully-populated log entry.
    pub fn emit_entry(&mut self, mut entry: LogEntry) -> std::io::Result<()> {
        if entry.trace_id.is_empty() {
            entry.trace_id = self.next_trace_id();
        }
        if entry.session_id.is_none() {
            entry.session_id = Some(self.session_id.clone());
        }
        let line = serde_json::to_string(&entry).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validation error for a log line.
#[derive(Debug)]
pub struct LogValidationError {
    pub line_number: usize,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for LogValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: field '{}': {}",
            self.line_number, self.field, self.message
        )
    }
}

/// Validate a single JSONL line against the schema.
///
/// Returns `Ok(())` if valid, or a list of validation errors.
pub fn validate_log_line(
    line: &str,
    line_number: usize,
) -> Result<LogEntry, Vec<LogValidationError>> {
    let mut errors = Vec::new();

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            errors.push(LogValidationError {
                line_number,
                field: "<json>".to_string(),
                message: format!("invalid JSON: {e}"),
            });
            return Err(errors);
        }
    };

    let obj = match value.as_object() {
        Some(o) => o,
        None => {
            errors.push(LogValidationError {
                line_number,
                field: "<root>".to_string(),
                message: "expected JSON object".to_string(),
            });
            return Err(errors);
        }
    };

    // Required fields
    for field in ["timestamp", "trace_id", "level", "event"] {
        if !obj.contains_key(field) {
            errors.push(LogValidationError {
                line_number,
                field: field.to_string(),
                message: "required field missing".to_string(),
            });
        }
    }

    // Validate level enum
    if let Some(level) = obj.get("level").and_then(|v| v.as_str()) {
        if !["trace", "debug", "info", "warn", "error", "fatal"].contains(&level) {
            errors.push(LogValidationError {
                line_number,
                field: "level".to_string(),
                message: format!("invalid level: '{level}'"),
            });
        }
    }

    // Validate enforcement_mode enum if present
    if let Some(mode) = obj.get("enforcement_mode").and_then(|v| v.as_str()) {
        if !["normalize_inline", "reject_unnormalized"].contains(&mode) {
            errors.push(LogValidationError {
                line_number,
                field: "enforcement_mode".to_string(),
                message: format!("invalid enforcement_mode: '{mode}'"),
            });
        }
    }

    // Validate outcome enum if present
    if let Some(outcome) = obj.get("outcome").and_then(|v| v.as_str()) {
        if !["pass", "fail", "skip", "error", "timeout"].contains(&outcome) {
            errors.push(LogValidationError {
                line_number,
                field: "outcome".to_string(),
                message: format!("invalid outcome: '{outcome}'"),
            });
        }
    }

    // Validate decision enum if present
    if let Some(decision) = obj.get("decision").and_then(|v| v.as_str()) {
        if !["Accept", "Warn", "Reject"].contains(&decision) {
            errors.push(LogValidationError {
                line_number,
                field: "decision".to_string(),
                message: format!("invalid decision: '{decision}'"),
            });
        }
    }

    // A rejecting decision must carry an error_kind explaining why.
    if obj.get("decision").and_then(|v| v.as_str()) == Some("Reject")
        && !obj
            .get("error_kind")
            .and_then(|v| v.as_str())
            .is_some_and(|s| !s.trim().is_empty())
    {
        errors.push(LogValidationError {
            line_number,
            field: "error_kind".to_string(),
            message: "a Reject decision must include a non-empty error_kind".to_string(),
        });
    }

    // Validate stream enum if present
    if let Some(stream) = obj.get("stream").and_then(|v| v.as_str()) {
        if !["unit", "conformance", "e2e", "perf", "release"].contains(&stream) {
            errors.push(LogValidationError {
                line_number,
                field: "stream".to_string(),
                message: format!("invalid stream: '{stream}'"),
            });
        }
    }

    // Validate trace_id format: should contain ::
    if let Some(trace_id) = obj.get("trace_id").and_then(|v| v.as_str()) {
        if !trace_id.contains("::") {
            errors.push(LogValidationError {
                line_number,
                field: "trace_id".to_string(),
                message: format!(
                    "trace_id should follow <session_id>::<run_id>::<seq> format, got: '{trace_id}'"
                ),
            });
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    // If validation passed, try full deserialization
    match serde_json::from_value::<LogEntry>(value) {
        Ok(entry) => Ok(entry),
        Err(e) => {
            errors.push(LogValidationError {
                line_number,
                field: "<deserialization>".to_string(),
                message: format!("failed to deserialize: {e}"),
            });
            Err(errors)
        }
    }
}

/// Validate an entire JSONL file.
///
/// Returns the total line count and any validation errors found.
pub fn validate_log_file(path: &Path) -> Result<(usize, Vec<LogValidationError>), std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    let mut all_errors = Vec::new();
    let mut line_count = 0;

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        line_count += 1;
        if let Err(errs) = validate_log_line(line, i + 1) {
            all_errors.extend(errs);
        }
    }

    Ok((line_count, all_errors))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn now_utc() -> String {
    // Use a simple format without external chrono dependency
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();
    // Approximate UTC formatting (good enough for structured logs)
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        1970 + secs / 31_557_600,            // approximate year
        (secs % 31_557_600) / 2_629_800 + 1, // approximate month
        (secs % 2_629_800) / 86400 + 1,      // approximate day
        (secs % 86400) / 3600,
        (secs % 3600) / 60,
        secs % 60,
        millis,
    )
}
