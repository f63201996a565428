//! CLI entrypoint for the USCN protocol engine (spec §6 External Interfaces).
//!
//! Every subcommand is a few lines that construct a `Validator`, `Normalizer`,
//! or `AuditLog` from `uscn-core`/`uscn-membrane`/`uscn-audit` and call into
//! it in the prescribed order. No protocol logic lives here.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use uscn_audit::AuditLog;
use uscn_core::buffer::{Buffer, MAX_BUFFER_SIZE};
use uscn_core::normalize::{Normalizer, NormalizerConfig};
use uscn_core::schema::MAX_FIELDS;
use uscn_membrane::{resolved_policy, Validator, ValidatorConfig};

use uscn_cli::schema_yaml;

/// Command-line collaborator for the USCN protocol engine.
#[derive(Debug, Parser)]
#[command(name = "uscn-cli")]
#[command(about = "Validate, normalize, and audit-verify USCN protocol messages from a shell")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a message through the full seven-step validation pipeline.
    Validate(ValidateArgs),
    /// Reduce an input to its canonical USCN form without validating it.
    Normalize(NormalizeArgs),
    /// Re-verify an on-disk audit log's checksums.
    Audit(AuditArgs),
    /// Print where to run this workspace's benchmark suite.
    Benchmark,
    /// Print the engine's crate version.
    Version,
}

#[derive(Debug, clap::Args)]
struct ValidateArgs {
    /// Path to the raw message bytes to validate.
    #[arg(short, long)]
    input: PathBuf,
    /// Path to the YAML schema file describing the message's fields.
    #[arg(short, long)]
    schema: PathBuf,
    /// Write the validation outcome as JSON to this path instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Append an entry to this audit log for the outcome.
    #[arg(short = 'a', long = "audit-log")]
    audit_log: Option<PathBuf>,
    /// Print the normalization trace and cost breakdown alongside the result.
    #[arg(short, long)]
    verbose: bool,
    /// Waive the zero-trust gate's rejection of an unnormalized buffer under
    /// a strict enforcement profile (normalization itself still always runs).
    #[arg(long = "no-zero-trust")]
    no_zero_trust: bool,
    /// Skip this CLI's own pre-flight resource-cap checks and let an
    /// oversized input or schema reach the core's own BUFFER_OVERFLOW /
    /// SCHEMA_MISMATCH path instead.
    #[arg(long = "no-nasa")]
    no_nasa: bool,
    /// Override the cost evaluator's KL-divergence weight (default 0.5).
    #[arg(short = 'A', long)]
    alpha: Option<f64>,
    /// Override the cost evaluator's entropy-delta weight (default 0.5).
    #[arg(short = 'B', long)]
    beta: Option<f64>,
}

#[derive(Debug, clap::Args)]
struct NormalizeArgs {
    /// Path to the raw bytes to normalize.
    #[arg(short, long)]
    input: PathBuf,
    /// Write the canonical bytes to this path instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print the mapping-pass trace to stderr.
    #[arg(short, long)]
    verbose: bool,
    /// Skip this CLI's own pre-flight buffer-size check.
    #[arg(long = "no-nasa")]
    no_nasa: bool,
}

#[derive(Debug, clap::Args)]
struct AuditArgs {
    /// Path to the audit log file to verify.
    #[arg(short = 'a', long = "audit-log")]
    audit_log: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Validate(args) => cmd_validate(args),
        Command::Normalize(args) => cmd_normalize(args),
        Command::Audit(args) => cmd_audit(args),
        Command::Benchmark => cmd_benchmark(),
        Command::Version => cmd_version(),
    }
}

/// Fail fast on an oversize input/schema before any core call, unless the
/// caller asked to see the core's own resource-cap error instead.
fn preflight_buffer_size(no_nasa: bool, len: usize) -> Result<(), Box<dyn std::error::Error>> {
    if !no_nasa && len > MAX_BUFFER_SIZE {
        return Err(format!(
            "input is {len} bytes, exceeds MAX_BUFFER_SIZE {MAX_BUFFER_SIZE} \
             (pass --no-nasa to see the core's own BUFFER_OVERFLOW instead)"
        )
        .into());
    }
    Ok(())
}

fn preflight_field_count(no_nasa: bool, count: usize) -> Result<(), Box<dyn std::error::Error>> {
    if !no_nasa && count > MAX_FIELDS {
        return Err(format!(
            "schema declares {count} fields, exceeds MAX_FIELDS {MAX_FIELDS} \
             (pass --no-nasa to see the core's own SCHEMA_MISMATCH instead)"
        )
        .into());
    }
    Ok(())
}

fn cmd_validate(args: ValidateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let raw = fs::read(&args.input)
        .map_err(|e| format!("cannot read {}: {e}", args.input.display()))?;
    preflight_buffer_size(args.no_nasa, raw.len())?;

    let (schema, doc) = schema_yaml::load(&args.schema)?;
    preflight_field_count(args.no_nasa, doc.fields.len())?;

    let config = ValidatorConfig {
        enforcement_policy: resolved_policy(),
        alpha: args.alpha.unwrap_or(0.5),
        beta: args.beta.unwrap_or(0.5),
        case_sensitive: doc.normalization.case_sensitivity.unwrap_or(false),
        whitespace_fold: doc.normalization.whitespace_fold.unwrap_or(true),
        disable_zero_trust: args.no_zero_trust,
        profile_forbids_disabling_zero_trust: false,
    };
    let audit = match &args.audit_log {
        Some(path) => AuditLog::init(path, session_id())?,
        None => AuditLog::discard(session_id())?,
    };
    let validator = Validator::with_audit_log(schema, config, audit)?;
    let mut buffer = Buffer::from_bytes(raw)?;

    let result = validator.validate(&mut buffer);
    validator.audit().cleanup()?;
    let outcome = result?;
    let report = serde_json::json!({
        "message_type": doc.message_type,
        "governance_zone": format!("{:?}", outcome.governance_zone),
        "cost_value": outcome.cost.cost_value,
        "kl_divergence": outcome.cost.kl_divergence,
        "entropy_delta": outcome.cost.entropy_delta,
        "pattern_hash": uscn_core::hash::pattern_hash_hex(Some(outcome.pattern_hash)),
        "fields": outcome.fields,
    });
    write_report(&report, args.output.as_deref())?;
    if args.verbose {
        eprintln!(
            "validated: zone={:?} cost={:.6} (kl={:.6}, dH={:.6})",
            outcome.governance_zone,
            outcome.cost.cost_value,
            outcome.cost.kl_divergence,
            outcome.cost.entropy_delta
        );
    }
    Ok(())
}

fn cmd_normalize(args: NormalizeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let raw = fs::read(&args.input)
        .map_err(|e| format!("cannot read {}: {e}", args.input.display()))?;
    preflight_buffer_size(args.no_nasa, raw.len())?;

    let normalizer = Normalizer::new(NormalizerConfig::default());
    let (canonical, trace) = normalizer.normalize_with_trace(&raw);

    if args.verbose {
        for step in &trace.mapping_steps {
            eprintln!(
                "offset={} matched_len={} canonical={:?}",
                step.offset,
                step.matched_len,
                String::from_utf8_lossy(&step.canonical)
            );
        }
    }

    match &args.output {
        Some(path) => fs::write(path, &canonical)
            .map_err(|e| format!("cannot write {}: {e}", path.display()))?,
        None => std::io::stdout().write_all(&canonical)?,
    }
    Ok(())
}

fn cmd_audit(args: AuditArgs) -> Result<(), Box<dyn std::error::Error>> {
    let report = AuditLog::verify(&args.audit_log)?;
    if report.is_valid() {
        eprintln!(
            "OK: {} audit entries verified, no tampering detected",
            report.total_entries
        );
        Ok(())
    } else {
        Err(format!(
            "audit log tampered: entries {:?} failed checksum verification",
            report.mismatched_indices
        )
        .into())
    }
}

fn cmd_benchmark() -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("run `cargo bench -p uscn-bench` to execute the criterion benchmark suite");
    Ok(())
}

fn cmd_version() -> Result<(), Box<dyn std::error::Error>> {
    println!("uscn-cli {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}

fn write_report(
    report: &serde_json::Value,
    output: Option<&std::path::Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let rendered = serde_json::to_string_pretty(report)?;
    match output {
        Some(path) => fs::write(path, rendered).map_err(|e| format!("cannot write {}: {e}", path.display()))?,
        None => println!("{rendered}"),
    }
    Ok(())
}

fn session_id() -> String {
    let pid = std::process::id();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("cli_{pid}_{nanos}")
}
