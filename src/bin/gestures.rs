//! Gestures CLI - Command-line interface for touch gesture recognition
//!
//! Commands:
//! - replay: Run a recorded contact stream through a recognizer
//! - validate: Check a recorded contact stream for schema and lifecycle errors
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use touch_gestures::encoder::{InteractionEncoder, InteractionRecord};
use touch_gestures::schema::{ContactEvent, ReplayAdapter, SCHEMA_VERSION};
use touch_gestures::{GestureConfig, GestureError, CRATE_VERSION, PRODUCER_NAME};

/// Gestures - endpoint-based touch gesture recognition
#[derive(Parser)]
#[command(name = "gestures")]
#[command(version = CRATE_VERSION)]
#[command(about = "Recognize taps, holds and swipes in recorded touch input", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay contact events and print the interactions they produce
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Recognizer configuration (JSON file)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Fail if the stream contains protocol violations
        #[arg(long)]
        strict: bool,
    },

    /// Validate contact events
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one interaction record per line)
    Ndjson,
    /// JSON array of interaction records
    Json,
    /// Pretty-printed JSON
    JsonPretty,
    /// One serial per line
    Serial,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so they never mix with records on stdout
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), GesturesCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            input_format,
            output_format,
            config,
            strict,
        } => cmd_replay(
            &input,
            &output,
            input_format,
            output_format,
            config.as_deref(),
            strict,
        ),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn read_input(input: &Path) -> Result<String, GesturesCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_events(input: &Path, format: InputFormat) -> Result<Vec<ContactEvent>, GesturesCliError> {
    let data = read_input(input)?;
    let events = match format {
        InputFormat::Ndjson => ReplayAdapter::parse_ndjson(&data)?,
        InputFormat::Json => ReplayAdapter::parse_array(&data)?,
    };

    if events.is_empty() {
        return Err(GesturesCliError::NoEvents);
    }
    Ok(events)
}

fn load_config(path: Option<&Path>) -> Result<GestureConfig, GesturesCliError> {
    match path {
        Some(path) => Ok(GestureConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(GestureConfig::default()),
    }
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: Option<&Path>,
    strict: bool,
) -> Result<(), GesturesCliError> {
    let config = load_config(config)?;
    let events = read_events(input, input_format)?;

    let invalid = ReplayAdapter::validate_events(&events);
    if let Some(first) = invalid.into_iter().next() {
        return Err(GesturesCliError::Library(first.error.into()));
    }

    let outcome = ReplayAdapter::replay(&events, &config)?;
    for v in &outcome.violations {
        warn!(index = v.index, "{}", v.violation);
    }
    if outcome.still_active > 0 {
        warn!(contacts = outcome.still_active, "contacts still down at end of input");
    }
    info!(
        events = events.len(),
        interactions = outcome.interactions.len(),
        "replay finished"
    );

    if strict && !outcome.violations.is_empty() {
        return Err(GesturesCliError::ProtocolViolations(outcome.violations.len()));
    }

    let mut encoder = InteractionEncoder::new();
    let records: Vec<_> = outcome
        .interactions
        .into_iter()
        .map(|interaction| encoder.encode(interaction))
        .collect();

    let output_data = format_output(&records, &output_format)?;
    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), GesturesCliError> {
    let events = read_events(input, input_format)?;

    let mut errors: Vec<ValidationErrorDetail> = ReplayAdapter::validate_events(&events)
        .into_iter()
        .map(|r| ValidationErrorDetail {
            index: r.index,
            contact: r.contact.0,
            error: r.error.to_string(),
        })
        .collect();
    errors.extend(
        ReplayAdapter::validate_lifecycle(&events)
            .into_iter()
            .map(|issue| ValidationErrorDetail {
                index: issue.index,
                contact: issue.contact.0,
                error: issue.kind.to_string(),
            }),
    );
    errors.sort_by_key(|e| e.index);

    let report = ValidationReport {
        total_events: events.len(),
        issues: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total events: {}", report.total_events);
        println!("Issues:       {}", report.issues);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Contact #{} (index {}): {}",
                    err.contact, err.index, err.error
                );
            }
        }
    }

    if report.issues > 0 {
        Err(GesturesCliError::ValidationFailed(report.issues))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), GesturesCliError> {
    let mut checks: Vec<DoctorCheck> = vec![
        DoctorCheck {
            name: "version".to_string(),
            status: CheckStatus::Ok,
            message: format!("touch-gestures version {}", CRATE_VERSION),
        },
        DoctorCheck {
            name: "schema_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Input schema: {}", SCHEMA_VERSION),
        },
    ];

    if let Some(config_path) = config {
        let check = if !config_path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist".to_string(),
            }
        } else {
            match load_config(Some(config_path)) {
                Ok(config) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "Config valid (tap <= {}ms and {}px, swipe >= {}px, margin {}deg)",
                        config.max_tap_duration_ms,
                        config.max_tap_movement,
                        config.min_swipe_movement,
                        config.swipe_angle_margin_deg
                    ),
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: CliError::from(e).message,
                },
            }
        };
        checks.push(check);
    }

    checks.push(if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --input <file> to replay)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: CRATE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Gestures Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(GesturesCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn format_output<E: serde::Serialize>(
    records: &[InteractionRecord<E>],
    format: &OutputFormat,
) -> Result<String, GesturesCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for record in records {
                lines.push(serde_json::to_string(record)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(records)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(records)?),
        OutputFormat::Serial => {
            let serials: Vec<&str> = records
                .iter()
                .map(|r| r.interaction.serial.as_str())
                .collect();
            Ok(serials.join("\n") + "\n")
        }
    }
}

// Error types

#[derive(Debug)]
enum GesturesCliError {
    Io(io::Error),
    Json(serde_json::Error),
    Library(GestureError),
    NoEvents,
    ValidationFailed(usize),
    ProtocolViolations(usize),
    DoctorFailed,
}

impl From<io::Error> for GesturesCliError {
    fn from(e: io::Error) -> Self {
        GesturesCliError::Io(e)
    }
}

impl From<serde_json::Error> for GesturesCliError {
    fn from(e: serde_json::Error) -> Self {
        GesturesCliError::Json(e)
    }
}

impl From<GestureError> for GesturesCliError {
    fn from(e: GestureError) -> Self {
        GesturesCliError::Library(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<GesturesCliError> for CliError {
    fn from(e: GesturesCliError) -> Self {
        match e {
            GesturesCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            GesturesCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            GesturesCliError::Library(e) => {
                let (code, hint) = match &e {
                    GestureError::InvalidConfig { .. } => {
                        ("CONFIG_ERROR", "Check the configuration values")
                    }
                    GestureError::ParseError(_) | GestureError::JsonError(_) => (
                        "PARSE_ERROR",
                        "Ensure input matches the touch.contact_event.v1 schema",
                    ),
                    GestureError::InvalidEvent(_) => {
                        ("VALIDATION_ERROR", "Run 'gestures validate' for details")
                    }
                    _ => ("GESTURE_ERROR", "Run 'gestures doctor' for details"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            GesturesCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            GesturesCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} issues found", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            GesturesCliError::ProtocolViolations(count) => CliError {
                code: "PROTOCOL_VIOLATIONS".to_string(),
                message: format!("{} protocol violations during replay", count),
                hint: Some("Run 'gestures validate' for details".to_string()),
            },
            GesturesCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_events: usize,
    issues: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    contact: i64,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
