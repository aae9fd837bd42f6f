//! Healthsync CLI - Command-line interface for Healthsync Flux
//!
//! Commands:
//! - process: Compute the dashboard from stored export documents
//! - validate: Check export documents for unusable entries
//! - doctor: Diagnose configuration and environment
//! - metrics: List canonical metrics and the names they resolve from

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use healthsync_flux::aggregator::StandHoursZero;
use healthsync_flux::schema::{ExportAdapter, ExportDocument, EXPORT_FORMAT};
use healthsync_flux::{
    CanonicalMetric, ComputeError, HealthProcessor, LocalZone, ProcessorConfig,
    HEALTHSYNC_VERSION, PRODUCER_NAME,
};

/// Healthsync - Daily aggregation for Health Auto Export payloads
#[derive(Parser)]
#[command(name = "healthsync")]
#[command(version = HEALTHSYNC_VERSION)]
#[command(about = "Aggregate health metric exports into daily dashboard data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the dashboard from stored export documents
    Process {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Check export documents for unusable entries
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Zone for timestamps without an offset
        #[arg(long, default_value = "local")]
        timezone: String,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Config file to check
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List canonical metrics and the names they resolve from
    Metrics {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Settings that override the config file
#[derive(clap::Args)]
struct SettingsArgs {
    /// Config file (.toml or .json); defaults to ./healthsync.toml or ./healthsync.json
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Zone for calendar days: "local", "UTC", or an offset like "-08:00"
    #[arg(long)]
    timezone: Option<String>,

    /// Rolling-average window in days
    #[arg(long)]
    trend_window: Option<usize>,

    /// Only use exports ingested within this many days
    #[arg(long)]
    window_days: Option<u32>,

    /// Comma-separated metric keys for the time series (e.g. steps,vo2Max)
    #[arg(long, value_delimiter = ',')]
    tracked: Option<Vec<String>>,

    /// Report zero instead of null for days with no qualifying stand hour
    #[arg(long)]
    stand_hours_zero: bool,
}

impl SettingsArgs {
    fn resolve(&self) -> Result<ProcessorConfig, CliFailure> {
        let mut config = ProcessorConfig::load(self.config.as_deref())?;

        if let Some(tz) = &self.timezone {
            config.timezone = LocalZone::parse(tz)?;
        }
        if let Some(window) = self.trend_window {
            config.trend_window = window;
        }
        if let Some(days) = self.window_days {
            config.window_days = Some(days);
        }
        if let Some(keys) = &self.tracked {
            config.tracked = keys
                .iter()
                .map(|key| {
                    CanonicalMetric::from_key(key).ok_or_else(|| CliFailure::UnknownMetric(key.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
        }
        if self.stand_hours_zero {
            config.stand_hours_zero = StandHoursZero::Zero;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// JSON array, `{"data": [...]}` envelope, or one document
    Json,
    /// Newline-delimited JSON (one document per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr so stdout stays clean JSON
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("healthsync_flux=info,healthsync=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), CliFailure> {
    match cli.command {
        Commands::Process {
            input,
            output,
            input_format,
            output_format,
            settings,
        } => cmd_process(&input, &output, input_format, output_format, &settings),

        Commands::Validate {
            input,
            input_format,
            timezone,
            json,
        } => cmd_validate(&input, input_format, &timezone, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),

        Commands::Metrics { json } => cmd_metrics(json),
    }
}

fn read_input(input: &Path) -> Result<String, CliFailure> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn parse_documents(data: &str, format: &InputFormat) -> Result<Vec<ExportDocument>, CliFailure> {
    let documents = match format {
        InputFormat::Json => ExportAdapter::parse_json(data)?,
        InputFormat::Ndjson => ExportAdapter::parse_ndjson(data)?,
    };
    Ok(documents)
}

fn cmd_process(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    settings: &SettingsArgs,
) -> Result<(), CliFailure> {
    let config = settings.resolve()?;
    let data = read_input(input)?;
    let documents = parse_documents(&data, &input_format)?;

    let processor = HealthProcessor::new(config)?;
    let (dashboard, report) = processor.process_documents(&documents, Utc::now())?;
    info!(
        documents = report.documents,
        samples = report.samples_kept,
        skipped = report.samples_skipped,
        "converted export documents"
    );

    let payload = processor.encoder().encode(dashboard, processor.config());
    let rendered = match output_format {
        OutputFormat::Json => serde_json::to_string(&payload)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&payload)?,
    };

    if output.to_string_lossy() == "-" {
        println!("{}", rendered);
    } else {
        fs::write(output, rendered + "\n")?;
    }
    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    timezone: &str,
    json: bool,
) -> Result<(), CliFailure> {
    let zone = LocalZone::parse(timezone)?;
    let data = read_input(input)?;
    let documents = parse_documents(&data, &input_format)?;

    let results = ExportAdapter::validate_documents(&documents, &zone);
    let report = ValidationReport {
        format: EXPORT_FORMAT.to_string(),
        total_documents: documents.len(),
        valid_documents: documents.len() - results.len(),
        invalid_documents: results.len(),
        errors: results
            .iter()
            .flat_map(|r| {
                r.errors.iter().map(move |e| ValidationErrorDetail {
                    index: r.index,
                    error: e.to_string(),
                })
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total documents:   {}", report.total_documents);
        println!("Valid documents:   {}", report.valid_documents);
        println!("Invalid documents: {}", report.invalid_documents);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Document {}: {}", err.index, err.error);
            }
        }
    }

    if report.invalid_documents > 0 {
        Err(CliFailure::ValidationFailed(report.invalid_documents))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), CliFailure> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} {}", PRODUCER_NAME, HEALTHSYNC_VERSION),
    });

    checks.push(DoctorCheck {
        name: "input_format".to_string(),
        status: CheckStatus::Ok,
        message: format!("Accepts {} documents", EXPORT_FORMAT),
    });

    match ProcessorConfig::load(config_path) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Config valid (trend window {} days, {} tracked metrics)",
                    config.trend_window,
                    config.tracked.len()
                ),
            });
            let today = config.timezone.today(Utc::now());
            checks.push(DoctorCheck {
                name: "timezone".to_string(),
                status: CheckStatus::Ok,
                message: format!("Days bucketed in {} (today is {})", config.timezone, today),
            });
        }
        Err(e) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        }),
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Warning,
            message: "stdin is a TTY; pass --input <file> or pipe documents".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready for --input -)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: HEALTHSYNC_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Healthsync Doctor Report");
        println!("========================");
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

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(CliFailure::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_metrics(json: bool) -> Result<(), CliFailure> {
    let metrics: Vec<MetricInfo> = CanonicalMetric::ALL
        .iter()
        .map(|m| MetricInfo {
            key: m.key(),
            label: m.label(),
            unit: m.unit(),
            aggregation: m.policy().as_str(),
            aliases: m.aliases(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        for m in &metrics {
            println!(
                "{:<22} {:<10} {:<10} {}",
                m.key,
                m.aggregation,
                m.unit,
                m.aliases.join(", ")
            );
        }
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum CliFailure {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    UnknownMetric(String),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for CliFailure {
    fn from(e: io::Error) -> Self {
        CliFailure::Io(e)
    }
}

impl From<ComputeError> for CliFailure {
    fn from(e: ComputeError) -> Self {
        CliFailure::Compute(e)
    }
}

impl From<serde_json::Error> for CliFailure {
    fn from(e: serde_json::Error) -> Self {
        CliFailure::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CliFailure> for CliError {
    fn from(e: CliFailure) -> Self {
        match e {
            CliFailure::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CliFailure::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::InvalidConfig(_) => {
                        ("CONFIG_ERROR", "Run 'healthsync doctor' to check the config")
                    }
                    ComputeError::InvalidTimezone(_) => {
                        ("TIMEZONE_ERROR", "Use \"local\", \"UTC\", or an offset like -08:00")
                    }
                    ComputeError::MissingField(_) | ComputeError::DateParseError(_) => {
                        ("DOCUMENT_ERROR", "Run 'healthsync validate' for details")
                    }
                    _ => ("PARSE_ERROR", "Ensure input is stored Health Auto Export JSON"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            CliFailure::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CliFailure::UnknownMetric(key) => CliError {
                code: "UNKNOWN_METRIC".to_string(),
                message: format!("Unknown metric: {}", key),
                hint: Some("Run 'healthsync metrics' for valid keys".to_string()),
            },
            CliFailure::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} documents failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            CliFailure::DoctorFailed => CliError {
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
    format: String,
    total_documents: usize,
    valid_documents: usize,
    invalid_documents: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
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

#[derive(serde::Serialize)]
struct MetricInfo {
    key: &'static str,
    label: &'static str,
    unit: &'static str,
    aggregation: &'static str,
    aliases: &'static [&'static str],
}
