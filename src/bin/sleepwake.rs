//! sleepwake CLI - Command-line interface for sleepwake-flux
//!
//! Commands:
//! - predict: Detect onset/wakeup events for a sensor table
//! - features: Dump the engineered feature rows
//! - validate: Validate an input sensor table
//! - doctor: Diagnose model and environment readiness
//! - schema: Print input/output schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use sleepwake_flux::types::{Event, EventSummary, FEATURE_NAMES, REQUIRED_COLUMNS};
use sleepwake_flux::{
    load_classifier, DetectError, ErrorKind, EventEncoder, OutputLayout, PipelineConfig,
    SensorTable, SleepPipeline, WindowScope, FLUX_VERSION, PRODUCER_NAME,
};

/// sleepwake - Sleep onset and wakeup detection from wrist accelerometry
#[derive(Parser)]
#[command(name = "sleepwake")]
#[command(author = "Synheart AI Inc")]
#[command(version = FLUX_VERSION)]
#[command(about = "Detect sleep onset and wakeup events", long_about = None)]
struct Cli {
    /// Log pipeline progress to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect events for every row of a sensor table
    Predict {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Model artifact (JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// Input format
        #[arg(long, default_value = "records")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,

        /// Pipeline configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the probability smoothing width
        #[arg(long)]
        smoothing_window: Option<usize>,

        /// Restart rolling windows at every series
        #[arg(long)]
        per_series_windows: bool,

        /// Emit features, probabilities and smoothing state with each event
        #[arg(long)]
        detailed: bool,

        /// Print per-series event counts to stderr
        #[arg(long)]
        summary: bool,
    },

    /// Dump the engineered feature rows
    Features {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "records")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Pipeline configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Restart rolling windows at every series
        #[arg(long)]
        per_series_windows: bool,
    },

    /// Validate an input sensor table
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "records")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose model and environment readiness
    Doctor {
        /// Model artifact to check
        #[arg(long)]
        model: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// JSON array of row records
    Records,
    /// Newline-delimited JSON (one row per line)
    Ndjson,
    /// JSON object of column arrays
    Columns,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// JSON array of records
    Json,
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// Pretty-printed JSON
    JsonPretty,
}

impl From<OutputFormat> for OutputLayout {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => OutputLayout::Records,
            OutputFormat::Ndjson => OutputLayout::Ndjson,
            OutputFormat::JsonPretty => OutputLayout::Pretty,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input sensor table
    Input,
    /// Output event table
    Output,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

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

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

fn run(cli: Cli) -> Result<(), SleepwakeCliError> {
    match cli.command {
        Commands::Predict {
            input,
            output,
            model,
            input_format,
            output_format,
            config,
            smoothing_window,
            per_series_windows,
            detailed,
            summary,
        } => {
            let mut config = load_config(config.as_deref(), per_series_windows)?;
            if let Some(width) = smoothing_window {
                config = config.with_smoothing_window(width);
            }
            cmd_predict(
                &input,
                &output,
                &model,
                input_format,
                output_format,
                config,
                detailed,
                summary,
            )
        }

        Commands::Features {
            input,
            output,
            input_format,
            output_format,
            config,
            per_series_windows,
        } => {
            let config = load_config(config.as_deref(), per_series_windows)?;
            cmd_features(&input, &output, input_format, output_format, config)
        }

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor { model, json } => cmd_doctor(model.as_deref(), json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_predict(
    input: &Path,
    output: &Path,
    model: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: PipelineConfig,
    detailed: bool,
    summary: bool,
) -> Result<(), SleepwakeCliError> {
    let table = read_table(input, input_format)?;
    let classifier = load_classifier(model)?;
    let pipeline = SleepPipeline::with_config(classifier, config)?;
    let encoder = EventEncoder::with_layout(output_format.into());

    let predictions = pipeline.run_detailed(&table)?;
    let events: Vec<Event> = predictions.iter().map(Event::from).collect();

    let output_data = if detailed {
        encoder.encode(&predictions)?
    } else {
        encoder.encode(&events)?
    };
    write_output(output, &output_data)?;

    if summary {
        let summary = EventSummary::from_events(&events);
        eprintln!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}

fn cmd_features(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: PipelineConfig,
) -> Result<(), SleepwakeCliError> {
    config.validate()?;
    let table = read_table(input, input_format)?;
    let rows = sleepwake_flux::FeatureBuilder::new(&config).build_table(&table)?;

    let output_data = EventEncoder::with_layout(output_format.into()).encode(&rows)?;
    write_output(output, &output_data)
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormat,
    json: bool,
) -> Result<(), SleepwakeCliError> {
    let table = read_table(input, input_format)?;
    let report = table.validate_report();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total rows:   {}", report.total_rows);
        println!("Series:       {}", report.series_count);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - {}", err);
            }
        }
        if !report.warnings.is_empty() {
            println!("\nWarnings:");
            for warning in &report.warnings {
                println!("  - {}", warning);
            }
        }
    }

    if report.is_valid() {
        Ok(())
    } else {
        Err(SleepwakeCliError::ValidationFailed(report.errors.len()))
    }
}

fn cmd_doctor(model: Option<&Path>, json: bool) -> Result<(), SleepwakeCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("sleepwake-flux version {}", FLUX_VERSION),
    });

    let defaults = PipelineConfig::default();
    checks.push(DoctorCheck {
        name: "pipeline_defaults".to_string(),
        status: CheckStatus::Ok,
        message: format!(
            "diff periods {}, feature window {}, smoothing window {}",
            defaults.diff_periods, defaults.feature_window, defaults.smoothing_window
        ),
    });

    match model {
        Some(path) => match load_classifier(path) {
            Ok(classifier) => {
                checks.push(DoctorCheck {
                    name: "model".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("Model loaded from {}", path.display()),
                });

                let unknown: Vec<String> = classifier
                    .feature_names()
                    .into_iter()
                    .filter(|name| !FEATURE_NAMES.contains(&name.as_str()))
                    .collect();
                checks.push(if unknown.is_empty() {
                    DoctorCheck {
                        name: "features".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "All {} model features are derived",
                            classifier.feature_names().len()
                        ),
                    }
                } else {
                    DoctorCheck {
                        name: "features".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Model expects unknown features: {}", unknown.join(", ")),
                    }
                });
            }
            Err(e) => checks.push(DoctorCheck {
                name: "model".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            }),
        },
        None => checks.push(DoctorCheck {
            name: "model".to_string(),
            status: CheckStatus::Warning,
            message: "No model given; pass --model to check one".to_string(),
        }),
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("sleepwake Doctor Report");
        println!("=======================");
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
        Err(SleepwakeCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), SleepwakeCliError> {
    match schema_type {
        SchemaType::Input => {
            if json_schema {
                println!("{}", get_input_json_schema());
            } else {
                println!("Input: one row per sensor step");
                println!();
                println!("Required columns: {}", REQUIRED_COLUMNS.join(", "));
                println!();
                println!("- series_id: Recording identifier (string)");
                println!("- step: Position within the series (integer)");
                println!("- timestamp: ISO-8601 with or without offset; local wall time is kept");
                println!("- anglez: Wrist angle in degrees (number)");
                println!("- enmo: Euclidean norm minus one in g (number, non-negative)");
                println!();
                println!("Accepted layouts: records (JSON array), ndjson, columns (object of arrays)");
            }
        }
        SchemaType::Output => {
            if json_schema {
                println!("{}", get_output_json_schema());
            } else {
                println!("Output: one event per input row, in input order");
                println!();
                println!("- series_id: Recording identifier");
                println!("- step: Step of the input row");
                println!("- event: \"wakeup\" at the first and last row of a detected run, \"onset\" elsewhere");
                println!();
                println!("With --detailed each record also carries sample, features,");
                println!("not_awake, awake, score and smooth.");
                println!();
                println!("Model features: {}", FEATURE_NAMES.join(", "));
            }
        }
    }

    Ok(())
}

// Helper functions

fn load_config(
    path: Option<&Path>,
    per_series_windows: bool,
) -> Result<PipelineConfig, SleepwakeCliError> {
    let config = match path {
        Some(path) => PipelineConfig::from_json(&fs::read_to_string(path)?)?,
        None => PipelineConfig::default(),
    };
    Ok(if per_series_windows {
        config.with_window_scope(WindowScope::PerSeries)
    } else {
        config
    })
}

fn read_table(input: &Path, input_format: InputFormat) -> Result<SensorTable, SleepwakeCliError> {
    let input_data = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    let table = match input_format {
        InputFormat::Records => SensorTable::from_records_json(&input_data)?,
        InputFormat::Ndjson => SensorTable::from_ndjson(&input_data)?,
        InputFormat::Columns => SensorTable::from_columns_json(&input_data)?,
    };
    log::debug!("read {} rows from {}", table.len(), input.display());
    Ok(table)
}

fn write_output(output: &Path, data: &str) -> Result<(), SleepwakeCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn get_input_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "sleepwake.sensor_row",
        "description": "One wrist accelerometry sample",
        "type": "object",
        "required": REQUIRED_COLUMNS,
        "properties": {
            "series_id": { "type": "string" },
            "step": { "type": "integer" },
            "timestamp": { "type": "string", "format": "date-time" },
            "anglez": { "type": ["number", "null"] },
            "enmo": { "type": ["number", "null"], "minimum": 0 }
        }
    })
    .to_string()
}

fn get_output_json_schema() -> String {
    serde_json::json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "sleepwake.event_row",
        "description": "Event label for one input row",
        "type": "object",
        "required": ["series_id", "step", "event"],
        "properties": {
            "series_id": { "type": "string" },
            "step": { "type": "integer" },
            "event": { "type": "string", "enum": ["onset", "wakeup"] }
        }
    })
    .to_string()
}

// Error types

#[derive(Debug)]
enum SleepwakeCliError {
    Io(io::Error),
    Detect(DetectError),
    Json(serde_json::Error),
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for SleepwakeCliError {
    fn from(e: io::Error) -> Self {
        SleepwakeCliError::Io(e)
    }
}

impl From<DetectError> for SleepwakeCliError {
    fn from(e: DetectError) -> Self {
        SleepwakeCliError::Detect(e)
    }
}

impl From<serde_json::Error> for SleepwakeCliError {
    fn from(e: serde_json::Error) -> Self {
        SleepwakeCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SleepwakeCliError> for CliError {
    fn from(e: SleepwakeCliError) -> Self {
        match e {
            SleepwakeCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SleepwakeCliError::Detect(e) => {
                let hint = match e.kind() {
                    ErrorKind::Data => "Run 'sleepwake validate' for details",
                    ErrorKind::ModelUnavailable => "Run 'sleepwake doctor --model <path>'",
                    ErrorKind::Internal => "Report this with the input that triggered it",
                };
                CliError {
                    code: e.kind().code().to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            SleepwakeCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            SleepwakeCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} validation errors", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            SleepwakeCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

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
