use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use csv2mongo::config::{MigrationConfig, TEST_NAMESPACE_SUFFIX};
use csv2mongo::dataset_loader::DatasetLoader;
use csv2mongo::loader::VerificationReport;
use csv2mongo::normalizer::normalize_all;
use csv2mongo::pipeline::{MigrationOutcome, MigrationPipeline};
use csv2mongo::store::{Connector, MemoryConnector, MongoConnector};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "csv2mongo")]
#[command(about = "Batch migration of a CSV dataset into a MongoDB collection")]
#[command(version)]
#[command(long_about = "csv2mongo reads a delimited flat file, removes duplicate and incomplete rows, infers a type for every cell, replaces the contents of a MongoDB collection with the result, verifies what was written and exports the collection back to CSV.")]
#[command(after_help = "EXAMPLES:
    # Full migration using MONGO_* / CSV_PATH from the environment or .env
    csv2mongo migrate

    # Migrate a specific file into the test namespace without exporting
    csv2mongo migrate -i data/healthcare_dataset.csv --namespace-suffix _test --no-export

    # Rehearse the run against an in-memory collection
    csv2mongo migrate --dry-run --summary

    # Show what the loader and normalizer make of a file
    csv2mongo inspect -i data/healthcare_dataset.csv --format json")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Set log level explicitly
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(ValueEnum, Clone, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Text,
    Json,
}

/// Overrides shared by commands that reach the collection
#[derive(clap::Args, Debug, Default)]
struct ConnectionArgs {
    /// Suffix for the database and collection names (e.g. _test), replacing MONGO_NAMESPACE_SUFFIX
    #[arg(long, value_name = "SUFFIX")]
    namespace_suffix: Option<String>,

    /// Use the test namespace (same as --namespace-suffix _test)
    #[arg(long, conflicts_with = "namespace_suffix")]
    test_namespace: bool,

    /// Number of connection attempts (default: 20)
    #[arg(long)]
    retries: Option<u32>,

    /// Seconds between connection attempts (default: 2)
    #[arg(long, value_name = "SECONDS")]
    retry_delay: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, normalize, replace the collection, verify and export
    Migrate {
        /// Source CSV file (default: CSV_PATH)
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Export destination (default: EXPORT_PATH)
        #[arg(short, long, value_name = "FILE")]
        export: Option<PathBuf>,

        /// Skip the export step
        #[arg(long, conflicts_with = "export")]
        no_export: bool,

        /// Run against an in-memory collection instead of MongoDB
        #[arg(long)]
        dry_run: bool,

        /// Print a JSON summary of the run
        #[arg(long)]
        summary: bool,

        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// Load and normalize a file without touching the database
    Inspect {
        /// Source CSV file (default: CSV_PATH)
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Number of records to print
        #[arg(long, default_value = "5")]
        limit: usize,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Check the current collection against a source file
    Verify {
        /// Source CSV file (default: CSV_PATH)
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        connection: ConnectionArgs,
    },

    /// Export the current collection to CSV
    Export {
        /// Destination file (default: EXPORT_PATH)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        connection: ConnectionArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    info!("Starting csv2mongo v{}", env!("CARGO_PKG_VERSION"));

    let mut config = MigrationConfig::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Migrate {
            input,
            export,
            no_export,
            dry_run,
            summary,
            connection,
        } => {
            apply_connection_args(&mut config, &connection);
            if let Some(input) = input {
                config.input_path = input;
            }
            if let Some(export) = export {
                config.export_path = export;
            }
            config.validate()?;

            let result = if dry_run {
                info!("Dry run: using an in-memory collection for {}", config.mongo.namespace());
                let connector = MemoryConnector::for_config(&config.mongo);
                execute_migrate(MigrationPipeline::new(config, connector).with_export(!no_export)).await
            } else {
                execute_migrate(MigrationPipeline::new(config, MongoConnector).with_export(!no_export)).await
            };

            match result {
                Ok(outcome) => {
                    info!("Summary: {}", outcome.summary());
                    if summary {
                        println!("{}", serde_json::to_string_pretty(&outcome)?);
                    }
                    if !outcome.is_successful() {
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    eprintln!("Migration failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Inspect { input, limit, format } => {
            if let Some(input) = input {
                config.input_path = input;
            }
            if let Err(e) = execute_inspect(&config, limit, format) {
                eprintln!("Inspection failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Verify {
            input,
            format,
            connection,
        } => {
            apply_connection_args(&mut config, &connection);
            if let Some(input) = input {
                config.input_path = input;
            }
            config.validate()?;

            match MigrationPipeline::new(config, MongoConnector).verify_only().await {
                Ok(report) => {
                    print_verification(&report, format)?;
                    if !report.is_valid {
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    eprintln!("Verification failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Export { output, connection } => {
            apply_connection_args(&mut config, &connection);
            if let Some(output) = output {
                config.export_path = output;
            }
            config.validate()?;

            match MigrationPipeline::new(config, MongoConnector).export_only().await {
                Ok(summary) => {
                    println!("✓ Exported {} documents to {:?}", summary.documents, summary.path);
                }
                Err(e) => {
                    eprintln!("Export failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn apply_connection_args(config: &mut MigrationConfig, args: &ConnectionArgs) {
    if args.test_namespace {
        config.mongo = config.mongo.with_namespace_suffix(TEST_NAMESPACE_SUFFIX);
    } else if let Some(suffix) = &args.namespace_suffix {
        config.mongo = config.mongo.with_namespace_suffix(suffix);
    }
    if let Some(retries) = args.retries {
        config.retry.attempts = retries;
    }
    if let Some(delay) = args.retry_delay {
        config.retry.delay = Duration::from_secs(delay);
    }
}

/// Execute the migration pipeline against any connector
async fn execute_migrate<C: Connector>(pipeline: MigrationPipeline<C>) -> Result<MigrationOutcome> {
    info!(
        "Migrating {:?} into {}",
        pipeline.config().input_path,
        pipeline.config().mongo.namespace()
    );
    let outcome = pipeline.run().await?;

    if !outcome.verification.is_valid {
        error!("Verification reported {} errors", outcome.verification.errors.len());
    }
    Ok(outcome)
}

/// Load and normalize the input, then print the cleaning report and a sample of records
fn execute_inspect(config: &MigrationConfig, limit: usize, format: OutputFormat) -> Result<()> {
    let dataset = DatasetLoader::new()
        .load(&config.input_path)
        .with_context(|| format!("Failed to load {:?}", config.input_path))?;
    let normalized = normalize_all(&dataset.rows);
    let sample: Vec<_> = normalized.records.iter().take(limit).collect();

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "columns": dataset.columns,
                "cleaning": dataset.report,
                "statistics": normalized.statistics,
                "records": sample,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            let report = &dataset.report;
            println!("File: {:?}", config.input_path);
            println!("Columns: {}", dataset.columns.join(", "));
            println!("Rows read: {}", report.input_rows);
            println!("Duplicates removed: {}", report.duplicates_removed);
            println!(
                "Rows dropped for missing values: {} ({} missing cells)",
                report.rows_with_missing_dropped, report.missing_cells
            );
            println!("Rows kept: {}", report.output_rows);

            let stats = &normalized.statistics;
            println!(
                "Field kinds: {} integer, {} decimal, {} date, {} text, {} null",
                stats.integers, stats.decimals, stats.dates, stats.texts, stats.nulls
            );

            for record in sample {
                let fields: Vec<String> = record
                    .fields()
                    .map(|(name, value)| format!("{}={} ({})", name, value, value.kind()))
                    .collect();
                println!("  {}", fields.join(", "));
            }
        }
    }

    Ok(())
}

fn print_verification(report: &VerificationReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            if report.is_valid {
                println!("✓ Collection is valid ({} documents)", report.document_count);
            } else {
                eprintln!("✗ Collection verification failed");
                eprintln!("Errors found: {}", report.errors.len());
                for error in &report.errors {
                    eprintln!("  - {}", error);
                }
            }
            for warning in &report.warnings {
                println!("  ! {}", warning);
            }
        }
    }
    Ok(())
}

/// Initialize logging based on CLI options
fn initialize_logging(cli: &Cli) -> Result<()> {
    let log_level = if let Some(level) = &cli.log_level {
        level.clone().into()
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    if cli.json_logs {
        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_target(false)
            .with_thread_ids(cli.verbose)
            .with_file(cli.verbose)
            .with_line_number(cli.verbose)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_target(false)
            .with_thread_ids(cli.verbose)
            .with_file(cli.verbose)
            .with_line_number(cli.verbose)
            .init();
    }

    Ok(())
}
