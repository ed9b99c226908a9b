//! schema-compat CLI
//!
//! Command-line interface for preparing, checking and linting
//! structured-output schemas.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use schema_compat::{
    find_open_dictionary, lint, load_schema, load_schema_auto, normalize, prepare_schema,
    select_strategy, validate_extracted, FileStatus, PrepareOptions, Severity, ValidateError,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-compat")]
#[command(about = "Normalize and validate structured-output JSON Schemas")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare a schema for a strict structured-output consumer
    Normalize {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Keep local $ref pointers instead of inlining acyclic definitions
        #[arg(long)]
        no_resolve: bool,
    },

    /// Report whether a schema is compatible after normalization
    Check {
        /// Schema source: file path or URL (http:// or https://)
        schema: String,
    },

    /// Print the extraction strategy selected for a schema
    Select {
        /// Schema source (no schema selects the baseline strategy)
        schema: Option<String>,
    },

    /// Validate extracted data against a schema
    Validate {
        /// Extracted data file to validate
        data: PathBuf,

        /// Schema the extraction was requested with
        #[arg(long)]
        schema: String,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Lint schema files (syntax, broken refs, open dictionaries)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Normalize {
            schema,
            output,
            pretty,
            no_resolve,
        } => run_normalize(&schema, output, pretty, no_resolve),
        Commands::Check { schema } => run_check(&schema),
        Commands::Select { schema } => run_select(schema.as_deref()),
        Commands::Validate { data, schema, json } => run_validate(&data, &schema, json),
        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(source: &str) -> Result<Value, u8> {
    load_schema_auto(source).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })
}

fn run_normalize(
    schema_source: &str,
    output: Option<PathBuf>,
    pretty: bool,
    no_resolve: bool,
) -> Result<(), u8> {
    let schema = load(schema_source)?;

    let options = PrepareOptions::new().resolve_refs(!no_resolve);
    let prepared = prepare_schema(&schema, &options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let json_output = if pretty {
        serde_json::to_string_pretty(&prepared)
    } else {
        serde_json::to_string(&prepared)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => println!("{}", json_output),
    }

    Ok(())
}

fn run_check(schema_source: &str) -> Result<(), u8> {
    let schema = load(schema_source)?;

    match find_open_dictionary(&normalize(&schema)) {
        None => {
            println!("compatible");
            Ok(())
        }
        Some(pointer) => {
            let pointer = if pointer.is_empty() { "/" } else { pointer.as_str() };
            println!("incompatible at {}", pointer);
            Err(1)
        }
    }
}

fn run_select(schema_source: Option<&str>) -> Result<(), u8> {
    let schema = schema_source.map(load).transpose()?;
    let strategy = select_strategy(schema.as_ref());
    let output = serde_json::to_string(&strategy).map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", output);
    Ok(())
}

fn run_validate(data_path: &Path, schema_source: &str, json_output: bool) -> Result<(), u8> {
    let data = load_schema(data_path).map_err(|e| {
        report_error(json_output, &format!("loading data: {}", e));
        e.exit_code() as u8
    })?;
    let schema = load_schema_auto(schema_source).map_err(|e| {
        report_error(json_output, &format!("loading schema: {}", e));
        e.exit_code() as u8
    })?;

    match validate_extracted(&schema, &data) {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { errors }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(e) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);
    let passed = result.is_ok() && (!strict || result.warnings == 0);

    if format == "json" {
        let output = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", output);
        return if passed { Ok(()) } else { Err(1) };
    }

    if !quiet {
        println!("Linting {} ...\n", path.display());
    }

    for file_result in &result.results {
        let status_icon = match file_result.status {
            FileStatus::Ok => "\x1b[32m✓\x1b[0m",
            FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
            FileStatus::Error => "\x1b[31m✗\x1b[0m",
        };

        if !quiet || file_result.status != FileStatus::Ok {
            println!("  {} {}", status_icon, file_result.file.display());
        }

        for diag in &file_result.diagnostics {
            let (color, label) = match diag.severity {
                Severity::Error => ("\x1b[31m", "error"),
                Severity::Warning => ("\x1b[33m", "warning"),
            };
            if !quiet || diag.severity == Severity::Error {
                println!(
                    "    {}{}[{}]\x1b[0m: {} - {}",
                    color, label, diag.code, diag.path, diag.message
                );
            }
        }
    }

    println!();
    if passed {
        println!(
            "\x1b[32m✓ {} files checked, all passed\x1b[0m",
            result.files_checked
        );
        Ok(())
    } else {
        println!(
            "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
            result.files_checked, result.passed, result.failed, result.errors, result.warnings
        );
        Err(1)
    }
}
