//! flatc-batch - compile a batch of FlatBuffers schemas
//!
//! Runs `flatc` once per schema, in order, and prints which schemas
//! compiled and which were rejected.
//!
//! Schemas come from positional arguments (files or directories of `.fbs`
//! files) and/or a list file given with `--list`.
//!
//! ## Exit codes
//!
//! - `0`: every schema compiled (or nothing was selected)
//! - `1`: at least one schema was rejected by the compiler
//! - `2`: the compiler could not be launched, or setup failed

use anyhow::{Context, Result};
use clap::Parser;
use flatc_batch::{
    BatchConfig, BatchReport, BatchRunner, ChainedSource, InputSource, ItemStatus,
    ListFileSource, PathListSource,
};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

const EXIT_ITEM_FAILED: u8 = 1;
const EXIT_ENVIRONMENT: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "flatc-batch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compile FlatBuffers schemas with flatc, one at a time", long_about = None)]
struct Cli {
    /// Schema files, or directories whose .fbs files should be compiled
    schemas: Vec<PathBuf>,

    /// Text file listing schema paths, one per line
    #[arg(short, long)]
    list: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the flatc executable
    #[arg(long, env = "FLATC_BATCH_FLATC")]
    flatc: Option<PathBuf>,

    /// Directory generated code is written to
    #[arg(short, long, env = "FLATC_BATCH_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Generator flag passed to flatc (e.g. --cpp, --rust)
    #[arg(short, long, env = "FLATC_BATCH_GENERATOR", allow_hyphen_values = true)]
    generator: Option<String>,

    /// Per-schema timeout in seconds (0 = none)
    #[arg(long, env = "FLATC_BATCH_TIMEOUT")]
    timeout: Option<u64>,

    /// Print the batch report as JSON on stdout
    #[arg(long)]
    report_json: bool,

    /// Wait for Enter before exiting
    #[arg(long)]
    pause: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    flatc_batch::init_tracing(cli.json, level);

    let code = match run(&cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::from(EXIT_ENVIRONMENT)
        }
    };

    if cli.pause {
        pause();
    }
    code
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    let config = build_config(cli)?;
    let inputs = collect_inputs(cli)?;

    if inputs.is_empty() {
        eprintln!("No schema files selected. Exiting.");
        return Ok(ExitCode::SUCCESS);
    }

    info!(
        flatc = %config.executable_path.display(),
        generator = %config.generator_flag,
        "Compiling {} schema(s)",
        inputs.len()
    );

    let runner = BatchRunner::new(config);
    let report = runner
        .run(&inputs)
        .await
        .context("Schema batch could not start")?;

    write_report(&mut std::io::stdout().lock(), &report, cli.report_json)?;

    Ok(ExitCode::from(exit_status(&report)))
}

/// Layer configuration: defaults, then config file, then env/CLI.
fn build_config(cli: &Cli) -> Result<BatchConfig> {
    let mut config = match &cli.config {
        Some(path) => BatchConfig::from_file(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => BatchConfig::default(),
    };

    if let Some(flatc) = &cli.flatc {
        config.executable_path = flatc.clone();
    }
    if let Some(out_dir) = &cli.out_dir {
        config.output_directory = out_dir.clone();
    }
    if let Some(generator) = &cli.generator {
        config.generator_flag = generator.clone();
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }

    config.validate()?;
    Ok(config)
}

fn collect_inputs(cli: &Cli) -> Result<Vec<flatc_batch::SchemaInput>> {
    let mut source = ChainedSource::new().push(PathListSource::new(cli.schemas.clone()));
    if let Some(list) = &cli.list {
        source = source.push(ListFileSource::new(list));
    }
    source.collect().context("Failed to collect schema files")
}

/// Report on stdout: a JSON document, or the human-readable listing.
fn write_report(out: &mut impl Write, report: &BatchReport, json: bool) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, report)?;
        writeln!(out)?;
    } else {
        write!(out, "{}", render_report(report))?;
    }
    out.flush()?;
    Ok(())
}

/// Human-readable per-schema report with a closing summary line.
fn render_report(report: &BatchReport) -> String {
    let mut out = String::new();

    for result in &report.results {
        match &result.status {
            ItemStatus::Succeeded => {
                out.push_str(&format!(
                    "  ✓ {} ({}ms)\n",
                    result.input.name(),
                    result.duration_ms
                ));
            }
            ItemStatus::Failed { message } => {
                out.push_str(&format!(
                    "  ✗ {} (exit code: {})\n",
                    result.input.name(),
                    result.exit_code
                ));
                for line in message.lines() {
                    out.push_str(&format!("      {}\n", line));
                }
            }
        }
    }

    if let Some(abort) = &report.aborted {
        out.push_str(&format!(
            "\nflatc could not be launched: {}\n",
            abort.executable.display()
        ));
        out.push_str(&format!("  {}\n", abort.message));
        out.push_str(&format!(
            "Batch aborted at {}; remaining schemas were not compiled\n",
            abort.input.name()
        ));
    }

    out.push_str(&format!(
        "\nSummary: {} succeeded, {} failed\n",
        report.succeeded_count(),
        report.failed_count()
    ));
    out
}

fn exit_status(report: &BatchReport) -> u8 {
    if report.aborted.is_some() {
        EXIT_ENVIRONMENT
    } else if report.failed_count() > 0 {
        EXIT_ITEM_FAILED
    } else {
        0
    }
}

/// Prompt on stderr so stdout carries nothing but the report.
fn pause() {
    pause_prompt(&mut std::io::stderr().lock());
    let mut line = String::new();
    let _ = std::io::stdin().lock().read_line(&mut line);
}

fn pause_prompt(err: &mut impl Write) {
    let _ = write!(err, "Press Enter to exit...");
    let _ = err.flush();
}
