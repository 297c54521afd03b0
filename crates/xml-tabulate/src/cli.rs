use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use crate::batch::{load_plan, run_batch, BatchSummary, Progress};
use crate::config::{FailurePolicy, TranscribeConfig};
use crate::extract::XmlSource;
use crate::plan::ColumnReport;
use crate::workbook::column_letters;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "xml_tabulate",
    about = "Append one spreadsheet row per XML document, mapping columns to tags through hierarchical identifiers."
)]
pub struct Cli {
    /// Log progress (`info`) unless `RUST_LOG` says otherwise.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe every XML document of a directory into the output workbook.
    Run(RunArgs),
    /// Show, column by column, what one XML document would produce.
    Inspect(InspectArgs),
}

/// Locations of the reference and mapping workbooks.
#[derive(Args)]
struct PlanArgs {
    /// Directory laid out as `XML/` plus the reference, mapping and output workbooks.
    ///
    /// Individual paths below override the conventional file names.
    #[arg(long, value_name = "DIR", default_value = ".")]
    base_dir: PathBuf,

    /// Reference workbook listing `ID <Tag>` entries (first sheet).
    #[arg(long, value_name = "PATH")]
    reference: Option<PathBuf>,

    /// Mapping workbook whose active sheet carries the identifier headers.
    #[arg(long, value_name = "PATH")]
    mapping: Option<PathBuf>,

    /// Regex locating the marker row in the reference sheet.
    #[arg(long)]
    marker: Option<String>,
}

#[derive(Args)]
struct RunArgs {
    #[command(flatten)]
    plan: PlanArgs,

    /// Output workbook; one row is appended to its active sheet per document.
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Directory scanned for `.xml` documents.
    #[arg(long, value_name = "DIR")]
    xml_dir: Option<PathBuf>,

    /// Also scan subdirectories of the XML directory.
    #[arg(long)]
    recursive: bool,

    /// Skip documents that fail to parse instead of stopping the batch.
    #[arg(long)]
    keep_going: bool,

    /// Create a missing output workbook as a copy of the mapping workbook.
    #[arg(long)]
    init_output: bool,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Args)]
struct InspectArgs {
    #[command(flatten)]
    plan: PlanArgs,

    /// XML document to inspect.
    document: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct JsonRunReport<'a> {
    output: &'a Path,
    failure_policy: FailurePolicy,
    #[serde(flatten)]
    summary: &'a BatchSummary,
}

#[derive(Debug, Serialize)]
struct JsonInspectReport<'a> {
    document: &'a str,
    columns: &'a [ColumnReport],
}

impl PlanArgs {
    fn config(&self) -> TranscribeConfig {
        let mut config = TranscribeConfig::from_base_dir(&self.base_dir);
        if let Some(reference) = &self.reference {
            config.reference = reference.clone();
        }
        if let Some(mapping) = &self.mapping {
            config.mapping = mapping.clone();
        }
        if let Some(marker) = &self.marker {
            config.marker = marker.clone();
        }
        config
    }
}

impl RunArgs {
    fn config(&self) -> TranscribeConfig {
        let mut config = self
            .plan
            .config()
            .recursive(self.recursive)
            .init_output(self.init_output)
            .with_failure_policy(if self.keep_going {
                FailurePolicy::Skip
            } else {
                FailurePolicy::Abort
            });
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(xml_dir) = &self.xml_dir {
            config.xml_dir = xml_dir.clone();
        }
        config
    }
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

pub fn run() -> Result<ExitCode> {
    run_with_args(Cli::parse())
}

/// Execute a parsed command line. Exits with failure when any document was skipped.
pub fn run_with_args(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Run(args) => run_command(&args),
        Command::Inspect(args) => inspect_command(&args),
    }
}

fn run_command(args: &RunArgs) -> Result<ExitCode> {
    let config = args.config();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut write_error = None;

    let summary = run_batch(&config, |progress| {
        if !matches!(args.format, OutputFormat::Text) || write_error.is_some() {
            return;
        }
        let line = match progress {
            Progress::Appended {
                index,
                total,
                path,
                row,
            } => writeln!(out, "[{}/{total}] {} -> row {row}", index + 1, path.display()),
            Progress::Skipped {
                index,
                total,
                path,
                error,
            } => writeln!(out, "[{}/{total}] {} skipped: {error}", index + 1, path.display()),
        };
        if let Err(err) = line {
            write_error = Some(err);
        }
    })
    .with_context(|| format!("transcribe xml documents into {}", config.output.display()))?;
    if let Some(err) = write_error {
        return Err(err).context("write progress");
    }

    match args.format {
        OutputFormat::Text => {
            if summary.discovered == 0 {
                writeln!(out, "No XML files found in {}.", config.xml_dir.display())?;
            } else {
                writeln!(
                    out,
                    "Finished processing {} XML files ({} skipped). Data appended to {}.",
                    summary.discovered,
                    summary.skipped.len(),
                    config.output.display()
                )?;
            }
        }
        OutputFormat::Json => {
            let report = JsonRunReport {
                output: &config.output,
                failure_policy: config.failure_policy,
                summary: &summary,
            };
            serde_json::to_writer(&mut out, &report)?;
            out.write_all(b"\n")?;
        }
    }

    Ok(if summary.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn inspect_command(args: &InspectArgs) -> Result<ExitCode> {
    let config = args.plan.config();
    let plan = load_plan(&config).context("load transcription plan")?;
    let source = XmlSource::read(&args.document)?;
    let columns = plan
        .inspect(&source)
        .with_context(|| format!("inspect {}", args.document.display()))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match args.format {
        OutputFormat::Text => {
            writeln!(out, "{}: {} columns", source.origin(), columns.len())?;
            for column in &columns {
                let leaf = column.leaf.as_deref().unwrap_or("-");
                let path = if column.path.is_empty() {
                    "(unresolved)".to_string()
                } else {
                    column.path.join("/")
                };
                let value = column.value.encode();
                writeln!(
                    out,
                    "  {:>3} {leaf:<12} {path} = {}",
                    column_letters(column.column),
                    if value.is_empty() { "(empty)" } else { value.as_str() }
                )?;
            }
        }
        OutputFormat::Json => {
            let report = JsonInspectReport {
                document: source.origin(),
                columns: &columns,
            };
            serde_json::to_writer(&mut out, &report)?;
            out.write_all(b"\n")?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
