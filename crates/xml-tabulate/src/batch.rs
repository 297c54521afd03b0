//! Sequential batch driver: one XML document in, one output row appended and saved.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{FailurePolicy, TranscribeConfig};
use crate::extract::XmlSource;
use crate::plan::TranscriptionPlan;
use crate::workbook::{write_atomically, Workbook, WorkbookError};
use crate::TranscribeError;

/// Per-document progress notification.
#[derive(Debug)]
pub enum Progress<'a> {
    Appended {
        index: usize,
        total: usize,
        path: &'a Path,
        row: u32,
    },
    Skipped {
        index: usize,
        total: usize,
        path: &'a Path,
        error: &'a TranscribeError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendedDocument {
    pub path: PathBuf,
    pub row: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Documents found in the XML directory.
    pub discovered: usize,
    pub appended: Vec<AppendedDocument>,
    pub skipped: Vec<DocumentFailure>,
}

impl BatchSummary {
    pub fn processed(&self) -> usize {
        self.appended.len()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// XML files directly inside `dir` (or anywhere below it when `recursive`), sorted.
///
/// The extension match is case-insensitive.
pub fn discover_xml_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, TranscribeError> {
    let mut walker = walkdir::WalkDir::new(dir).follow_links(false).min_depth(1);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| TranscribeError::Discover {
            path: dir.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let is_xml = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
        if is_xml {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Load the reference and mapping workbooks and derive the plan shared by the whole batch.
pub fn load_plan(config: &TranscribeConfig) -> Result<TranscriptionPlan, TranscribeError> {
    let marker = config.marker_regex()?;
    let reference = Workbook::open(&config.reference)?.first_sheet()?;
    let mapping = Workbook::open(&config.mapping)?.active_sheet()?;
    TranscriptionPlan::build(&reference, &mapping, &marker)
}

/// Transcribe every discovered document into the output workbook.
///
/// The output workbook is reopened, appended to and saved once per document, so rows
/// appended before a failure stay on disk. Document failures follow
/// `config.failure_policy`; workbook and configuration failures always abort.
pub fn run_batch<F>(config: &TranscribeConfig, mut on_progress: F) -> Result<BatchSummary, TranscribeError>
where
    F: FnMut(&Progress<'_>),
{
    let plan = load_plan(config)?;

    if !config.xml_dir.is_dir() {
        log::warn!(
            "xml directory {} does not exist; no documents processed",
            config.xml_dir.display()
        );
        return Ok(BatchSummary::default());
    }
    let documents = discover_xml_files(&config.xml_dir, config.recursive)?;
    if documents.is_empty() {
        log::warn!("no xml documents found in {}", config.xml_dir.display());
        return Ok(BatchSummary::default());
    }

    if config.init_output && !config.output.exists() {
        init_output(&config.mapping, &config.output)?;
    }

    let total = documents.len();
    let mut summary = BatchSummary {
        discovered: total,
        ..BatchSummary::default()
    };
    for (index, path) in documents.iter().enumerate() {
        log::info!("processing {} ({}/{total})", path.display(), index + 1);
        let row = match XmlSource::read(path).and_then(|source| plan.transcribe(&source)) {
            Ok(row) => row,
            Err(err) if err.is_document_error() && config.failure_policy == FailurePolicy::Skip => {
                log::warn!("skipping {}: {err}", path.display());
                on_progress(&Progress::Skipped {
                    index,
                    total,
                    path,
                    error: &err,
                });
                summary.skipped.push(DocumentFailure {
                    path: path.clone(),
                    error: err.to_string(),
                });
                continue;
            }
            Err(err) => return Err(err),
        };

        let mut output = Workbook::open(&config.output)?;
        let appended = output.append_row(row.cells())?;
        output.save(&config.output)?;

        on_progress(&Progress::Appended {
            index,
            total,
            path,
            row: appended,
        });
        summary.appended.push(AppendedDocument {
            path: path.clone(),
            row: appended,
        });
    }

    log::info!(
        "finished: {} of {total} documents appended to {}",
        summary.processed(),
        config.output.display()
    );
    Ok(summary)
}

fn init_output(mapping: &Path, output: &Path) -> Result<(), TranscribeError> {
    log::info!(
        "creating {} from mapping workbook {}",
        output.display(),
        mapping.display()
    );
    let bytes = std::fs::read(mapping).map_err(|source| WorkbookError::Io {
        path: mapping.to_path_buf(),
        source,
    })?;
    write_atomically(output, &bytes).map_err(|source| WorkbookError::Persist {
        path: output.to_path_buf(),
        source,
    })?;
    Ok(())
}
