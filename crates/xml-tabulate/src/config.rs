use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;

use crate::id_table::DEFAULT_MARKER;
use crate::TranscribeError;

/// Directory holding the XML documents in the conventional layout.
pub const XML_DIR_NAME: &str = "XML";
pub const REFERENCE_FILE_NAME: &str = "RappresentazioneTabellareFattOrdinaria (1).xlsx";
pub const MAPPING_FILE_NAME: &str = "hierarchical_mapping_fixed.xlsx";
pub const OUTPUT_FILE_NAME: &str = "hierarchical_mapping_populated_json.xlsx";

/// What to do when a single XML document cannot be transcribed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the batch and return the error. Rows already appended stay saved.
    #[default]
    Abort,
    /// Log the failure, record it in the summary and continue with the next document.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscribeConfig {
    /// Workbook whose first sheet lists `ID <Tag>` entries below the marker row.
    pub reference: PathBuf,
    /// Workbook whose active sheet carries the identifier headers, one column each.
    pub mapping: PathBuf,
    /// Workbook that receives one row per document on its active sheet.
    pub output: PathBuf,
    pub xml_dir: PathBuf,
    /// Regex locating the marker row in the reference sheet's first used column.
    pub marker: String,
    pub recursive: bool,
    pub failure_policy: FailurePolicy,
    /// Create a missing output workbook as a copy of the mapping workbook.
    pub init_output: bool,
}

impl TranscribeConfig {
    pub fn new(
        reference: impl Into<PathBuf>,
        mapping: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        xml_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            reference: reference.into(),
            mapping: mapping.into(),
            output: output.into(),
            xml_dir: xml_dir.into(),
            marker: DEFAULT_MARKER.to_string(),
            recursive: false,
            failure_policy: FailurePolicy::default(),
            init_output: false,
        }
    }

    /// All four locations resolved against `base` using the conventional file names.
    pub fn from_base_dir(base: &Path) -> Self {
        Self::new(
            base.join(REFERENCE_FILE_NAME),
            base.join(MAPPING_FILE_NAME),
            base.join(OUTPUT_FILE_NAME),
            base.join(XML_DIR_NAME),
        )
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn init_output(mut self, init_output: bool) -> Self {
        self.init_output = init_output;
        self
    }

    pub fn marker_regex(&self) -> Result<Regex, TranscribeError> {
        Ok(Regex::new(&self.marker)?)
    }
}
