//! Transcribe XML documents into spreadsheet rows through hierarchical identifiers.
//!
//! A reference workbook documents tags as `2.1.1 <Denominazione>` entries; a mapping
//! workbook labels its columns with the same identifiers. Every identifier's dotted
//! prefixes spell out the tag path from the document root, so each column knows which
//! nodes of an XML document feed it. One row is appended to the output workbook per
//! document; repeated nodes are kept as a JSON array of strings in a single cell.
//!
//! The pipeline is split into pure passes:
//! [`IdentifierTable`] → [`TagPaths`] + [`ColumnLeafMap`] → [`TranscriptionPlan`], which
//! is then applied to each [`XmlSource`] to build an [`OutputRow`].

pub mod batch;
pub mod cli;
mod columns;
pub mod config;
mod encoding;
mod extract;
mod id_table;
mod identifier;
mod plan;
mod row;
mod tag_path;
pub mod workbook;

use std::path::PathBuf;

use thiserror::Error;

pub use batch::{discover_xml_files, run_batch, BatchSummary, DocumentFailure, Progress};
pub use columns::ColumnLeafMap;
pub use config::{FailurePolicy, TranscribeConfig};
pub use encoding::{decode_xml_bytes, decode_xml_document, DecodeError};
pub use extract::{extract_values, node_text, XmlSource};
pub use id_table::{IdentifierTable, DEFAULT_MARKER};
pub use identifier::{parse_header_identifier, parse_reference_entry, Identifier, InvalidIdentifier};
pub use plan::{ColumnPlan, ColumnReport, TranscriptionPlan};
pub use row::{ExtractedValue, OutputRow};
pub use tag_path::{TagPath, TagPaths};
pub use workbook::{Workbook, WorkbookError};

#[derive(Debug, Error)]
pub enum TranscribeError {
    /// The reference sheet has no row announcing the identifier listing.
    #[error("reference sheet {sheet:?} has no marker row matching /{marker}/")]
    MissingMarker { sheet: String, marker: String },
    #[error("invalid marker pattern: {0}")]
    InvalidMarker(#[from] regex::Error),
    #[error("{document} is not valid XML: {source}")]
    MalformedXml {
        document: String,
        #[source]
        source: roxmltree::Error,
    },
    #[error("{document} could not be decoded: {source}")]
    XmlEncoding {
        document: String,
        #[source]
        source: DecodeError,
    },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to list xml documents under {path}: {source}")]
    Discover {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error(transparent)]
    Workbook(#[from] WorkbookError),
}

impl TranscribeError {
    /// Whether the failure belongs to a single XML document (as opposed to the
    /// reference, mapping or output workbooks).
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            TranscribeError::MalformedXml { .. }
                | TranscribeError::XmlEncoding { .. }
                | TranscribeError::Io { .. }
        )
    }
}
