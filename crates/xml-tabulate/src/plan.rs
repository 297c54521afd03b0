//! The per-batch transcription plan: which tag path feeds which output column.

use std::collections::BTreeMap;

use regex::Regex;
use roxmltree::Document;
use serde::Serialize;

use crate::columns::ColumnLeafMap;
use crate::extract::{extract_values, XmlSource};
use crate::id_table::IdentifierTable;
use crate::identifier::Identifier;
use crate::row::{ExtractedValue, OutputRow};
use crate::tag_path::{TagPath, TagPaths};
use crate::workbook::Sheet;
use crate::TranscribeError;

/// A mapped column: its leaf identifier and the tag path derived for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    pub column: u32,
    pub leaf: Identifier,
    pub path: TagPath,
}

impl ColumnPlan {
    /// Columns whose leaf has no documented tag path never receive a value.
    pub fn is_resolvable(&self) -> bool {
        !self.path.is_empty()
    }
}

/// What one column produced for one document, for inspection output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnReport {
    pub column: u32,
    pub leaf: Option<String>,
    pub path: Vec<String>,
    pub value: ExtractedValue,
}

/// Immutable mapping from output columns to tag paths, shared by every document of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionPlan {
    width: u32,
    columns: Vec<ColumnPlan>,
}

impl TranscriptionPlan {
    /// Build the plan from the reference sheet (identifier listing) and the mapping sheet
    /// (column headers). The row width is the mapping sheet's last used column.
    pub fn build(reference: &Sheet, mapping: &Sheet, marker: &Regex) -> Result<Self, TranscribeError> {
        let table = IdentifierTable::from_sheet(reference, marker)?;
        let leaves = ColumnLeafMap::from_sheet(mapping);
        Ok(Self::from_parts(&table, &leaves, mapping.max_column()))
    }

    pub fn from_parts(table: &IdentifierTable, leaves: &ColumnLeafMap, width: u32) -> Self {
        let paths = TagPaths::resolve(table);
        let columns: Vec<ColumnPlan> = leaves
            .iter()
            .map(|(column, leaf)| ColumnPlan {
                column,
                leaf: leaf.clone(),
                path: paths.path_for(leaf),
            })
            .collect();

        for column in columns.iter().filter(|c| !c.is_resolvable()) {
            log::debug!(
                "column {} leaf {} is not documented in the reference table",
                column.column,
                column.leaf
            );
        }
        log::debug!(
            "plan: {} identifiers, {} of {width} columns mapped",
            table.len(),
            columns.len()
        );
        Self { width, columns }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn columns(&self) -> &[ColumnPlan] {
        &self.columns
    }

    pub fn column(&self, column: u32) -> Option<&ColumnPlan> {
        self.columns.iter().find(|c| c.column == column)
    }

    /// Run every column's path against a parsed document.
    pub fn extract(&self, doc: &Document<'_>) -> Vec<(u32, ExtractedValue)> {
        self.columns
            .iter()
            .map(|c| (c.column, ExtractedValue::from_values(extract_values(doc, &c.path))))
            .collect()
    }

    /// Build the output row for one document.
    pub fn transcribe(&self, source: &XmlSource) -> Result<OutputRow, TranscribeError> {
        let doc = source.parse()?;
        Ok(OutputRow::build(self.width, self.extract(&doc)))
    }

    /// Per-column detail for one document, every column of the row included.
    pub fn inspect(&self, source: &XmlSource) -> Result<Vec<ColumnReport>, TranscribeError> {
        let doc = source.parse()?;
        let mut values: BTreeMap<u32, ExtractedValue> = self.extract(&doc).into_iter().collect();
        let mut reports = Vec::with_capacity(self.width as usize);
        for column in 1..=self.width {
            let plan = self.column(column);
            let value = values.remove(&column).unwrap_or_default();
            reports.push(ColumnReport {
                column,
                leaf: plan.map(|p| p.leaf.to_string()),
                path: plan.map(|p| p.path.segments().to_vec()).unwrap_or_default(),
                value,
            });
        }
        Ok(reports)
    }
}
