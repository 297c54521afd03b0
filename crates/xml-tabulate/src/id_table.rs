use std::collections::BTreeMap;

use regex::Regex;

use crate::identifier::{parse_reference_entry, Identifier};
use crate::workbook::Sheet;
use crate::TranscribeError;

/// Default marker for the header row that opens the identifier listing.
pub const DEFAULT_MARKER: &str = r"(?i)ID\s*e\s*Nome";

/// Identifier → tag name, as documented by a reference table.
///
/// Built once from the reference sheet and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierTable {
    entries: BTreeMap<Identifier, String>,
}

impl IdentifierTable {
    /// Scan `sheet` for the marker row, then collect one `ID <Tag>` entry per following row.
    ///
    /// The marker is looked for in the first used column only. In each subsequent row the
    /// leftmost matching cell wins and the rest of the row is ignored. A later row
    /// re-documenting an identifier overrides the earlier tag name.
    pub fn from_sheet(sheet: &Sheet, marker: &Regex) -> Result<Self, TranscribeError> {
        let first_col = sheet.min_column();
        let header_row = sheet
            .row_range()
            .find(|&row| {
                sheet
                    .text(row, first_col)
                    .is_some_and(|text| marker.is_match(text))
            })
            .ok_or_else(|| TranscribeError::MissingMarker {
                sheet: sheet.name().to_string(),
                marker: marker.as_str().to_string(),
            })?;

        let mut entries = BTreeMap::new();
        for row in header_row + 1..=sheet.max_row() {
            let entry = sheet
                .column_range()
                .filter_map(|col| sheet.text(row, col))
                .find_map(parse_reference_entry);
            if let Some((id, tag)) = entry {
                entries.insert(id, tag);
            }
        }

        log::debug!(
            "reference sheet {:?}: marker at row {header_row}, {} identifiers",
            sheet.name(),
            entries.len()
        );
        Ok(Self { entries })
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Identifier, S)>,
        S: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(id, tag)| (id, tag.into()))
                .collect(),
        }
    }

    /// Tag name documented for an identifier (or identifier prefix) spelled as text.
    pub fn tag(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.entries.contains_key(id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &str)> {
        self.entries.iter().map(|(id, tag)| (id, tag.as_str()))
    }
}
