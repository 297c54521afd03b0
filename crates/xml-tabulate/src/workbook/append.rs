//! In-place row appends on a worksheet part.
//!
//! The worksheet XML is patched textually (new `<row>` spliced before `</sheetData>`, the
//! `<dimension>` widened) so every other element, attribute and namespace declaration in
//! the part is preserved byte-for-byte.

use std::ops::Range;

use quick_xml::escape::escape;
use roxmltree::{Document, Node};

use super::cell::{column_letters, CellRef};
use super::WorkbookError;

/// Cells longer than this are rejected by Excel when the workbook is opened.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Result of appending a row to a worksheet part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendedRow {
    pub xml: String,
    /// 1-based row number the values were written to.
    pub row: u32,
}

struct Edit {
    range: Range<usize>,
    replacement: String,
}

/// Append `values` (column A onwards) as a new row after the last existing row.
///
/// Empty strings produce no `<c>` element; the `<row>` itself is always written so the
/// row number is consumed even when every value is empty.
pub(crate) fn append_row(
    sheet_xml: &str,
    part: &str,
    values: &[String],
) -> Result<AppendedRow, WorkbookError> {
    let doc = Document::parse(sheet_xml).map_err(|source| WorkbookError::Xml {
        part: part.to_string(),
        source,
    })?;
    let root = doc.root_element();
    let sheet_data = root
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "sheetData")
        .ok_or_else(|| WorkbookError::MalformedSheet {
            part: part.to_string(),
            reason: "worksheet has no <sheetData> element".to_string(),
        })?;

    let row = last_row(sheet_data, part)? + 1;
    let prefix = element_prefix(sheet_xml, sheet_data.range());
    let row_xml = render_row(&prefix, row, values, part);

    let mut edits = Vec::with_capacity(2);
    let data_range = sheet_data.range();
    let data_text = &sheet_xml[data_range.clone()];
    if sheet_data.has_children() || !data_text.ends_with("/>") {
        let close = data_text
            .rfind("</")
            .ok_or_else(|| WorkbookError::MalformedSheet {
                part: part.to_string(),
                reason: "unterminated <sheetData> element".to_string(),
            })?;
        let at = data_range.start + close;
        edits.push(Edit {
            range: at..at,
            replacement: row_xml,
        });
    } else {
        edits.push(Edit {
            range: data_range,
            replacement: format!("<{prefix}sheetData>{row_xml}</{prefix}sheetData>"),
        });
    }

    if let Some(dimension) = root
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "dimension")
    {
        let prefix = element_prefix(sheet_xml, dimension.range());
        let widened = widen_dimension(dimension.attribute("ref"), row, values.len() as u32);
        edits.push(Edit {
            range: dimension.range(),
            replacement: format!(r#"<{prefix}dimension ref="{widened}"/>"#),
        });
    }

    // Apply back to front so earlier ranges stay valid.
    edits.sort_by(|a, b| b.range.start.cmp(&a.range.start));
    let mut xml = sheet_xml.to_string();
    for edit in edits {
        xml.replace_range(edit.range, &edit.replacement);
    }

    Ok(AppendedRow { xml, row })
}

fn last_row(sheet_data: Node<'_, '_>, part: &str) -> Result<u32, WorkbookError> {
    let mut current: u32 = 0;
    let mut last: u32 = 0;
    for row in sheet_data
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "row")
    {
        current = match row.attribute("r") {
            Some(r) => r.trim().parse().map_err(|_| WorkbookError::MalformedSheet {
                part: part.to_string(),
                reason: format!("invalid row number {r:?}"),
            })?,
            None => current + 1,
        };
        last = last.max(current);
        for cell in row.children().filter(|n| n.is_element()) {
            if let Some(at) = cell.attribute("r").and_then(CellRef::parse_a1) {
                last = last.max(at.row);
            }
        }
    }
    Ok(last)
}

/// Namespace prefix (including the trailing `:`) used by the element's start tag.
fn element_prefix(xml: &str, range: Range<usize>) -> String {
    let tag = &xml[range];
    let name = tag
        .trim_start_matches('<')
        .split(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .next()
        .unwrap_or_default();
    match name.rsplit_once(':') {
        Some((prefix, _)) => format!("{prefix}:"),
        None => String::new(),
    }
}

fn render_row(prefix: &str, row: u32, values: &[String], part: &str) -> String {
    let mut out = format!(r#"<{prefix}row r="{row}">"#);
    for (idx, value) in values.iter().enumerate() {
        if value.is_empty() {
            continue;
        }
        let at = CellRef::new(row, idx as u32 + 1);
        if value.chars().count() > MAX_CELL_CHARS {
            log::warn!(
                "{part}: cell {at} holds {} characters, above the {MAX_CELL_CHARS}-character cell limit",
                value.chars().count()
            );
        }
        let space = if value.trim() != value {
            r#" xml:space="preserve""#
        } else {
            ""
        };
        out.push_str(&format!(
            r#"<{prefix}c r="{at}" t="inlineStr"><{prefix}is><{prefix}t{space}>{}</{prefix}t></{prefix}is></{prefix}c>"#,
            escape(value.as_str())
        ));
    }
    out.push_str(&format!("</{prefix}row>"));
    out
}

/// Grow a `<dimension ref>` so it covers `row` and the first `columns` columns.
fn widen_dimension(existing: Option<&str>, row: u32, columns: u32) -> String {
    let (start, end) = match existing.and_then(parse_ref) {
        Some(bounds) => bounds,
        None => (CellRef::new(1, 1), CellRef::new(1, 1)),
    };
    let end = CellRef::new(end.row.max(row), end.col.max(columns).max(start.col));
    if start == end {
        start.to_string()
    } else {
        format!("{start}:{}{}", column_letters(end.col), end.row)
    }
}

fn parse_ref(text: &str) -> Option<(CellRef, CellRef)> {
    match text.split_once(':') {
        Some((a, b)) => Some((CellRef::parse_a1(a)?, CellRef::parse_a1(b)?)),
        None => {
            let cell = CellRef::parse_a1(text)?;
            Some((cell, cell))
        }
    }
}
