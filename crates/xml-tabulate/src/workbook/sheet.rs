use std::collections::BTreeMap;

use roxmltree::{Document, Node};

use super::cell::{CellRef, CellValue};
use super::shared_strings::inline_string_text;
use super::WorkbookError;
use crate::encoding::decode_xml_bytes;

static BLANK: CellValue = CellValue::Blank;

/// In-memory cell grid of one worksheet.
///
/// Bounds follow the cells that are actually present (including styled blank cells), so
/// `max_row`/`max_column` are the last row/column that holds any `<c>` element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    name: String,
    cells: BTreeMap<CellRef, CellValue>,
    min_row: u32,
    max_row: u32,
    min_col: u32,
    max_col: u32,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build a sheet from rows of values, starting at `A1`.
    ///
    /// Every position in `rows` becomes a cell, so trailing blanks still count towards the
    /// sheet bounds.
    pub fn from_rows<I, R, V>(name: impl Into<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let mut sheet = Sheet::new(name);
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                sheet.set(CellRef::new(r as u32 + 1, c as u32 + 1), value.into());
            }
        }
        sheet
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set(&mut self, at: CellRef, value: CellValue) {
        if self.cells.is_empty() {
            self.min_row = at.row;
            self.max_row = at.row;
            self.min_col = at.col;
            self.max_col = at.col;
        } else {
            self.min_row = self.min_row.min(at.row);
            self.max_row = self.max_row.max(at.row);
            self.min_col = self.min_col.min(at.col);
            self.max_col = self.max_col.max(at.col);
        }
        self.cells.insert(at, value);
    }

    pub fn cell(&self, row: u32, col: u32) -> &CellValue {
        self.cells.get(&CellRef::new(row, col)).unwrap_or(&BLANK)
    }

    pub fn text(&self, row: u32, col: u32) -> Option<&str> {
        self.cell(row, col).as_text()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// First row holding a cell (0 for an empty sheet).
    pub fn min_row(&self) -> u32 {
        self.min_row
    }

    /// Last row holding a cell (0 for an empty sheet).
    pub fn max_row(&self) -> u32 {
        self.max_row
    }

    /// First column holding a cell (0 for an empty sheet).
    pub fn min_column(&self) -> u32 {
        self.min_col
    }

    /// Last column holding a cell (0 for an empty sheet).
    pub fn max_column(&self) -> u32 {
        self.max_col
    }

    /// Row numbers from `min_row` to `max_row`, inclusive.
    pub fn row_range(&self) -> std::ops::RangeInclusive<u32> {
        if self.is_empty() {
            return std::ops::RangeInclusive::new(1, 0);
        }
        self.min_row..=self.max_row
    }

    /// Column numbers from `min_column` to `max_column`, inclusive.
    pub fn column_range(&self) -> std::ops::RangeInclusive<u32> {
        if self.is_empty() {
            return std::ops::RangeInclusive::new(1, 0);
        }
        self.min_col..=self.max_col
    }
}

/// Parse a worksheet part (`xl/worksheets/sheetN.xml`) into a [`Sheet`].
pub(crate) fn parse_worksheet(
    name: &str,
    part: &str,
    bytes: &[u8],
    shared_strings: &[String],
) -> Result<Sheet, WorkbookError> {
    let text = decode_xml_bytes(bytes).map_err(|source| WorkbookError::Encoding {
        part: part.to_string(),
        source,
    })?;
    let doc = Document::parse(&text).map_err(|source| WorkbookError::Xml {
        part: part.to_string(),
        source,
    })?;

    let mut sheet = Sheet::new(name);
    let Some(sheet_data) = doc
        .root_element()
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "sheetData")
    else {
        return Ok(sheet);
    };

    let mut row_number: u32 = 0;
    for row in sheet_data
        .children()
        .filter(|n| n.is_element() && n.tag_name().name() == "row")
    {
        row_number = match row.attribute("r") {
            Some(r) => r.trim().parse().map_err(|_| WorkbookError::MalformedSheet {
                part: part.to_string(),
                reason: format!("invalid row number {r:?}"),
            })?,
            None => row_number + 1,
        };

        let mut col_number: u32 = 0;
        for cell in row
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "c")
        {
            let at = match cell.attribute("r") {
                Some(r) => CellRef::parse_a1(r).ok_or_else(|| WorkbookError::MalformedSheet {
                    part: part.to_string(),
                    reason: format!("invalid cell reference {r:?}"),
                })?,
                None => CellRef::new(row_number, col_number + 1),
            };
            col_number = at.col;
            sheet.set(at, cell_value(cell, shared_strings, part)?);
        }
    }

    Ok(sheet)
}

fn cell_value(
    cell: Node<'_, '_>,
    shared_strings: &[String],
    part: &str,
) -> Result<CellValue, WorkbookError> {
    let raw = child_element(cell, "v").map(text_content);
    let value = match cell.attribute("t").unwrap_or("n") {
        "s" => {
            let Some(raw) = raw else {
                return Ok(CellValue::Blank);
            };
            let idx: usize = raw.trim().parse().map_err(|_| WorkbookError::MalformedSheet {
                part: part.to_string(),
                reason: format!("invalid shared string index {raw:?}"),
            })?;
            let text = shared_strings
                .get(idx)
                .ok_or_else(|| WorkbookError::MalformedSheet {
                    part: part.to_string(),
                    reason: format!("shared string index {idx} out of range"),
                })?;
            CellValue::Text(text.clone())
        }
        "inlineStr" => match child_element(cell, "is") {
            Some(is) => CellValue::Text(inline_string_text(is)),
            None => CellValue::Blank,
        },
        // Formula string results and ISO-8601 date cells both carry their text verbatim.
        "str" | "d" => raw.map_or(CellValue::Blank, CellValue::Text),
        "b" => raw.map_or(CellValue::Blank, |v| CellValue::Bool(v.trim() == "1")),
        "e" => raw.map_or(CellValue::Blank, CellValue::Error),
        _ => match raw {
            None => CellValue::Blank,
            Some(v) => match v.trim().parse::<f64>() {
                Ok(n) => CellValue::Number(n),
                Err(_) => CellValue::Text(v),
            },
        },
    };
    Ok(value)
}

fn child_element<'a, 'input>(node: Node<'a, 'input>, local: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == local)
}

fn text_content(node: Node<'_, '_>) -> String {
    node.children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}
