//! Minimal XLSX access: read worksheet cells, append a row, save atomically.
//!
//! Only the parts needed to locate worksheets (`_rels/.rels`, `xl/workbook.xml` and its
//! relationships) and to read cell text (`sharedStrings.xml`, worksheet parts) are parsed.
//! Everything else in the package is carried through untouched on save.

mod append;
mod cell;
mod package;
mod persist;
mod shared_strings;
mod sheet;

use std::path::{Path, PathBuf};

use roxmltree::Document;
use thiserror::Error;

use crate::encoding::{decode_xml_bytes, DecodeError};

pub use append::{AppendedRow, MAX_CELL_CHARS};
pub use cell::{column_index, column_letters, CellRef, CellValue};
pub use package::WorkbookPackage;
pub use persist::write_atomically;
pub use shared_strings::{parse_shared_strings, SharedStringsError};
pub use sheet::Sheet;

const REL_OFFICE_DOCUMENT: &str = "/officeDocument";
const REL_WORKSHEET: &str = "/worksheet";
const REL_SHARED_STRINGS: &str = "/sharedStrings";
const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";

#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("failed to read workbook {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to save workbook {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("i/o error on part {part}: {source}")]
    PartIo {
        part: String,
        #[source]
        source: std::io::Error,
    },
    #[error("duplicate part name {0} (invalid package)")]
    DuplicatePart(String),
    #[error("workbook is missing part {0}")]
    MissingPart(String),
    #[error("part {part} is not valid text: {source}")]
    Encoding {
        part: String,
        #[source]
        source: DecodeError,
    },
    #[error("failed to parse xml for {part}: {source}")]
    Xml {
        part: String,
        #[source]
        source: roxmltree::Error,
    },
    #[error("failed to parse shared strings {part}: {source}")]
    SharedStrings {
        part: String,
        #[source]
        source: SharedStringsError,
    },
    #[error("workbook has no worksheets")]
    NoWorksheets,
    #[error("worksheet index {index} out of range (workbook has {count} sheets)")]
    SheetIndex { index: usize, count: usize },
    #[error("malformed worksheet {part}: {reason}")]
    MalformedSheet { part: String, reason: String },
}

/// A worksheet listed in `xl/workbook.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    pub name: String,
    pub part: String,
}

/// An opened XLSX workbook.
#[derive(Debug, Clone)]
pub struct Workbook {
    package: WorkbookPackage,
    sheets: Vec<SheetEntry>,
    active: usize,
    shared_strings: Vec<String>,
}

impl Workbook {
    pub fn open(path: &Path) -> Result<Self, WorkbookError> {
        Self::from_package(WorkbookPackage::open(path)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WorkbookError> {
        Self::from_package(WorkbookPackage::from_bytes(bytes)?)
    }

    pub fn from_package(package: WorkbookPackage) -> Result<Self, WorkbookError> {
        let workbook_part = office_document_part(&package)?;
        let workbook_xml = part_text(&package, &workbook_part)?;
        let doc = Document::parse(&workbook_xml).map_err(|source| WorkbookError::Xml {
            part: workbook_part.clone(),
            source,
        })?;

        let rels = relationships(&package, &workbook_part)?;
        let mut sheets = Vec::new();
        for sheet in doc
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "sheet")
        {
            let name = sheet.attribute("name").unwrap_or_default().to_string();
            // `r:id`; match on local name so transitional and strict namespaces both work.
            let rel_id = sheet
                .attributes()
                .find(|a| a.name() == "id" && a.namespace().is_some())
                .map(|a| a.value());
            let Some(target) = rel_id.and_then(|id| {
                rels.iter()
                    .find(|rel| rel.id == id && rel.kind.ends_with(REL_WORKSHEET))
                    .map(|rel| rel.target.clone())
            }) else {
                log::debug!("skipping sheet {name:?}: no worksheet relationship");
                continue;
            };
            sheets.push(SheetEntry { name, part: target });
        }
        if sheets.is_empty() {
            return Err(WorkbookError::NoWorksheets);
        }

        let active = doc
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == "workbookView")
            .and_then(|n| n.attribute("activeTab"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|idx| *idx < sheets.len())
            .unwrap_or(0);

        let shared_strings = match rels
            .iter()
            .find(|rel| rel.kind.ends_with(REL_SHARED_STRINGS))
            .map(|rel| rel.target.clone())
        {
            Some(part) if package.part(&part).is_some() => {
                let xml = part_text(&package, &part)?;
                parse_shared_strings(&xml)
                    .map_err(|source| WorkbookError::SharedStrings { part, source })?
            }
            _ => Vec::new(),
        };

        Ok(Self {
            package,
            sheets,
            active,
            shared_strings,
        })
    }

    pub fn sheets(&self) -> &[SheetEntry] {
        &self.sheets
    }

    /// Index of the sheet selected when the workbook was last saved.
    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn sheet_at(&self, index: usize) -> Result<Sheet, WorkbookError> {
        let entry = self.sheets.get(index).ok_or(WorkbookError::SheetIndex {
            index,
            count: self.sheets.len(),
        })?;
        let bytes = self.package.require_part(&entry.part)?;
        sheet::parse_worksheet(&entry.name, &entry.part, bytes, &self.shared_strings)
    }

    pub fn first_sheet(&self) -> Result<Sheet, WorkbookError> {
        self.sheet_at(0)
    }

    pub fn active_sheet(&self) -> Result<Sheet, WorkbookError> {
        self.sheet_at(self.active)
    }

    /// Append `values` as a new last row of the active sheet. Returns the row number.
    pub fn append_row(&mut self, values: &[String]) -> Result<u32, WorkbookError> {
        let entry = self.sheets[self.active].clone();
        let xml = part_text(&self.package, &entry.part)?;
        let appended = append::append_row(&xml, &entry.part, values)?;
        self.package
            .set_part(&entry.part, appended.xml.into_bytes());
        Ok(appended.row)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, WorkbookError> {
        self.package.to_bytes()
    }

    /// Write the workbook to `path`, replacing any existing file atomically.
    pub fn save(&self, path: &Path) -> Result<(), WorkbookError> {
        let bytes = self.to_bytes()?;
        write_atomically(path, &bytes).map_err(|source| WorkbookError::Persist {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn package(&self) -> &WorkbookPackage {
        &self.package
    }
}

#[derive(Debug, Clone)]
struct Relationship {
    id: String,
    kind: String,
    target: String,
}

fn part_text(package: &WorkbookPackage, part: &str) -> Result<String, WorkbookError> {
    let bytes = package.require_part(part)?;
    decode_xml_bytes(bytes)
        .map(|text| text.into_owned())
        .map_err(|source| WorkbookError::Encoding {
            part: part.to_string(),
            source,
        })
}

/// Relationships owned by `source_part`, with targets resolved to part names.
fn relationships(
    package: &WorkbookPackage,
    source_part: &str,
) -> Result<Vec<Relationship>, WorkbookError> {
    let rels_part = package::rels_part_for(source_part);
    if package.part(&rels_part).is_none() {
        return Ok(Vec::new());
    }
    let xml = part_text(package, &rels_part)?;
    let doc = Document::parse(&xml).map_err(|source| WorkbookError::Xml {
        part: rels_part.clone(),
        source,
    })?;
    Ok(doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Relationship")
        .filter(|n| n.attribute("TargetMode") != Some("External"))
        .filter_map(|n| {
            Some(Relationship {
                id: n.attribute("Id")?.to_string(),
                kind: n.attribute("Type").unwrap_or_default().to_string(),
                target: package::resolve_target(source_part, n.attribute("Target")?),
            })
        })
        .collect())
}

fn office_document_part(package: &WorkbookPackage) -> Result<String, WorkbookError> {
    let from_rels = relationships(package, "")?
        .into_iter()
        .find(|rel| rel.kind.ends_with(REL_OFFICE_DOCUMENT))
        .map(|rel| rel.target);
    Ok(from_rels.unwrap_or_else(|| DEFAULT_WORKBOOK_PART.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    fn zip_bytes(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::<()>::default().compression_method(CompressionMethod::Stored);
        for (name, body) in parts {
            writer.start_file(*name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    const ROOT_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

    const WORKBOOK_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="/xl/worksheets/sheet2.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#;

    const WORKBOOK: &str = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><bookViews><workbookView activeTab="1"/></bookViews><sheets><sheet name="Legend" sheetId="1" r:id="rId1"/><sheet name="Data" sheetId="2" r:id="rId2"/></sheets></workbook>"#;

    fn two_sheet_workbook() -> Vec<u8> {
        zip_bytes(&[
            ("_rels/.rels", ROOT_RELS),
            ("xl/workbook.xml", WORKBOOK),
            ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
            (
                "xl/sharedStrings.xml",
                r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><si><t>legend</t></si><si><t>1.1 &lt;Id&gt;</t></si></sst>"#,
            ),
            (
                "xl/worksheets/sheet1.xml",
                r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c></row></sheetData></worksheet>"#,
            ),
            (
                "xl/worksheets/sheet2.xml",
                r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1"/><sheetData><row r="1"><c r="A1" t="s"><v>1</v></c></row></sheetData></worksheet>"#,
            ),
            ("docProps/app.xml", "<Properties/>"),
        ])
    }

    #[test]
    fn resolves_sheets_and_active_tab() {
        let workbook = Workbook::from_bytes(&two_sheet_workbook()).unwrap();
        assert_eq!(
            workbook.sheets(),
            &[
                SheetEntry {
                    name: "Legend".to_string(),
                    part: "xl/worksheets/sheet1.xml".to_string(),
                },
                SheetEntry {
                    name: "Data".to_string(),
                    part: "xl/worksheets/sheet2.xml".to_string(),
                },
            ]
        );
        assert_eq!(workbook.active_index(), 1);
        assert_eq!(workbook.first_sheet().unwrap().text(1, 1), Some("legend"));
        assert_eq!(workbook.active_sheet().unwrap().text(1, 1), Some("1.1 <Id>"));
        assert!(matches!(
            workbook.sheet_at(5),
            Err(WorkbookError::SheetIndex { index: 5, count: 2 })
        ));
    }

    #[test]
    fn append_targets_active_sheet_and_preserves_other_parts() {
        let original = two_sheet_workbook();
        let mut workbook = Workbook::from_bytes(&original).unwrap();
        let row = workbook
            .append_row(&["Acme".to_string(), "è".to_string()])
            .unwrap();
        assert_eq!(row, 2);

        let reopened = Workbook::from_bytes(&workbook.to_bytes().unwrap()).unwrap();
        let data = reopened.active_sheet().unwrap();
        assert_eq!(data.text(2, 1), Some("Acme"));
        assert_eq!(data.text(2, 2), Some("è"));
        assert_eq!(reopened.first_sheet().unwrap().max_row(), 1);

        let before = WorkbookPackage::from_bytes(&original).unwrap();
        assert_eq!(
            reopened.package().part("docProps/app.xml"),
            before.part("docProps/app.xml")
        );
    }

    #[test]
    fn workbook_without_sheets_is_rejected() {
        let bytes = zip_bytes(&[(
            "xl/workbook.xml",
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheets/></workbook>"#,
        )]);
        assert!(matches!(
            Workbook::from_bytes(&bytes),
            Err(WorkbookError::NoWorksheets)
        ));
    }
}
