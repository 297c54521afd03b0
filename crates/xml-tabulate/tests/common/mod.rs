#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::Path;

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const REFERENCE_ROWS: &[&[&str]] = &[
    &["Rappresentazione tabellare", ""],
    &["ID e Nome", "Descrizione"],
    &["1 <FatturaElettronicaHeader>", ""],
    &["1.1 <DatiTrasmissione>", ""],
    &["1.1.4 <CodiceDestinatario>", "codice"],
    &["2 <FatturaElettronicaBody>", ""],
    &["2.1 <DatiGenerali>", ""],
    &["2.1.1 <DatiGeneraliDocumento>", ""],
    &["2.1.1.4 <Numero>", ""],
    &["2.2 <DatiBeniServizi>", ""],
    &["2.2.1 <DettaglioLinee>", ""],
    &["2.2.1.4 <Descrizione>", ""],
    &["2.2.1.11 <PrezzoTotale>", ""],
];

pub const MAPPING_ROWS: &[&[&str]] = &[
    &["1 <FatturaElettronicaHeader>", "2 <FatturaElettronicaBody>", "Note", "2 <FatturaElettronicaBody>"],
    &["1.1.4 <CodiceDestinatario>", "2.1.1.4 <Numero>", "", "2.2.1 <DettaglioLinee>"],
    &["", "", "", "2.2.1.11 <PrezzoTotale>"],
];

pub const LEGEND_ROWS: &[&[&str]] = &[&["legend"]];

pub fn invoice(code: &str, number: &str, totals: &[&str]) -> String {
    let lines: String = totals
        .iter()
        .map(|total| {
            format!("<DettaglioLinee><Descrizione>riga</Descrizione><PrezzoTotale>{total}</PrezzoTotale></DettaglioLinee>")
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<p:FatturaElettronica xmlns:p="http://ivaservizi.agenziaentrate.gov.it/docs/xsd/fatture/v1.2" versione="FPR12">
  <FatturaElettronicaHeader><DatiTrasmissione><CodiceDestinatario>{code}</CodiceDestinatario></DatiTrasmissione></FatturaElettronicaHeader>
  <FatturaElettronicaBody>
    <DatiGenerali><DatiGeneraliDocumento><Numero>{number}</Numero></DatiGeneraliDocumento></DatiGenerali>
    <DatiBeniServizi>{lines}</DatiBeniServizi>
  </FatturaElettronicaBody>
</p:FatturaElettronica>"#
    )
}

pub fn zip_bytes(parts: &[(&str, String)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
    for (name, body) in parts {
        writer.start_file(*name, options).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn column_name(mut col: usize) -> String {
    let mut name = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        name.push(b'A' + rem as u8);
        col = (col - 1) / 26;
    }
    name.reverse();
    String::from_utf8(name).unwrap()
}

/// Build an XLSX package with one worksheet per entry; all text goes through `sharedStrings.xml`.
pub fn xlsx_bytes(sheets: &[(&str, &[&[&str]])], active: usize) -> Vec<u8> {
    let mut strings: Vec<String> = Vec::new();
    let mut parts = Vec::new();
    let mut sheet_entries = String::new();
    let mut rels = String::new();

    for (idx, (name, rows)) in sheets.iter().enumerate() {
        let n = idx + 1;
        let mut data = String::new();
        for (r, row) in rows.iter().enumerate() {
            data.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let sst = match strings.iter().position(|s| s == value) {
                    Some(pos) => pos,
                    None => {
                        strings.push(value.to_string());
                        strings.len() - 1
                    }
                };
                data.push_str(&format!(
                    r#"<c r="{}{}" t="s"><v>{sst}</v></c>"#,
                    column_name(c + 1),
                    r + 1
                ));
            }
            data.push_str("</row>");
        }
        parts.push((
            format!("xl/worksheets/sheet{n}.xml"),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{data}</sheetData><pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></worksheet>"#
            ),
        ));
        sheet_entries.push_str(&format!(
            r#"<sheet name="{}" sheetId="{n}" r:id="rId{n}"/>"#,
            escape(name)
        ));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        ));
    }

    let sst_id = sheets.len() + 1;
    rels.push_str(&format!(
        r#"<Relationship Id="rId{sst_id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#
    ));
    let items: String = strings
        .iter()
        .map(|s| format!("<si><t>{}</t></si>", escape(s)))
        .collect();

    let mut all = vec![
        (
            "[Content_Types].xml".to_string(),
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/></Types>"#
                .to_string(),
        ),
        (
            "_rels/.rels".to_string(),
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
                .to_string(),
        ),
        (
            "xl/workbook.xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><bookViews><workbookView activeTab="{active}"/></bookViews><sheets>{sheet_entries}</sheets></workbook>"#
            ),
        ),
        (
            "xl/_rels/workbook.xml.rels".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
            ),
        ),
        (
            "xl/sharedStrings.xml".to_string(),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">{items}</sst>"#,
                strings.len()
            ),
        ),
    ];
    all.extend(parts);

    let borrowed: Vec<(&str, String)> = all
        .iter()
        .map(|(name, body)| (name.as_str(), body.clone()))
        .collect();
    zip_bytes(&borrowed)
}

/// Lay out `dir` the conventional way: reference, mapping and output workbooks plus `XML/`.
///
/// The output workbook starts as a copy of the mapping workbook.
pub fn write_layout(dir: &Path, documents: &[(&str, String)]) {
    std::fs::write(
        dir.join("RappresentazioneTabellareFattOrdinaria (1).xlsx"),
        xlsx_bytes(&[("Tabella", REFERENCE_ROWS)], 0),
    )
    .unwrap();
    let mapping = xlsx_bytes(&[("Legenda", LEGEND_ROWS), ("Mapping", MAPPING_ROWS)], 1);
    std::fs::write(dir.join("hierarchical_mapping_fixed.xlsx"), &mapping).unwrap();
    std::fs::write(dir.join("hierarchical_mapping_populated_json.xlsx"), &mapping).unwrap();

    let xml_dir = dir.join("XML");
    std::fs::create_dir_all(&xml_dir).unwrap();
    for (name, body) in documents {
        std::fs::write(xml_dir.join(name), body).unwrap();
    }
}
