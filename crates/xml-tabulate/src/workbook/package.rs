use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::WorkbookError;

/// The parts (files) of an XLSX package held in memory, in archive order.
///
/// Part names are normalized OPC names: forward slashes, no leading `/`.
#[derive(Debug, Clone, Default)]
pub struct WorkbookPackage {
    parts: Vec<(String, Vec<u8>)>,
}

impl WorkbookPackage {
    pub fn open(path: &Path) -> Result<Self, WorkbookError> {
        let file = File::open(path).map_err(|source| WorkbookError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut zip = ZipArchive::new(file)?;
        Self::read_zip(&mut zip)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WorkbookError> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))?;
        Self::read_zip(&mut zip)
    }

    fn read_zip<R: Read + Seek>(zip: &mut ZipArchive<R>) -> Result<Self, WorkbookError> {
        let mut parts: Vec<(String, Vec<u8>)> = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut file = zip.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = normalize_part_name(file.name());
            // ZIP size metadata is untrusted; let the reader grow the buffer.
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)
                .map_err(|source| WorkbookError::PartIo {
                    part: name.clone(),
                    source,
                })?;
            if parts.iter().any(|(existing, _)| existing == &name) {
                return Err(WorkbookError::DuplicatePart(name));
            }
            parts.push((name, buf));
        }
        Ok(Self { parts })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        let name = normalize_part_name(name);
        self.parts
            .iter()
            .find(|(part, _)| *part == name)
            .map(|(_, bytes)| bytes.as_slice())
    }

    pub fn require_part(&self, name: &str) -> Result<&[u8], WorkbookError> {
        self.part(name)
            .ok_or_else(|| WorkbookError::MissingPart(normalize_part_name(name)))
    }

    /// Replace an existing part, or append a new one at the end of the archive.
    pub fn set_part(&mut self, name: &str, bytes: Vec<u8>) {
        let name = normalize_part_name(name);
        match self.parts.iter_mut().find(|(part, _)| *part == name) {
            Some((_, existing)) => *existing = bytes,
            None => self.parts.push((name, bytes)),
        }
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(name, _)| name.as_str())
    }

    /// Serialize the package back into a ZIP archive.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WorkbookError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::<()>::default().compression_method(CompressionMethod::Deflated);
        for (name, bytes) in &self.parts {
            writer.start_file(name.as_str(), options)?;
            writer
                .write_all(bytes)
                .map_err(|source| WorkbookError::PartIo {
                    part: name.clone(),
                    source,
                })?;
        }
        Ok(writer.finish()?.into_inner())
    }
}

pub(crate) fn normalize_part_name(name: &str) -> String {
    resolve_dots(&name.replace('\\', "/"))
}

/// Resolve `.`/`..` segments and drop empty ones (`xl//a.xml`, leading `/`).
fn resolve_dots(path: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out.join("/")
}

/// The `_rels` part describing relationships of `part` (`xl/workbook.xml` →
/// `xl/_rels/workbook.xml.rels`).
pub(crate) fn rels_part_for(part: &str) -> String {
    let part = normalize_part_name(part);
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Resolve a relationship `Target` against the part that owns the relationship.
pub(crate) fn resolve_target(source_part: &str, target: &str) -> String {
    let target = target.split('#').next().unwrap_or_default().replace('\\', "/");
    if let Some(absolute) = target.strip_prefix('/') {
        return resolve_dots(absolute);
    }
    let source = normalize_part_name(source_part);
    match source.rsplit_once('/') {
        Some((dir, _)) => resolve_dots(&format!("{dir}/{target}")),
        None => resolve_dots(&target),
    }
}
