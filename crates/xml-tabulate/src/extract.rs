//! Value extraction from XML documents along a [`TagPath`].

use std::path::Path;

use roxmltree::{Document, Node, ParsingOptions};

use crate::encoding::decode_xml_document;
use crate::tag_path::TagPath;
use crate::TranscribeError;

/// Decoded text of one XML input, ready to be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlSource {
    origin: String,
    text: String,
}

impl XmlSource {
    /// Decode raw bytes, honouring a declared encoding; `origin` names the document in errors and logs.
    pub fn from_bytes(origin: impl Into<String>, bytes: &[u8]) -> Result<Self, TranscribeError> {
        let origin = origin.into();
        let text = decode_xml_document(bytes)
            .map_err(|source| TranscribeError::XmlEncoding {
                document: origin.clone(),
                source,
            })?
            .into_owned();
        Ok(Self { origin, text })
    }

    pub fn read(path: &Path) -> Result<Self, TranscribeError> {
        let bytes = std::fs::read(path).map_err(|source| TranscribeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(path.display().to_string(), &bytes)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parse into a DOM. DTDs are accepted; external entities are never fetched.
    pub fn parse(&self) -> Result<Document<'_>, TranscribeError> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        Document::parse_with_options(&self.text, options).map_err(|source| {
            TranscribeError::MalformedXml {
                document: self.origin.clone(),
                source,
            }
        })
    }
}

/// Collect the trimmed, non-empty text of every node reached by `path`.
///
/// Starting from the root element, each step keeps the element children (any
/// namespace) whose local name equals the step. Results come back in document order.
/// An empty path reaches nothing.
pub fn extract_values(doc: &Document<'_>, path: &TagPath) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }

    let mut current = vec![doc.root_element()];
    for step in path.segments() {
        current = current
            .iter()
            .flat_map(|node| node.children())
            .filter(|child| child.is_element() && child.tag_name().name() == step)
            .collect();
        if current.is_empty() {
            return Vec::new();
        }
    }

    current
        .into_iter()
        .map(node_text)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .collect()
}

/// Character data of `node` up to its first child element.
///
/// Comments and processing instructions are skipped; CDATA sections count as text.
pub fn node_text(node: Node<'_, '_>) -> String {
    let mut out = String::new();
    for child in node.children() {
        if child.is_element() {
            break;
        }
        if child.is_text() {
            out.push_str(child.text().unwrap_or_default());
        }
    }
    out
}
