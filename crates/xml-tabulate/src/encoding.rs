//! Byte-to-text decoding for XML payloads.
//!
//! `roxmltree` only accepts `&str`, so every XML byte stream goes through this module
//! first. Workbook parts are always UTF-8 or UTF-16 ([`decode_xml_bytes`]); input
//! documents may also declare a legacy encoding ([`decode_xml_document`]).

use std::borrow::Cow;
use std::sync::OnceLock;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use regex::bytes::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("invalid UTF-16: {0}")]
    Utf16(#[from] std::string::FromUtf16Error),
    #[error("odd byte length {0} for UTF-16 content")]
    OddUtf16Length(usize),
    #[error("unsupported encoding declaration `{0}`")]
    UnknownEncoding(String),
    #[error("invalid {0} byte sequence")]
    Malformed(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Utf16Order {
    Little,
    Big,
}

/// Decode UTF-8 (optionally BOM-prefixed) or UTF-16 (BOM or `<` sniffing) XML bytes.
pub fn decode_xml_bytes(bytes: &[u8]) -> Result<Cow<'_, str>, DecodeError> {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return Ok(Cow::Borrowed(std::str::from_utf8(rest)?));
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(rest, Utf16Order::Little).map(Cow::Owned);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(rest, Utf16Order::Big).map(Cow::Owned);
    }
    if let Some(order) = sniff_utf16(bytes) {
        return decode_utf16(bytes, order).map(Cow::Owned);
    }
    Ok(Cow::Borrowed(std::str::from_utf8(bytes)?))
}

/// Decode an XML document, honouring the `encoding` pseudo-attribute of its declaration.
///
/// A BOM or UTF-16 layout wins over the declaration. Without one, a declared label
/// other than UTF-8 selects the decoder (`ISO-8859-1` maps to windows-1252, as in
/// browsers); undeclared documents are UTF-8.
pub fn decode_xml_document(bytes: &[u8]) -> Result<Cow<'_, str>, DecodeError> {
    let has_bom = bytes.starts_with(&[0xEF, 0xBB, 0xBF])
        || bytes.starts_with(&[0xFF, 0xFE])
        || bytes.starts_with(&[0xFE, 0xFF]);
    if has_bom || sniff_utf16(bytes).is_some() {
        return decode_xml_bytes(bytes);
    }
    let Some(label) = declared_encoding(bytes) else {
        return decode_xml_bytes(bytes);
    };
    let encoding = Encoding::for_label(label)
        .ok_or_else(|| DecodeError::UnknownEncoding(String::from_utf8_lossy(label).into_owned()))?;
    // An ASCII-readable declaration rules out UTF-16.
    if encoding == UTF_8 || encoding == UTF_16LE || encoding == UTF_16BE {
        return decode_xml_bytes(bytes);
    }
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .ok_or(DecodeError::Malformed(encoding.name()))
}

fn declared_encoding(bytes: &[u8]) -> Option<&[u8]> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r#"^\s*<\?xml[^>]*?\sencoding\s*=\s*["']([A-Za-z][A-Za-z0-9._:-]*)["']"#)
            .expect("valid xml declaration regex")
    });
    pattern
        .captures(bytes)
        .and_then(|captures| captures.get(1))
        .map(|label| label.as_bytes())
}

fn decode_utf16(bytes: &[u8], order: Utf16Order) -> Result<String, DecodeError> {
    if bytes.len() % 2 != 0 {
        return Err(DecodeError::OddUtf16Length(bytes.len()));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| match order {
            Utf16Order::Little => u16::from_le_bytes([pair[0], pair[1]]),
            Utf16Order::Big => u16::from_be_bytes([pair[0], pair[1]]),
        })
        .collect();
    Ok(String::from_utf16(&units)?)
}

/// Detect BOM-less UTF-16 by looking for the first `<` encoded as a 16-bit unit,
/// skipping leading ASCII whitespace.
fn sniff_utf16(bytes: &[u8]) -> Option<Utf16Order> {
    for pair in bytes.chunks_exact(2) {
        match (pair[0], pair[1]) {
            (b'<', 0) => return Some(Utf16Order::Little),
            (0, b'<') => return Some(Utf16Order::Big),
            (ws, 0) if ws.is_ascii_whitespace() => continue,
            (0, ws) if ws.is_ascii_whitespace() => continue,
            _ => return None,
        }
    }
    None
}
