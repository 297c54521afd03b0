use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SharedStringsError {
    #[error("xml parse error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("utf-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("malformed sharedStrings.xml: {0}")]
    Malformed(&'static str),
}

/// Read the display text of every `<si>` item in `xl/sharedStrings.xml`.
///
/// Rich-text runs are flattened; phonetic (`<rPh>`) runs are not part of the displayed
/// string and are dropped.
pub fn parse_shared_strings(xml: &str) -> Result<Vec<String>, SharedStringsError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut items = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"si" => {
                items.push(read_item(&mut reader)?);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"si" => items.push(String::new()),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(items)
}

fn read_item(reader: &mut Reader<&[u8]>) -> Result<String, SharedStringsError> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => {
                read_t(reader, &mut text)?;
            }
            // Runs only wrap `<t>`; descend into them and keep scanning.
            Event::Start(e) if e.local_name().as_ref() == b"r" => {}
            Event::End(e) if e.local_name().as_ref() == b"r" => {}
            Event::Start(e) => {
                reader.read_to_end_into(e.name(), &mut Vec::new())?;
            }
            Event::End(e) if e.local_name().as_ref() == b"si" => break,
            Event::Eof => return Err(SharedStringsError::Malformed("unexpected eof in <si>")),
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

fn read_t(reader: &mut Reader<&[u8]>, out: &mut String) -> Result<(), SharedStringsError> {
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => out.push_str(&e.unescape()?),
            Event::CData(e) => out.push_str(std::str::from_utf8(e.as_ref())?),
            Event::End(e) if e.local_name().as_ref() == b"t" => break,
            Event::Eof => return Err(SharedStringsError::Malformed("unexpected eof in <t>")),
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

/// Text of an inline string (`<c t="inlineStr"><is>…</is></c>`), with the same flattening
/// rules as shared string items.
pub(crate) fn inline_string_text(is: roxmltree::Node<'_, '_>) -> String {
    let mut out = String::new();
    for child in is.children().filter(|n| n.is_element()) {
        match child.tag_name().name() {
            "t" => push_text(child, &mut out),
            "r" => {
                for t in child
                    .children()
                    .filter(|n| n.is_element() && n.tag_name().name() == "t")
                {
                    push_text(t, &mut out);
                }
            }
            _ => {}
        }
    }
    out
}

fn push_text(t: roxmltree::Node<'_, '_>, out: &mut String) {
    for text in t.children().filter(|n| n.is_text()).filter_map(|n| n.text()) {
        out.push_str(text);
    }
}
