use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Dotted numeric identifier naming a position in the tag hierarchy (e.g. `2.1.5`).
///
/// Segments are kept verbatim: `1.02` and `1.2` are distinct identifiers, the same
/// way the reference tables spell them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid identifier {0:?} (expected dot-separated digits such as `2.1.5`)")]
pub struct InvalidIdentifier(pub String);

impl Identifier {
    pub fn parse(text: &str) -> Result<Self, InvalidIdentifier> {
        let valid = !text.is_empty()
            && text
                .split('.')
                .all(|segment| !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()));
        if valid {
            Ok(Self(text.to_string()))
        } else {
            Err(InvalidIdentifier(text.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of dotted segments (`2.1.5` has depth 3).
    pub fn depth(&self) -> usize {
        self.0.split('.').count()
    }

    /// The identifier with its last segment removed, or `None` for a top-level identifier.
    pub fn parent(&self) -> Option<Identifier> {
        self.0
            .rfind('.')
            .map(|idx| Identifier(self.0[..idx].to_string()))
    }

    /// Every prefix of this identifier, shortest first, ending with the identifier itself.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> + '_ {
        self.0
            .match_indices('.')
            .map(|(idx, _)| &self.0[..idx])
            .chain(std::iter::once(self.0.as_str()))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identifier {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identifier::parse(s)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Ordering and hashing are those of the inner string, so maps keyed by `Identifier`
// can be looked up with `&str` prefixes.
impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// `<ws>* <identifier> <ws>* <TagName>` as written in reference tables.
///
/// Anchored at the start of the cell; trailing text after the closing `>` is ignored.
pub(crate) fn reference_entry_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(\d+(?:\.\d+)*)\s*<([^>]+)>").expect("valid reference entry regex")
    })
}

/// `<identifier> <ws>* <` at the very start of a mapping header cell.
pub(crate) fn header_identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(\d+(?:\.\d+)*)\s*<").expect("valid header identifier regex")
    })
}

/// Parse a reference-table cell into its identifier and tag name.
pub fn parse_reference_entry(text: &str) -> Option<(Identifier, String)> {
    let caps = reference_entry_pattern().captures(text)?;
    let id = Identifier(caps.get(1)?.as_str().to_string());
    let tag = caps.get(2)?.as_str().to_string();
    Some((id, tag))
}

/// Parse the leading identifier of a mapping header cell such as `2.1.1.3 <IdCodice>`.
pub fn parse_header_identifier(text: &str) -> Option<Identifier> {
    let caps = header_identifier_pattern().captures(text)?;
    Some(Identifier(caps.get(1)?.as_str().to_string()))
}
