use std::collections::BTreeMap;
use std::fmt;

use crate::id_table::IdentifierTable;
use crate::identifier::Identifier;

/// Root-first sequence of tag names leading to an identifier's node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TagPath(Vec<String>);

impl TagPath {
    /// Path for `id`: the documented tag of every prefix of `id`, shortest first.
    ///
    /// Undocumented prefixes are skipped, so an identifier absent from the table can still
    /// yield a partial path through its documented ancestors. An identifier with no
    /// documented prefix at all yields an empty path.
    pub fn for_identifier(table: &IdentifierTable, id: &Identifier) -> Self {
        Self(
            id.prefixes()
                .filter_map(|prefix| table.tag(prefix))
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TagPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// TagPath of every documented identifier, derived once from an [`IdentifierTable`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPaths {
    paths: BTreeMap<Identifier, TagPath>,
}

impl TagPaths {
    pub fn resolve(table: &IdentifierTable) -> Self {
        let paths = table
            .iter()
            .map(|(id, _)| (id.clone(), TagPath::for_identifier(table, id)))
            .collect();
        Self { paths }
    }

    /// Path for a documented identifier; empty for anything the table does not list.
    pub fn path_for(&self, id: &Identifier) -> TagPath {
        self.paths.get(id).cloned().unwrap_or_default()
    }

    pub fn get(&self, id: &Identifier) -> Option<&TagPath> {
        self.paths.get(id)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &TagPath)> {
        self.paths.iter()
    }
}
