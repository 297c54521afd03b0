use std::collections::BTreeMap;

use crate::identifier::{parse_header_identifier, Identifier};
use crate::workbook::Sheet;

/// Column index (1-based) → authoritative identifier for that column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnLeafMap {
    leaves: BTreeMap<u32, Identifier>,
}

impl ColumnLeafMap {
    /// Resolve every column of `sheet` by scanning its header region bottom-up.
    ///
    /// The lowest text cell of a column that starts with `<id> <` wins; columns with no
    /// such cell are left out.
    pub fn from_sheet(sheet: &Sheet) -> Self {
        let mut leaves = BTreeMap::new();
        for col in 1..=sheet.max_column() {
            let leaf = (1..=sheet.max_row())
                .rev()
                .filter_map(|row| sheet.text(row, col))
                .find_map(parse_header_identifier);
            match leaf {
                Some(id) => {
                    leaves.insert(col, id);
                }
                None => log::debug!("column {col} of {:?} has no identifier", sheet.name()),
            }
        }
        Self { leaves }
    }

    pub fn leaf(&self, col: u32) -> Option<&Identifier> {
        self.leaves.get(&col)
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Identifier)> {
        self.leaves.iter().map(|(col, id)| (*col, id))
    }
}
