use serde::Serialize;

/// Values collected for one column of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ExtractedValue {
    #[default]
    Empty,
    Single(String),
    Multiple(Vec<String>),
}

impl ExtractedValue {
    /// Classify already trimmed, non-empty values.
    pub fn from_values(mut values: Vec<String>) -> Self {
        match values.len() {
            0 => ExtractedValue::Empty,
            1 => ExtractedValue::Single(values.remove(0)),
            _ => ExtractedValue::Multiple(values),
        }
    }

    /// Cell text: the scalar itself, or a compact JSON array such as `["10","20"]`.
    pub fn encode(&self) -> String {
        match self {
            ExtractedValue::Empty => String::new(),
            ExtractedValue::Single(value) => value.clone(),
            // Serializing a list of strings cannot fail.
            ExtractedValue::Multiple(values) => serde_json::to_string(values).unwrap_or_default(),
        }
    }

    /// Recover the value list from a cell written by [`ExtractedValue::encode`].
    ///
    /// A single value that happens to look like a JSON array of two or more strings is
    /// indistinguishable from a multi-value cell and decodes as one.
    pub fn decode(cell: &str) -> Self {
        if cell.is_empty() {
            return ExtractedValue::Empty;
        }
        match serde_json::from_str::<Vec<String>>(cell) {
            Ok(values) if values.len() >= 2 => ExtractedValue::Multiple(values),
            _ => ExtractedValue::Single(cell.to_string()),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            ExtractedValue::Empty => Vec::new(),
            ExtractedValue::Single(value) => vec![value.as_str()],
            ExtractedValue::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ExtractedValue::Empty)
    }
}

/// One encoded cell per column of the mapping sheet, column A first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OutputRow(Vec<String>);

impl OutputRow {
    /// Assemble a row of `width` cells; columns without a value stay empty.
    pub fn build<I>(width: u32, columns: I) -> Self
    where
        I: IntoIterator<Item = (u32, ExtractedValue)>,
    {
        let mut cells = vec![String::new(); width as usize];
        for (col, value) in columns {
            match (col as usize).checked_sub(1).and_then(|idx| cells.get_mut(idx)) {
                Some(cell) => *cell = value.encode(),
                None => log::debug!("dropping value for column {col} outside row width {width}"),
            }
        }
        Self(cells)
    }

    pub fn cells(&self) -> &[String] {
        &self.0
    }

    pub fn cell(&self, col: u32) -> Option<&str> {
        (col as usize)
            .checked_sub(1)
            .and_then(|idx| self.0.get(idx))
            .map(String::as_str)
    }

    pub fn width(&self) -> usize {
        self.0.len()
    }

    pub fn into_cells(self) -> Vec<String> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn multiplicity_picks_the_encoding() {
        assert_eq!(ExtractedValue::from_values(vec![]).encode(), "");
        assert_eq!(ExtractedValue::from_values(strings(&["Acme"])).encode(), "Acme");
        assert_eq!(
            ExtractedValue::from_values(strings(&["10", "20"])).encode(),
            r#"["10","20"]"#
        );
    }

    #[test]
    fn non_ascii_is_written_verbatim() {
        let value = ExtractedValue::from_values(strings(&["Società", "€ 5", "a\"b"]));
        assert_eq!(value.encode(), r#"["Società","€ 5","a\"b"]"#);
    }

    #[test]
    fn decode_recovers_values() {
        assert_eq!(ExtractedValue::decode(""), ExtractedValue::Empty);
        assert_eq!(
            ExtractedValue::decode("Acme").values(),
            vec!["Acme"]
        );
        assert_eq!(
            ExtractedValue::decode(r#"["10","20"]"#).values(),
            vec!["10", "20"]
        );
        // A one-element array is only ever produced by a scalar that looks like JSON.
        assert_eq!(
            ExtractedValue::decode(r#"["x"]"#),
            ExtractedValue::Single(r#"["x"]"#.to_string())
        );
    }

    #[test]
    fn scalar_round_trips_to_one_element_collection() {
        let original = "IT01234567890";
        let encoded = ExtractedValue::Single(original.to_string()).encode();
        assert_eq!(ExtractedValue::decode(&encoded).values(), vec![original]);
    }

    #[test]
    fn scalar_that_looks_like_an_array_decodes_as_multiple() {
        let encoded = ExtractedValue::Single(r#"["a","b"]"#.to_string()).encode();
        assert_eq!(encoded, r#"["a","b"]"#);
        assert_eq!(
            ExtractedValue::decode(&encoded),
            ExtractedValue::Multiple(strings(&["a", "b"]))
        );
    }

    #[test]
    fn row_has_one_slot_per_column() {
        let row = OutputRow::build(
            4,
            [
                (1, ExtractedValue::Single("a".into())),
                (3, ExtractedValue::Multiple(strings(&["x", "y"]))),
                (9, ExtractedValue::Single("out of range".into())),
            ],
        );
        assert_eq!(row.cells(), strings(&["a", "", r#"["x","y"]"#, ""]).as_slice());
        assert_eq!(row.cell(3), Some(r#"["x","y"]"#));
        assert_eq!(row.cell(0), None);
        assert_eq!(row.width(), 4);
    }
}
