//! In-memory table of named columns with optional cells.

/// Normalises a raw header into its canonical spelling.
///
/// Trims, lower-cases and replaces each run of internal whitespace with a single `_`.
pub fn normalize_column(name: &str) -> String {
    name.trim_start_matches('\u{feff}')
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Comparison key for a header or alias: the normalised form with underscores removed.
///
/// Two spellings of the same logical column always share a key, e.g. `"ICD 11"`, `"icd_11"`
/// and `"Icd11"` all map to `"icd11"`.
pub fn column_key(name: &str) -> String {
    normalize_column(name).replace('_', "")
}

/// One successfully read data row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableRow {
    index: usize,
    cells: Vec<Option<String>>,
}

impl TableRow {
    /// 1-based position of the row among the data rows of its source.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns the trimmed, non-blank value at `column`, if any.
    pub fn cell(&self, column: usize) -> Option<&str> {
        self.cells.get(column).and_then(|c| c.as_deref())
    }

    /// True when every cell is blank.
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }
}

/// A data row that could not be read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedRow {
    pub index: usize,
    pub reason: String,
}

/// A table of named columns.
///
/// Read-only once built: callers receive rows by reference and never mutate cells.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Table {
    headers: Vec<String>,
    keys: Vec<String>,
    rows: Vec<TableRow>,
    rejected: Vec<RejectedRow>,
}

impl Table {
    /// Creates an empty table, normalising the supplied headers.
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let headers: Vec<String> = headers
            .into_iter()
            .map(|h| normalize_column(h.as_ref()))
            .collect();
        let keys = headers.iter().map(|h| h.replace('_', "")).collect();
        Self {
            headers,
            keys,
            rows: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// Builds a table from named records, e.g. manually entered form data.
    ///
    /// The header set is the union of all field names in first-seen order; a record that lacks
    /// a field gets a blank cell for it.
    pub fn from_named_rows<R, K, V>(records: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let records: Vec<Vec<(String, String)>> = records
            .into_iter()
            .map(|record| {
                record
                    .into_iter()
                    .map(|(k, v)| (normalize_column(k.as_ref()), v.as_ref().to_string()))
                    .collect()
            })
            .collect();

        let mut headers: Vec<String> = Vec::new();
        for (name, _) in records.iter().flatten() {
            if !headers.contains(name) {
                headers.push(name.clone());
            }
        }

        let mut table = Table::new(&headers);
        for record in records {
            let cells = headers
                .iter()
                .map(|h| {
                    record
                        .iter()
                        .find(|(name, _)| name == h)
                        .map(|(_, value)| value.as_str())
                })
                .collect::<Vec<_>>();
            table.push_cells(cells);
        }
        table
    }

    /// Appends a data row; cells are trimmed and blank cells become `None`.
    pub fn push_cells<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = Option<S>>,
        S: AsRef<str>,
    {
        let cells = cells
            .into_iter()
            .map(|c| {
                c.and_then(|v| {
                    let trimmed = v.as_ref().trim();
                    (!trimmed.is_empty()).then(|| trimmed.to_string())
                })
            })
            .collect();
        let index = self.next_index();
        self.rows.push(TableRow { index, cells });
    }

    /// Records a data row that could not be read.
    pub fn push_rejected(&mut self, reason: impl Into<String>) {
        let index = self.next_index();
        self.rejected.push(RejectedRow {
            index,
            reason: reason.into(),
        });
    }

    fn next_index(&self) -> usize {
        self.rows.len() + self.rejected.len() + 1
    }

    /// Normalised headers, in source order.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Successfully read rows, in source order.
    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Rows that could not be read.
    pub fn rejected(&self) -> &[RejectedRow] {
        &self.rejected
    }

    /// Number of readable rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first column whose key matches `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let key = column_key(name);
        self.keys.iter().position(|k| *k == key)
    }

    /// Index of the first alias (in alias order) present in this table.
    pub fn find_column(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|a| self.column_index(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_case_and_whitespace() {
        assert_eq!(normalize_column("  Condition   Name "), "condition_name");
        assert_eq!(normalize_column("ICD 11"), "icd_11");
        assert_eq!(normalize_column("\u{feff}Disease"), "disease");
    }

    #[test]
    fn column_keys_ignore_underscores() {
        assert_eq!(column_key("ICD 11"), "icd11");
        assert_eq!(column_key("icd_11"), "icd11");
        assert_eq!(column_key("Icd11"), "icd11");
    }

    #[test]
    fn find_column_respects_alias_order() {
        let table = Table::new(["Condition", "Disease", "ICD 11"]);
        assert_eq!(table.find_column(&["disease", "condition"]), Some(1));
        assert_eq!(table.find_column(&["icd11", "icd11_code"]), Some(2));
        assert_eq!(table.find_column(&["unani"]), None);
    }

    #[test]
    fn blank_cells_become_none() {
        let mut table = Table::new(["a", "b", "c"]);
        table.push_cells([Some(" x "), Some("   "), None]);

        let row = &table.rows()[0];
        assert_eq!(row.cell(0), Some("x"));
        assert_eq!(row.cell(1), None);
        assert_eq!(row.cell(2), None);
        assert_eq!(row.cell(9), None);
    }

    #[test]
    fn row_indices_count_rejected_rows() {
        let mut table = Table::new(["a"]);
        table.push_cells([Some("1")]);
        table.push_rejected("bad row");
        table.push_cells([Some("3")]);

        assert_eq!(table.rows()[0].index(), 1);
        assert_eq!(table.rejected()[0].index, 2);
        assert_eq!(table.rows()[1].index(), 3);
    }

    #[test]
    fn named_rows_union_headers() {
        let table = Table::from_named_rows(vec![
            vec![("first_name", "Asha"), ("Condition Name", "Diabetes")],
            vec![("first_name", "Ravi"), ("value", "7.2")],
        ]);

        assert_eq!(table.headers(), &["first_name", "condition_name", "value"]);
        let second = &table.rows()[1];
        assert_eq!(second.cell(0), Some("Ravi"));
        assert_eq!(second.cell(1), None);
        assert_eq!(second.cell(2), Some("7.2"));
    }

    #[test]
    fn blank_row_detection() {
        let mut table = Table::new(["a", "b"]);
        table.push_cells([None::<&str>, Some(" ")]);
        assert!(table.rows()[0].is_blank());
    }
}
