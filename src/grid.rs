use {
    crate::flatten_document::FlatRecord,
    indexmap::IndexSet,
    serde_json::Value,
    tap::Tap,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("row {row} is out of bounds for a table of {len} row(s)")]
    RowOutOfBounds { row: usize, len: usize },
}

type Result<T> = std::result::Result<T, self::Error>;

/// Editable rows of flat records. The column set is the union of every key seen, in first-seen
/// order; a row without a key has an empty cell there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: IndexSet<String>,
    rows: Vec<FlatRecord>,
}

impl Table {
    pub fn with_columns(columns: impl IntoIterator<Item = String>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
            rows: Vec::new(),
        }
    }

    pub fn from_records(records: impl IntoIterator<Item = FlatRecord>) -> Self {
        Self::default().tap_mut(|table| records.into_iter().for_each(|record| table.push_row(record)))
    }

    pub fn columns(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.columns.iter().map(String::as_str)
    }

    pub fn rows(&self) -> &[FlatRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        self.rows.get(row).and_then(|record| record.get(column))
    }

    /// A column whose present, non-null cells are all strings.
    pub fn is_text_column(&self, column: &str) -> bool {
        let mut present = self
            .rows
            .iter()
            .filter_map(|record| record.get(column))
            .filter(|value| !value.is_null())
            .peekable();
        present.peek().is_some() && present.all(Value::is_string)
    }

    fn row_mut(&mut self, row: usize) -> Result<&mut FlatRecord> {
        let len = self.rows.len();
        self.rows
            .get_mut(row)
            .ok_or(self::Error::RowOutOfBounds { row, len })
    }

    pub fn push_row(&mut self, record: FlatRecord) {
        self.columns.extend(record.keys().cloned());
        self.rows.push(record);
    }

    pub fn remove_row(&mut self, row: usize) -> Result<FlatRecord> {
        self.row_mut(row)?;
        Ok(self.rows.remove(row))
    }

    /// Sets a cell, adding the column when it is new. Returns the previous value.
    pub fn set_cell(&mut self, row: usize, column: &str, value: Value) -> Result<Option<Value>> {
        let previous = self.row_mut(row)?.insert(column.to_string(), value);
        self.columns.insert(column.to_string());
        Ok(previous)
    }

    pub fn clear_cell(&mut self, row: usize, column: &str) -> Result<Option<Value>> {
        self.row_mut(row).map(|record| record.shift_remove(column))
    }

    /// One record per row holding only its present cells, in column order.
    pub fn records(&self) -> impl Iterator<Item = FlatRecord> + '_ {
        self.rows.iter().map(|record| {
            self.columns
                .iter()
                .filter_map(|column| record.get(column).map(|value| (column.clone(), value.clone())))
                .collect()
        })
    }

    pub fn into_records(self) -> Vec<FlatRecord> {
        self.records().collect()
    }
}

pub mod read;
pub mod write;

#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    fn record(value: Value) -> FlatRecord {
        match value {
            Value::Object(map) => map,
            other => panic!("not a record: {other}"),
        }
    }

    fn sample() -> Table {
        Table::from_records([
            record(json!({"_id": "1", "name": "a"})),
            record(json!({"_id": "2", "tags": "[1, 2]"})),
            record(json!({"name": "c", "_id": "3", "meta.ok": true})),
        ])
    }

    #[test]
    fn test_columns_are_union_in_first_seen_order() {
        assert_eq!(sample().columns().collect::<Vec<_>>(), ["_id", "name", "tags", "meta.ok"]);
    }

    #[test]
    fn test_missing_cells_are_empty() {
        let table = sample();
        assert_eq!(table.cell(1, "name"), None);
        assert_eq!(table.cell(1, "tags"), Some(&json!("[1, 2]")));
        assert_eq!(table.cell(7, "name"), None);
    }

    #[test]
    fn test_records_follow_column_order_and_skip_missing_cells() {
        let records = sample().into_records();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].keys().collect::<Vec<_>>(), ["_id", "name", "meta.ok"]);
        assert_eq!(Value::Object(records[1].clone()), json!({"_id": "2", "tags": "[1, 2]"}));
    }

    #[test]
    fn test_edit_rows() -> anyhow::Result<()> {
        let mut table = sample();
        assert_eq!(table.set_cell(0, "name", json!("renamed"))?, Some(json!("a")));
        assert_eq!(table.set_cell(1, "score", json!(9))?, None);
        assert_eq!(table.clear_cell(2, "meta.ok")?, Some(json!(true)));
        table.push_row(record(json!({"extra": null})));
        let removed = table.remove_row(1)?;
        assert_eq!(removed.get("score"), Some(&json!(9)));
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.columns().collect::<Vec<_>>(),
            ["_id", "name", "tags", "meta.ok", "score", "extra"]
        );
        assert_eq!(table.cell(0, "name"), Some(&json!("renamed")));
        assert_eq!(table.cell(2, "extra"), Some(&Value::Null));
        Ok(())
    }

    #[test]
    fn test_text_columns() {
        let mut table = sample();
        table.push_row(record(json!({"_id": null, "meta.ok": "yes", "score": 1})));
        assert!(table.is_text_column("_id"));
        assert!(table.is_text_column("name"));
        assert!(!table.is_text_column("meta.ok"));
        assert!(!table.is_text_column("score"));
        assert!(!table.is_text_column("missing"));
    }

    #[test]
    fn test_out_of_bounds_row() {
        let mut table = sample();
        assert!(matches!(
            table.remove_row(3),
            Err(Error::RowOutOfBounds { row: 3, len: 3 })
        ));
        assert!(table.set_cell(5, "name", json!(1)).is_err());
        assert_eq!(table.len(), 3);
    }
}
