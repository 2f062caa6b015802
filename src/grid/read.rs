use {
    super::{Table, write::render_cell},
    crate::flatten_document::FlatRecord,
    csv::StringRecord,
    serde_json::Value,
    std::io::Read,
    tap::{Pipe, Tap},
    tracing::{debug, instrument},
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Headers-parsing reader is required")]
    NoHeaders,
    #[error("Reading headers")]
    ReadingHeaders(#[source] csv::Error),
    #[error("Reading a single record")]
    ReadingRecord(#[source] csv::Error),
    #[error("Missing field '{field}' (idx: {idx}) for record number {record}")]
    MissingField {
        idx: usize,
        field: String,
        record: usize,
    },
    #[error("Record number {record} has {extra} more field(s) than the header")]
    ExtraFields { record: usize, extra: usize },
}

type Result<T> = std::result::Result<T, self::Error>;

/// Types a cell read from text. Empty text is a missing cell. Text parsing as a JSON bool,
/// number or null keeps that type only when it renders back to the very same text, so
/// `"00123"` or `"1e3"` stay strings.
pub fn guess_cell(text: &str) -> Option<Value> {
    match text {
        "" => None,
        text => serde_json::from_str::<Value>(text)
            .ok()
            .filter(|value| matches!(value, Value::Null | Value::Bool(_) | Value::Number(_)))
            .filter(|value| value.to_string() == text)
            .unwrap_or_else(|| Value::String(text.to_string()))
            .pipe(Some),
    }
}

/// Types a cell against the table the CSV was written from. A cell whose text is exactly what
/// `template` held at that row and column keeps the template value, type included. Any other
/// cell is a string in a column that only held strings there, and guessed elsewhere.
pub fn typed_cell(template: &Table, row: usize, column: &str, text: &str) -> Option<Value> {
    template
        .cell(row, column)
        .filter(|value| render_cell(Some(*value)).is_ok_and(|rendered| rendered == text))
        .cloned()
        .or_else(|| match text {
            "" => None,
            text if template.is_text_column(column) => Some(Value::String(text.to_string())),
            text => guess_cell(text),
        })
}

fn typed_record(template: &Table, headers: &StringRecord, rec: &StringRecord, record: usize) -> Result<FlatRecord> {
    if rec.len() > headers.len() {
        return Err(self::Error::ExtraFields {
            record,
            extra: rec.len() - headers.len(),
        });
    }
    headers
        .iter()
        .enumerate()
        .filter_map(|(idx, header)| {
            rec.get(idx)
                .ok_or_else(|| self::Error::MissingField {
                    idx,
                    field: header.to_string(),
                    record,
                })
                .map(|text| typed_cell(template, record, header, text).map(|value| (header.to_string(), value)))
                .transpose()
        })
        .collect()
}

#[extension_traits::extension(pub trait CsvReaderTableExt)]
impl<R: Read> csv::Reader<R> {
    /// Reads every remaining record into a table whose columns are the header fields, typing
    /// cells by guessing from their text.
    fn read_table(&mut self) -> Result<Table> {
        self.read_table_onto(&Table::default())
    }

    /// Like `read_table`, typing cells against `template`, the table this CSV was written from.
    fn read_table_onto(&mut self, template: &Table) -> Result<Table> {
        if !self.has_headers() {
            return Err(self::Error::NoHeaders);
        }
        let headers = self.headers().map_err(self::Error::ReadingHeaders)?.clone();
        let mut table = Table::with_columns(headers.iter().map(str::to_string));
        let mut rec = StringRecord::new();
        while self.read_record(&mut rec).map_err(self::Error::ReadingRecord)? {
            typed_record(template, &headers, &rec, table.len()).map(|record| table.push_row(record))?;
        }
        Ok(table.tap(|table| debug!(rows = table.len(), columns = table.columns().len(), "read table")))
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader)
}

/// Reads a CSV table with default settings, tolerating rows of unequal length so they can be
/// reported by record number.
#[instrument(skip_all)]
pub fn read_table_csv<R: Read>(reader: R) -> Result<Table> {
    csv_reader(reader).read_table()
}

/// Reads a CSV table written from `template`, keeping the cell types `template` had.
#[instrument(skip_all, fields(template_rows = template.len()))]
pub fn read_table_csv_onto<R: Read>(reader: R, template: &Table) -> Result<Table> {
    csv_reader(reader).read_table_onto(template)
}
