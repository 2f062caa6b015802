use {
    super::Table,
    serde_json::Value,
    std::io::Write,
    tap::Pipe,
    tracing::instrument,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Could not convert into inner writer: {0}")]
    IntoInner(Box<str>),
    #[error("Could not write headers")]
    WritingHeaders(#[source] csv::Error),
    #[error("Writing record #{idx}")]
    WritingRecord {
        idx: usize,
        #[source]
        source: csv::Error,
    },
    #[error("Cell '{column}' of record #{idx} holds a nested value:\n{value}")]
    NestedCell { idx: usize, column: String, value: Value },
}

type Result<T> = std::result::Result<T, self::Error>;

/// Text of a single cell. Missing cells and nulls are both written empty.
pub fn render_cell(value: Option<&Value>) -> std::result::Result<String, &Value> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::Bool(bool)) => Ok(bool.to_string()),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(Value::String(v)) => Ok(v.to_string()),
        Some(nested @ (Value::Array(_) | Value::Object(_))) => Err(nested),
    }
}

#[extension_traits::extension(pub trait CsvWriterTableExt)]
impl<W: Write> csv::Writer<W> {
    /// Writes the header line followed by every row. Returns the number of rows written.
    fn write_table(&mut self, table: &Table) -> Result<usize> {
        self.write_record(table.columns()).map_err(self::Error::WritingHeaders)?;
        table.rows().iter().enumerate().try_for_each(|(idx, record)| {
            table
                .columns()
                .map(|column| {
                    render_cell(record.get(column)).map_err(|value| self::Error::NestedCell {
                        idx,
                        column: column.to_string(),
                        value: value.clone(),
                    })
                })
                .collect::<Result<Vec<_>>>()
                .and_then(|row| {
                    self.write_record(&row)
                        .map_err(|source| self::Error::WritingRecord { idx, source })
                })
        })?;
        Ok(table.len())
    }
}

/// Writes `table` as CSV with default settings and hands the writer back.
#[instrument(skip_all, fields(rows = table.len()))]
pub fn write_table_csv<W: Write>(writer: W, table: &Table) -> Result<W> {
    csv::WriterBuilder::new().from_writer(writer).pipe(|mut w| {
        w.write_table(table)?;
        w.into_inner()
            .map_err(|e| self::Error::IntoInner(e.error().to_string().pipe(Box::from)))
    })
}
