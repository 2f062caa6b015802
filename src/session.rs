//! One editing pass over a collection: read everything, flatten it into a [`Table`], let the
//! caller edit the table, then rebuild the documents and replace the collection with them.
//!
//! Every row is unflattened and its identifier checked before the store is touched, so an
//! invalid identifier leaves the collection as it was instead of half written.

use {
    crate::{
        flatten_document::{DEFAULT_SEP, Document, FlatRecord, flatten::flattened_with, unflatten::unflattened_with},
        grid::{Table, read::read_table_csv_onto, write::write_table_csv},
        store::{DocumentStore, StoredDocument},
    },
    bson::oid::ObjectId,
    serde_json::Value,
    tap::{Pipe, Tap},
    tracing::{info, instrument, warn},
};

/// Field holding the document identifier, rendered as a 24 character hex string in the table.
pub const ID_FIELD: &str = "_id";

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Reading documents from the store")]
    Reading(#[source] BoxedError),
    #[error("Replacing the collection contents")]
    Writing(#[source] BoxedError),
    #[error("Row {row}: '{value}' is not a valid identifier")]
    InvalidIdentifier {
        row: usize,
        value: String,
        #[source]
        source: bson::oid::Error,
    },
    #[error("Row {row}: identifier must be a string, found {found}")]
    IdentifierType { row: usize, found: Value },
    #[error("Reading the edited table")]
    ReadingCsv(#[source] crate::grid::read::Error),
    #[error("Writing the table")]
    WritingCsv(#[source] crate::grid::write::Error),
}

type Result<T> = std::result::Result<T, self::Error>;

/// The flat row for a stored document: `_id` comes first as a hex string, replacing any `_id`
/// already present in the body.
pub fn editable_record(document: StoredDocument, sep: &str) -> FlatRecord {
    let StoredDocument { id, body } = document;
    Document::new()
        .tap_mut(|doc| {
            doc.insert(ID_FIELD.to_string(), Value::Null);
            doc.extend(body);
            doc.insert(ID_FIELD.to_string(), Value::String(id.to_hex()));
        })
        .pipe(|doc| flattened_with(doc, "", sep))
}

/// Converts the `_id` cell of row `row` back to an identifier. An absent, null or empty cell is
/// a row added during editing and gets a fresh identifier.
pub fn parse_identifier(row: usize, value: Option<Value>) -> Result<ObjectId> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.is_empty() => None,
        Some(Value::String(text)) => ObjectId::parse_str(&text)
            .map_err(|source| self::Error::InvalidIdentifier { row, value: text, source })?
            .pipe(Some),
        Some(found) => return Err(self::Error::IdentifierType { row, found }),
    }
    .unwrap_or_else(|| ObjectId::new().tap(|id| warn!(row, %id, "row without identifier, generated one")))
    .pipe(Ok)
}

pub struct Session<S> {
    store: S,
    table: Table,
    sep: String,
}

impl<S: DocumentStore> Session<S> {
    pub fn open(store: S) -> Result<Self> {
        Self::open_with(store, DEFAULT_SEP)
    }

    /// Reads the whole collection and lays it out as a table, joining nested fields with `sep`.
    #[instrument(skip(store))]
    pub fn open_with(store: S, sep: &str) -> Result<Self> {
        let documents = store
            .find_all()
            .map_err(|e| self::Error::Reading(Box::new(e)))?;
        info!(documents = documents.len(), "opened session");
        Ok(Self {
            table: tabulate(documents, sep),
            store,
            sep: sep.to_string(),
        })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut Table {
        &mut self.table
    }

    /// Writes the table as CSV for editing outside the session.
    pub fn write_csv<W: std::io::Write>(&self, writer: W) -> Result<W> {
        write_table_csv(writer, &self.table).map_err(self::Error::WritingCsv)
    }

    /// Replaces the table with an edited CSV written by [`Session::write_csv`]. Cells left as
    /// they were keep their type, so a stored `"10001"` stays a string.
    pub fn read_csv<R: std::io::Read>(&mut self, reader: R) -> Result<()> {
        self.table = read_table_csv_onto(reader, &self.table).map_err(self::Error::ReadingCsv)?;
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Rebuilds every row into a document ready to be written, without touching the store.
    pub fn stage(&self) -> Result<Vec<StoredDocument>> {
        self.table
            .records()
            .enumerate()
            .map(|(row, record)| {
                let mut body = unflattened_with(record, &self.sep);
                parse_identifier(row, body.shift_remove(ID_FIELD)).map(|id| StoredDocument::new(id, body))
            })
            .collect()
    }

    /// Replaces the collection with the edited table. Returns the number of documents written.
    /// The table is rebuilt from what was written, so generated identifiers show up in it.
    #[instrument(skip(self), fields(rows = self.table.len()))]
    pub fn save(&mut self) -> Result<usize> {
        let staged = self.stage()?;
        let written = staged.len();
        let table = tabulate(staged.iter().cloned(), &self.sep);
        self.store
            .replace_all(staged)
            .map_err(|e| self::Error::Writing(Box::new(e)))?;
        self.table = table;
        info!(written, "saved changes");
        Ok(written)
    }
}

fn tabulate(documents: impl IntoIterator<Item = StoredDocument>, sep: &str) -> Table {
    documents
        .into_iter()
        .map(|document| editable_record(document, sep))
        .pipe(Table::from_records)
}
