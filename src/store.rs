use {
    crate::flatten_document::Document,
    bson::oid::ObjectId,
    std::convert::Infallible,
    tracing::debug,
};

/// A document together with its store identifier. `body` does not carry the `_id` field.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: ObjectId,
    pub body: Document,
}

impl StoredDocument {
    pub fn new(id: ObjectId, body: Document) -> Self {
        Self { id, body }
    }
}

/// The collection a session edits: read everything once, write everything back at once.
pub trait DocumentStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn find_all(&self) -> Result<Vec<StoredDocument>, Self::Error>;

    /// Drops the current contents and stores `documents` in their place.
    fn replace_all(&mut self, documents: Vec<StoredDocument>) -> Result<(), Self::Error>;
}

/// Insertion ordered collection held in memory. `replace_all` swaps the contents in one step.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Vec<StoredDocument>,
}

impl MemoryStore {
    pub fn new(documents: impl IntoIterator<Item = StoredDocument>) -> Self {
        Self {
            documents: documents.into_iter().collect(),
        }
    }

    pub fn documents(&self) -> &[StoredDocument] {
        &self.documents
    }
}

impl DocumentStore for MemoryStore {
    type Error = Infallible;

    fn find_all(&self) -> Result<Vec<StoredDocument>, Self::Error> {
        Ok(self.documents.clone())
    }

    fn replace_all(&mut self, documents: Vec<StoredDocument>) -> Result<(), Self::Error> {
        debug!(previous = self.documents.len(), next = documents.len(), "replacing collection");
        self.documents = documents;
        Ok(())
    }
}
