// Destination store: document store seam, backends and connection handling
pub mod connection;
pub mod memory;
pub mod mongo;
pub mod retry;


pub use connection::{ConnectionManager, Connector};
pub use memory::{InMemoryStore, MemoryConnector};
pub use mongo::{MongoConnector, MongoStore};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};

use crate::error::MigrationError;
use mongodb::bson::{Bson, Document};

/// Operations the migration needs from a document-oriented collection.
///
/// Filters are equality matches on top-level fields, numbers comparing by value
/// across integer and double types; an empty filter matches every document.
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    /// `database.collection` of the target collection
    fn namespace(&self) -> String;

    async fn insert_one(&self, document: Document) -> Result<Bson, MigrationError>;

    /// Insert all documents, returning how many were inserted
    async fn insert_many(&self, documents: Vec<Document>) -> Result<usize, MigrationError>;

    /// Documents matching `filter`, with or without the identifier field
    async fn find(&self, filter: Document, include_id: bool) -> Result<Vec<Document>, MigrationError>;

    /// Overwrite `fields` on every matching document, returning the modified count
    async fn update_many(&self, filter: Document, fields: Document) -> Result<u64, MigrationError>;

    async fn delete_many(&self, filter: Document) -> Result<u64, MigrationError>;

    async fn count(&self, filter: Document) -> Result<u64, MigrationError>;

    async fn delete_all(&self) -> Result<u64, MigrationError> {
        self.delete_many(Document::new()).await
    }
}
