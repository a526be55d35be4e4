// Ad-hoc CRUD helpers over the target collection
use crate::error::MigrationError;
use crate::store::DocumentStore;
use mongodb::bson::{Bson, Document};
use tracing::{debug, warn};

/// Thin wrapper naming each store call, so failures report which operation broke
pub struct CrudSession<'a, S> {
    store: &'a S,
}

impl<'a, S: DocumentStore> CrudSession<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub async fn insert_one(&self, document: Document) -> Result<Bson, MigrationError> {
        debug!(namespace = %self.store.namespace(), "insert_one");
        self.store
            .insert_one(document)
            .await
            .map_err(|e| labelled("insert_one", e))
    }

    /// Matching documents without the identifier field
    pub async fn find(&self, filter: Document) -> Result<Vec<Document>, MigrationError> {
        self.store
            .find(filter, false)
            .await
            .map_err(|e| labelled("find", e))
    }

    pub async fn find_one(&self, filter: Document) -> Result<Option<Document>, MigrationError> {
        let documents = self
            .store
            .find(filter, false)
            .await
            .map_err(|e| labelled("find_one", e))?;
        Ok(documents.into_iter().next())
    }

    /// Set `fields` on every matching document, returning how many changed
    pub async fn update(&self, filter: Document, fields: Document) -> Result<u64, MigrationError> {
        self.store
            .update_many(filter, fields)
            .await
            .map_err(|e| labelled("update", e))
    }

    pub async fn delete(&self, filter: Document) -> Result<u64, MigrationError> {
        self.store
            .delete_many(filter)
            .await
            .map_err(|e| labelled("delete", e))
    }

    pub async fn delete_all(&self) -> Result<u64, MigrationError> {
        self.store
            .delete_all()
            .await
            .map_err(|e| labelled("delete_all", e))
    }

    pub async fn count(&self, filter: Document) -> Result<u64, MigrationError> {
        self.store
            .count(filter)
            .await
            .map_err(|e| labelled("count", e))
    }
}

fn labelled(operation: &str, error: MigrationError) -> MigrationError {
    match error {
        MigrationError::Operation { .. } => error,
        other => MigrationError::operation(operation, other.to_string()),
    }
}

/// Opt-in lenient handling for callers that prefer an empty result over an error
pub trait LenientExt<T> {
    /// Log the failure and fall back to the type's default (empty list, zero, `None`)
    fn or_log_default(self, operation: &str) -> T;
}

impl<T: Default> LenientExt<T> for Result<T, MigrationError> {
    fn or_log_default(self, operation: &str) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                warn!(operation = operation, "Operation failed, using empty result: {}", e);
                T::default()
            }
        }
    }
}
