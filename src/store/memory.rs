// In-process document store used for dry runs and tests
use crate::config::MongoConfig;
use crate::error::MigrationError;
use crate::store::connection::Connector;
use crate::store::DocumentStore;
use crate::types::ID_FIELD;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Bson, Document};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Collection kept in memory. Clones share the same documents.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    namespace: String,
    documents: Arc<Mutex<Vec<Document>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Make every subsequent operation fail, as if the server went away
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of the stored documents, identifiers included
    pub fn snapshot(&self) -> Vec<Document> {
        match self.documents.lock() {
            Ok(documents) => documents.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn documents(&self, operation: &str) -> Result<MutexGuard<'_, Vec<Document>>, MigrationError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MigrationError::operation(operation, "in-memory store is unavailable"));
        }
        self.documents
            .lock()
            .map_err(|_| MigrationError::operation(operation, "in-memory store lock poisoned"))
    }
}

/// Numbers compare by value across BSON numeric types, as they do on the server
fn values_equal(stored: &Bson, expected: &Bson) -> bool {
    match (stored, expected) {
        (Bson::Int32(a), Bson::Int64(b)) | (Bson::Int64(b), Bson::Int32(a)) => i64::from(*a) == *b,
        (Bson::Double(d), Bson::Int32(i)) | (Bson::Int32(i), Bson::Double(d)) => *d == f64::from(*i),
        (Bson::Double(d), Bson::Int64(i)) | (Bson::Int64(i), Bson::Double(d)) => *d == *i as f64,
        _ => stored == expected,
    }
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, expected)| {
        document
            .get(key)
            .is_some_and(|stored| values_equal(stored, expected))
    })
}

fn has_identifier(documents: &[Document], id: &Bson) -> bool {
    documents.iter().any(|d| d.get(ID_FIELD) == Some(id))
}

fn with_identifier(document: Document) -> (Bson, Document) {
    let id = document
        .get(ID_FIELD)
        .cloned()
        .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));

    let mut stored = Document::new();
    stored.insert(ID_FIELD, id.clone());
    for (key, value) in document {
        if key != ID_FIELD {
            stored.insert(key, value);
        }
    }
    (id, stored)
}

impl DocumentStore for InMemoryStore {
    fn namespace(&self) -> String {
        self.namespace.clone()
    }

    async fn insert_one(&self, document: Document) -> Result<Bson, MigrationError> {
        let mut documents = self.documents("insert_one")?;
        let (id, stored) = with_identifier(document);
        if has_identifier(&documents, &id) {
            return Err(MigrationError::operation("insert_one", format!("duplicate key {}", id)));
        }
        documents.push(stored);
        Ok(id)
    }

    /// Ordered insert: stops at the first duplicate identifier, keeping the documents
    /// inserted before it
    async fn insert_many(&self, new_documents: Vec<Document>) -> Result<usize, MigrationError> {
        let mut documents = self.documents("insert_many")?;
        let mut inserted = 0;
        for document in new_documents {
            let (id, stored) = with_identifier(document);
            if has_identifier(&documents, &id) {
                return Err(MigrationError::operation(
                    "insert_many",
                    format!("duplicate key {} after {} inserted documents", id, inserted),
                ));
            }
            documents.push(stored);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn find(&self, filter: Document, include_id: bool) -> Result<Vec<Document>, MigrationError> {
        let documents = self.documents("find")?;
        Ok(documents
            .iter()
            .filter(|d| matches(d, &filter))
            .cloned()
            .map(|mut d| {
                if !include_id {
                    d.remove(ID_FIELD);
                }
                d
            })
            .collect())
    }

    async fn update_many(&self, filter: Document, fields: Document) -> Result<u64, MigrationError> {
        let mut documents = self.documents("update_many")?;
        let mut modified = 0;
        for document in documents.iter_mut().filter(|d| matches(d, &filter)) {
            let mut changed = false;
            for (key, value) in fields.iter() {
                if document.get(key) != Some(value) {
                    document.insert(key.clone(), value.clone());
                    changed = true;
                }
            }
            if changed {
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn delete_many(&self, filter: Document) -> Result<u64, MigrationError> {
        let mut documents = self.documents("delete_many")?;
        let before = documents.len();
        documents.retain(|d| !matches(d, &filter));
        Ok((before - documents.len()) as u64)
    }

    async fn count(&self, filter: Document) -> Result<u64, MigrationError> {
        let documents = self.documents("count")?;
        Ok(documents.iter().filter(|d| matches(d, &filter)).count() as u64)
    }
}

/// Connector that always hands out the same in-memory collection
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    store: InMemoryStore,
}

impl MemoryConnector {
    pub fn new(store: InMemoryStore) -> Self {
        Self { store }
    }

    /// Connector whose store is named after the configured namespace
    pub fn for_config(config: &MongoConfig) -> Self {
        Self::new(InMemoryStore::new(config.namespace()))
    }

    pub fn store(&self) -> &InMemoryStore {
        &self.store
    }
}

impl Connector for MemoryConnector {
    type Store = InMemoryStore;

    async fn open(&self, _config: &MongoConfig) -> Result<InMemoryStore, MigrationError> {
        Ok(self.store.clone())
    }
}
