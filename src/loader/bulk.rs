use crate::error::MigrationError;
use crate::store::DocumentStore;
use crate::types::NormalizedRecord;
use mongodb::bson::Document;
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of a full-refresh load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub namespace: String,
    /// Documents removed before inserting
    pub deleted: u64,
    pub inserted: usize,
}

/// Replace the whole collection with `records`: delete every document, then bulk-insert.
///
/// Not atomic. A failure between the two steps leaves the collection partially
/// replaced. Errors propagate to the caller.
pub async fn load_records<S: DocumentStore>(
    store: &S,
    records: &[NormalizedRecord],
) -> Result<LoadSummary, MigrationError> {
    let namespace = store.namespace();

    let deleted = store.delete_all().await?;
    if deleted > 0 {
        warn!(namespace = %namespace, deleted = deleted, "Cleared existing documents before load");
    }

    let documents: Vec<Document> = records.iter().map(NormalizedRecord::to_document).collect();
    let inserted = store.insert_many(documents).await?;

    if inserted != records.len() {
        return Err(MigrationError::operation(
            "insert_many",
            format!("expected {} inserted documents, store reported {}", records.len(), inserted),
        ));
    }

    info!(namespace = %namespace, inserted = inserted, "Import finished: {} documents inserted", inserted);

    Ok(LoadSummary {
        namespace,
        deleted,
        inserted,
    })
}
