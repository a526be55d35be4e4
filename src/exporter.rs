// Collection export to a delimited flat file
use crate::error::MigrationError;
use crate::store::DocumentStore;
use crate::types::{format_decimal, ID_FIELD};
use chrono::{DateTime, NaiveTime, SecondsFormat, Utc};
use mongodb::bson::{Bson, Document};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// What an export wrote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub documents: usize,
    pub columns: Vec<String>,
}

/// Read every document (identifier excluded) and write them to `path`, one row each.
///
/// Parent directories are created as needed and an existing file is overwritten.
pub async fn export_collection<S: DocumentStore>(
    store: &S,
    path: impl AsRef<Path>,
) -> Result<ExportSummary, MigrationError> {
    let path = path.as_ref();
    let documents = store.find(Document::new(), false).await?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let columns = write_documents(&documents, file)?;

    info!(
        namespace = %store.namespace(),
        documents = documents.len(),
        "Exported collection to {:?}", path
    );

    Ok(ExportSummary {
        path: path.to_path_buf(),
        documents: documents.len(),
        columns,
    })
}

/// Header for a set of documents: union of their fields in first-seen order
pub fn export_columns(documents: &[Document]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for document in documents {
        for key in document.keys() {
            if key != ID_FIELD && !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

/// Write documents as comma separated rows with a header line. Fields absent
/// from a document are written empty. Returns the header.
pub fn write_documents<W: Write>(documents: &[Document], writer: W) -> Result<Vec<String>, MigrationError> {
    let columns = export_columns(documents);
    let mut csv_writer = csv::Writer::from_writer(writer);

    if !columns.is_empty() {
        csv_writer.write_record(&columns)?;
    }

    for document in documents {
        let row: Vec<String> = columns
            .iter()
            .map(|column| document.get(column).map(bson_to_text).unwrap_or_default())
            .collect();
        csv_writer.write_record(&row)?;
    }

    csv_writer.flush()?;
    Ok(columns)
}

/// Text form of a stored value, chosen so re-reading the file infers the same kind
pub fn bson_to_text(value: &Bson) -> String {
    match value {
        Bson::Null => String::new(),
        Bson::String(s) => s.clone(),
        Bson::Int32(i) => i.to_string(),
        Bson::Int64(i) => i.to_string(),
        Bson::Double(d) => format_decimal(*d),
        Bson::Boolean(b) => b.to_string(),
        Bson::DateTime(dt) => {
            match DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis()) {
                Some(utc) if utc.time() == NaiveTime::MIN => utc.format("%Y-%m-%d").to_string(),
                Some(utc) => utc.to_rfc3339_opts(SecondsFormat::Millis, true),
                None => dt.to_string(),
            }
        }
        Bson::ObjectId(oid) => oid.to_hex(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use crate::types::FieldValue;
    use chrono::NaiveDate;
    use mongodb::bson::doc;
    use tempfile::TempDir;

    #[test]
    fn test_bson_to_text() {
        let date = FieldValue::Date(NaiveDate::from_ymd_opt(1995, 1, 15).unwrap()).to_bson();
        assert_eq!(bson_to_text(&date), "1995-01-15");
        assert_eq!(bson_to_text(&Bson::Double(30.0)), "30.0");
        assert_eq!(bson_to_text(&Bson::Double(1.65)), "1.65");
        assert_eq!(bson_to_text(&Bson::Int64(28)), "28");
        assert_eq!(bson_to_text(&Bson::Null), "");
        assert_eq!(bson_to_text(&Bson::String("Alice".into())), "Alice");
    }

    #[test]
    fn test_columns_are_union_in_first_seen_order() {
        let documents = vec![
            doc! { "_id": 1, "nom": "Alice", "age": 28_i64 },
            doc! { "nom": "Bob", "email": "bob@example.org" },
        ];
        assert_eq!(export_columns(&documents), vec!["nom", "age", "email"]);

        let mut buffer = Vec::new();
        write_documents(&documents, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "nom,age,email\nAlice,28,\nBob,,bob@example.org\n");
    }

    #[test]
    fn test_no_documents_writes_empty_file() {
        let mut buffer = Vec::new();
        let columns = write_documents(&[], &mut buffer).unwrap();
        assert!(columns.is_empty());
        assert!(buffer.is_empty());
    }

    #[tokio::test]
    async fn test_export_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("export_patients.csv");

        let store = InMemoryStore::new("db.coll");
        store
            .insert_many(vec![doc! { "nom": "Alice", "taille": 1.65 }])
            .await
            .unwrap();

        let summary = export_collection(&store, &path).await.unwrap();

        assert_eq!(summary.documents, 1);
        assert_eq!(summary.columns, vec!["nom", "taille"]);
        let contents = fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "nom,taille\nAlice,1.65\n");
    }
}
