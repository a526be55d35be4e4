use super::*;
use crate::error::MigrationError;
use crate::normalizer::normalize_all;
use crate::store::{DocumentStore, InMemoryStore};
use crate::types::{FieldKind, FieldValue, NormalizedRecord, RawCell, RawRow, ID_FIELD};
use chrono::NaiveDate;
use mongodb::bson::{doc, Bson, Document};

fn patient(nom: &str, age: i64, taille: f64) -> NormalizedRecord {
    vec![
        ("nom", FieldValue::Text(nom.to_string())),
        ("age", FieldValue::Integer(age)),
        ("taille", FieldValue::Decimal(taille)),
        (
            "date_naissance",
            FieldValue::Date(NaiveDate::from_ymd_opt(1995, 1, 15).unwrap()),
        ),
    ]
    .into_iter()
    .collect()
}

fn patients() -> Vec<NormalizedRecord> {
    vec![
        patient("Alice", 28, 1.65),
        patient("Bob", 30, 1.8),
        patient("Carol", 41, 1.72),
    ]
}

#[cfg(test)]
mod bulk_tests {
    use super::*;

    #[tokio::test]
    async fn test_load_inserts_every_record() {
        let store = InMemoryStore::new("healthcareDB.patients");
        let summary = load_records(&store, &patients()).await.unwrap();

        assert_eq!(summary.inserted, 3);
        assert_eq!(summary.deleted, 0);
        assert_eq!(summary.namespace, "healthcareDB.patients");
        assert_eq!(store.count(doc! {}).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_load_replaces_previous_contents() {
        let store = InMemoryStore::new("healthcareDB.patients");
        store
            .insert_many(vec![doc! { "nom": "Stale" }, doc! { "nom": "Older" }])
            .await
            .unwrap();

        let summary = load_records(&store, &patients()).await.unwrap();

        assert_eq!(summary.deleted, 2);
        assert_eq!(store.count(doc! {}).await.unwrap(), 3);
        assert_eq!(store.count(doc! { "nom": "Stale" }).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_load_of_empty_batch_clears_collection() {
        let store = InMemoryStore::new("db.coll");
        store.insert_one(doc! { "nom": "Stale" }).await.unwrap();

        let summary = load_records(&store, &[]).await.unwrap();

        assert_eq!(summary.inserted, 0);
        assert_eq!(store.count(doc! {}).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_load_stores_typed_values() {
        let store = InMemoryStore::new("db.coll");
        load_records(&store, &patients()).await.unwrap();

        let alice = store.find(doc! { "nom": "Alice" }, false).await.unwrap();
        assert_eq!(alice.len(), 1);
        assert_eq!(alice[0].get("age"), Some(&Bson::Int64(28)));
        assert_eq!(alice[0].get("taille"), Some(&Bson::Double(1.65)));
        assert!(matches!(alice[0].get("date_naissance"), Some(Bson::DateTime(_))));
    }

    #[tokio::test]
    async fn test_load_propagates_store_failure() {
        let store = InMemoryStore::new("db.coll");
        store.set_unavailable(true);

        let result = load_records(&store, &patients()).await;
        assert!(matches!(result, Err(MigrationError::Operation { .. })));
    }
}

#[cfg(test)]
mod verifier_tests {
    use super::*;
    use crate::loader::verifier::{check_field_types, count_duplicates, expected_kinds, find_null_fields};

    #[tokio::test]
    async fn test_loaded_collection_has_no_duplicates_or_nulls() {
        let rows = vec![
            RawRow::new()
                .with("nom", RawCell::text(" alice "))
                .with("age", RawCell::text("28"))
                .with("taille", RawCell::text("1.65"))
                .with("date_naissance", RawCell::text("1995-01-15")),
            RawRow::new()
                .with("nom", RawCell::text("bob"))
                .with("age", RawCell::text("30"))
                .with("taille", RawCell::text("1.80"))
                .with("date_naissance", RawCell::text("1990-06-01")),
        ];
        let normalized = normalize_all(&rows);
        let store = InMemoryStore::new("db.coll");
        load_records(&store, &normalized.records).await.unwrap();

        let documents = store.find(doc! {}, false).await.unwrap();
        assert!(documents.iter().all(|d| !d.contains_key(ID_FIELD)));
        assert!(find_null_fields(&documents).is_empty());
        assert_eq!(count_duplicates(&documents), 0);

        let report = verify_collection(&store, &normalized.records).await.unwrap();
        assert!(report.is_valid, "unexpected errors: {:?}", report.errors);
        assert_eq!(report.document_count, 2);
    }

    #[test]
    fn test_duplicates_ignore_field_order_and_identifier() {
        let documents = vec![
            doc! { "_id": 1, "nom": "Alice", "age": 28_i64 },
            doc! { "_id": 2, "age": 28_i64, "nom": "Alice" },
            doc! { "_id": 3, "nom": "Bob", "age": 28_i64 },
        ];
        assert_eq!(count_duplicates(&documents), 1);
    }

    #[test]
    fn test_null_fields_are_reported() {
        let documents = vec![
            doc! { "_id": Bson::Null, "nom": "Alice" },
            doc! { "nom": Bson::Null, "email": Bson::Null },
        ];
        let nulls = find_null_fields(&documents);
        assert_eq!(nulls, vec![(1, "nom".to_string()), (1, "email".to_string())]);

        let report = verify_documents(&documents, &[]);
        assert!(!report.is_valid);
        assert_eq!(report.null_fields, 2);
    }

    #[test]
    fn test_empty_collection_is_invalid() {
        let report = verify_documents(&[], &patients());
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| e.contains("empty")));
        assert_eq!(report.expected_count, 3);
    }

    #[test]
    fn test_type_mismatch_is_reported() {
        let mut documents: Vec<Document> = patients().iter().map(NormalizedRecord::to_document).collect();
        documents[1].insert("age", "thirty");

        let report = verify_documents(&documents, &patients());
        assert!(!report.is_valid);
        assert_eq!(report.type_mismatches, 1);
        assert!(report.errors[0].contains("'age'"));
    }

    #[test]
    fn test_missing_field_is_reported() {
        let mut documents: Vec<Document> = patients().iter().map(NormalizedRecord::to_document).collect();
        documents[0].remove("taille");

        let report = verify_documents(&documents, &patients());
        assert_eq!(report.missing_fields, 1);
        assert!(!report.is_valid);
    }

    #[test]
    fn test_mixed_source_column_only_warns() {
        let records: Vec<NormalizedRecord> = vec![
            vec![("poids", FieldValue::Integer(70))].into_iter().collect(),
            vec![("poids", FieldValue::Decimal(70.5))].into_iter().collect(),
        ];
        let columns = expected_kinds(&records);
        assert!(columns.kinds.is_empty());
        assert_eq!(columns.mixed, vec!["poids".to_string()]);
        assert_eq!(columns.names, vec!["poids".to_string()]);

        let documents: Vec<Document> = records.iter().map(NormalizedRecord::to_document).collect();
        let report = verify_documents(&documents, &records);
        assert!(report.is_valid);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_mixed_column_absent_from_document_is_reported() {
        let records: Vec<NormalizedRecord> = vec![
            vec![
                ("nom", FieldValue::Text("A".to_string())),
                ("poids", FieldValue::Integer(70)),
            ]
            .into_iter()
            .collect(),
            vec![
                ("nom", FieldValue::Text("B".to_string())),
                ("poids", FieldValue::Decimal(70.5)),
            ]
            .into_iter()
            .collect(),
        ];
        let mut documents: Vec<Document> = records.iter().map(NormalizedRecord::to_document).collect();
        documents[1].remove("poids");

        let report = verify_documents(&documents, &records);
        assert!(!report.is_valid);
        assert_eq!(report.missing_fields, 1);
        assert!(report.errors.iter().any(|e| e.contains("'poids'")));
    }

    #[test]
    fn test_all_null_column_is_still_required() {
        let records: Vec<NormalizedRecord> = vec![
            vec![("nom", FieldValue::Text("A".to_string())), ("email", FieldValue::Null)]
                .into_iter()
                .collect(),
        ];
        let columns = expected_kinds(&records);
        assert_eq!(columns.names, vec!["nom", "email"]);
        assert_eq!(columns.kinds, vec![("nom".to_string(), FieldKind::Text)]);

        let (missing, mismatches) = check_field_types(&[doc! { "nom": "A" }], &columns);
        assert_eq!(missing, vec!["document 0 has no field 'email'".to_string()]);
        assert!(mismatches.is_empty());
    }

    #[test]
    fn test_expected_kinds_follow_column_order() {
        let columns = expected_kinds(&patients());
        assert!(columns.mixed.is_empty());
        assert_eq!(columns.names, vec!["nom", "age", "taille", "date_naissance"]);
        assert_eq!(
            columns.kinds,
            vec![
                ("nom".to_string(), FieldKind::Text),
                ("age".to_string(), FieldKind::Integer),
                ("taille".to_string(), FieldKind::Decimal),
                ("date_naissance".to_string(), FieldKind::Date),
            ]
        );
    }

    #[test]
    fn test_issue_listing_is_capped() {
        let documents: Vec<Document> = (0..30).map(|_| doc! { "nom": Bson::Null }).collect();
        let report = verify_documents(&documents, &[]);

        assert_eq!(report.null_fields, 30);
        assert!(report.errors.iter().any(|e| e == "... and 10 more"));
    }
}

#[cfg(test)]
mod crud_tests {
    use super::*;

    #[tokio::test]
    async fn test_crud_round() {
        let store = InMemoryStore::new("db.coll");
        let session = CrudSession::new(&store);

        session
            .insert_one(doc! { "nom": "Alice", "age": 28_i64 })
            .await
            .unwrap();
        session
            .insert_one(doc! { "nom": "Bob", "age": 30_i64 })
            .await
            .unwrap();

        let alice = session.find_one(doc! { "nom": "Alice" }).await.unwrap();
        assert_eq!(alice, Some(doc! { "nom": "Alice", "age": 28_i64 }));

        assert_eq!(session.update(doc! { "nom": "Alice" }, doc! { "age": 29_i64 }).await.unwrap(), 1);
        assert_eq!(session.count(doc! { "age": 29_i64 }).await.unwrap(), 1);

        assert_eq!(session.delete(doc! { "nom": "Bob" }).await.unwrap(), 1);
        assert_eq!(session.find(doc! {}).await.unwrap().len(), 1);
        assert_eq!(session.delete_all().await.unwrap(), 1);
        assert!(session.find_one(doc! {}).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failures_are_labelled_with_operation() {
        let store = InMemoryStore::new("db.coll");
        store.set_unavailable(true);
        let session = CrudSession::new(&store);

        match session.count(doc! {}).await {
            Err(MigrationError::Operation { operation, .. }) => assert_eq!(operation, "count"),
            other => panic!("expected operation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_lenient_callers_get_empty_results() {
        let store = InMemoryStore::new("db.coll");
        store.insert_one(doc! { "nom": "Alice" }).await.unwrap();
        store.set_unavailable(true);
        let session = CrudSession::new(&store);

        let found = session.find(doc! {}).await.or_log_default("find");
        let count = session.count(doc! {}).await.or_log_default("count");
        let one = session.find_one(doc! {}).await.or_log_default("find_one");

        assert!(found.is_empty());
        assert_eq!(count, 0);
        assert!(one.is_none());
    }
}
