// Post-load invariant checks
use crate::error::MigrationError;
use crate::store::DocumentStore;
use crate::types::{FieldKind, NormalizedRecord, ID_FIELD};
use mongodb::bson::Document;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Maximum number of individual problems spelled out per check
pub const MAX_REPORTED_ISSUES: usize = 20;

/// Result of verifying a loaded collection
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerificationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub document_count: usize,
    pub expected_count: usize,
    /// Null fields found outside the identifier
    pub null_fields: usize,
    /// Documents that repeat an earlier document field for field
    pub duplicate_documents: usize,
    /// Source columns absent from a stored document
    pub missing_fields: usize,
    /// Stored values whose kind differs from the source column's kind
    pub type_mismatches: usize,
}

/// Fields holding null, as `(document index, field name)`, identifier excluded
pub fn find_null_fields(documents: &[Document]) -> Vec<(usize, String)> {
    documents
        .iter()
        .enumerate()
        .flat_map(|(index, document)| {
            document
                .iter()
                .filter(|(key, value)| key.as_str() != ID_FIELD && FieldKind::of_bson(value) == Some(FieldKind::Null))
                .map(move |(key, _)| (index, key.clone()))
        })
        .collect()
}

/// Order-independent fingerprint of a document, identifier excluded
fn fingerprint(document: &Document) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = document
        .iter()
        .filter(|(key, _)| key.as_str() != ID_FIELD)
        .map(|(key, value)| (key.clone(), format!("{:?}", value)))
        .collect();
    fields.sort();
    fields
}

/// Number of documents equal, field for field, to an earlier one
pub fn count_duplicates(documents: &[Document]) -> usize {
    let mut seen = HashSet::with_capacity(documents.len());
    documents
        .iter()
        .filter(|document| !seen.insert(fingerprint(document)))
        .count()
}

/// Shape of the source columns, derived from the normalized records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceColumns {
    /// Every source column, in first-seen order
    pub names: Vec<String>,
    /// Columns whose non-null values all share a single kind
    pub kinds: Vec<(String, FieldKind)>,
    /// Columns holding more than one kind; per-cell inference allows them
    pub mixed: Vec<String>,
}

/// Collect every source column and the kind of those whose non-null values agree.
/// Columns that are entirely null are listed in `names` only.
pub fn expected_kinds(records: &[NormalizedRecord]) -> SourceColumns {
    let mut names: Vec<String> = Vec::new();
    let mut seen: HashMap<String, HashSet<FieldKind>> = HashMap::new();

    for record in records {
        for (name, value) in record.fields() {
            let entry = seen.entry(name.to_string()).or_insert_with(|| {
                names.push(name.to_string());
                HashSet::new()
            });
            if !value.is_null() {
                entry.insert(value.kind());
            }
        }
    }

    let mut kinds = Vec::new();
    let mut mixed = Vec::new();
    for name in &names {
        let column_kinds = &seen[name];
        match column_kinds.len() {
            0 => {}
            1 => {
                if let Some(kind) = column_kinds.iter().next() {
                    kinds.push((name.clone(), *kind));
                }
            }
            _ => mixed.push(name.clone()),
        }
    }

    SourceColumns { names, kinds, mixed }
}

/// Check every document carries every source column, and that columns with a
/// consistent kind keep it. Returns `(missing fields, mismatch descriptions)`.
pub fn check_field_types(documents: &[Document], columns: &SourceColumns) -> (Vec<String>, Vec<String>) {
    let mut missing = Vec::new();
    let mut mismatches = Vec::new();

    for (index, document) in documents.iter().enumerate() {
        for column in &columns.names {
            if !document.contains_key(column) {
                missing.push(format!("document {} has no field '{}'", index, column));
            }
        }

        for (column, kind) in &columns.kinds {
            let Some(value) = document.get(column) else {
                continue;
            };
            let actual = FieldKind::of_bson(value);
            if actual != Some(*kind) {
                let actual = actual.map(|k| k.to_string()).unwrap_or_else(|| format!("{:?}", value.element_type()));
                mismatches.push(format!(
                    "document {} field '{}' is {}, expected {}",
                    index, column, actual, kind
                ));
            }
        }
    }

    (missing, mismatches)
}

fn push_limited(target: &mut Vec<String>, issues: &[String]) {
    target.extend(issues.iter().take(MAX_REPORTED_ISSUES).cloned());
    if issues.len() > MAX_REPORTED_ISSUES {
        target.push(format!("... and {} more", issues.len() - MAX_REPORTED_ISSUES));
    }
}

/// Verify documents read back from the store against the records that were loaded
pub fn verify_documents(documents: &[Document], expected: &[NormalizedRecord]) -> VerificationReport {
    let mut report = VerificationReport {
        document_count: documents.len(),
        expected_count: expected.len(),
        ..VerificationReport::default()
    };

    if documents.is_empty() && !expected.is_empty() {
        report.errors.push("collection is empty".to_string());
    }

    if documents.len() != expected.len() {
        report.errors.push(format!(
            "collection holds {} documents, expected {}",
            documents.len(),
            expected.len()
        ));
    }

    let nulls = find_null_fields(documents);
    report.null_fields = nulls.len();
    let null_issues: Vec<String> = nulls
        .iter()
        .map(|(index, field)| format!("document {} has null field '{}'", index, field))
        .collect();
    push_limited(&mut report.errors, &null_issues);

    report.duplicate_documents = count_duplicates(documents);
    if report.duplicate_documents > 0 {
        report
            .errors
            .push(format!("{} duplicate documents found", report.duplicate_documents));
    }

    let columns = expected_kinds(expected);
    for column in &columns.mixed {
        report
            .warnings
            .push(format!("column '{}' has mixed value kinds in the source, type check skipped", column));
    }

    let (missing, mismatches) = check_field_types(documents, &columns);
    report.missing_fields = missing.len();
    report.type_mismatches = mismatches.len();
    push_limited(&mut report.errors, &missing);
    push_limited(&mut report.errors, &mismatches);

    report.is_valid = report.errors.is_empty();
    report
}

/// Read the whole collection (identifier excluded) and verify it
pub async fn verify_collection<S: DocumentStore>(
    store: &S,
    expected: &[NormalizedRecord],
) -> Result<VerificationReport, MigrationError> {
    let documents = store.find(Document::new(), false).await?;
    let report = verify_documents(&documents, expected);

    if report.is_valid {
        info!(
            namespace = %store.namespace(),
            documents = report.document_count,
            "Verification passed"
        );
    } else {
        warn!(
            namespace = %store.namespace(),
            errors = report.errors.len(),
            "Verification failed"
        );
        for error in &report.errors {
            warn!("  - {}", error);
        }
    }

    Ok(report)
}
