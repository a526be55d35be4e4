use crate::dataset_loader::reader::RawTable;
use crate::error::MigrationError;
use crate::types::RawCell;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Counts reported by the cleaning step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    /// Data rows read from the file
    pub input_rows: usize,
    /// Exact duplicate rows removed (first occurrence kept)
    pub duplicates_removed: usize,
    /// Rows dropped because they contained at least one missing value
    pub rows_with_missing_dropped: usize,
    /// Missing cells seen across the dropped rows
    pub missing_cells: usize,
    /// Rows handed on to normalization
    pub output_rows: usize,
}

/// Remove exact duplicate rows, keeping the first occurrence of each
pub fn remove_duplicates(rows: Vec<Vec<RawCell>>) -> (Vec<Vec<RawCell>>, usize) {
    let mut seen: HashSet<Vec<RawCell>> = HashSet::with_capacity(rows.len());
    let mut kept = Vec::with_capacity(rows.len());
    let mut removed = 0;

    for row in rows {
        if seen.contains(&row) {
            removed += 1;
            continue;
        }
        seen.insert(row.clone());
        kept.push(row);
    }

    (kept, removed)
}

/// Drop every row containing a missing value.
///
/// Returns the kept rows, the number of dropped rows and the number of missing cells.
pub fn drop_missing(rows: Vec<Vec<RawCell>>) -> (Vec<Vec<RawCell>>, usize, usize) {
    let mut dropped = 0;
    let mut missing_cells = 0;

    let kept = rows
        .into_iter()
        .filter(|row| {
            let missing = row.iter().filter(|cell| cell.is_missing()).count();
            if missing > 0 {
                dropped += 1;
                missing_cells += missing;
                false
            } else {
                true
            }
        })
        .collect();

    (kept, dropped, missing_cells)
}

/// Fail if any cell is empty once whitespace is removed
pub fn ensure_no_blank_fields(headers: &[String], rows: &[Vec<RawCell>]) -> Result<(), MigrationError> {
    let mut blank_rows = rows
        .iter()
        .enumerate()
        .filter_map(|(index, row)| row.iter().position(RawCell::is_blank).map(|col| (index, col)));

    if let Some((row_index, col_index)) = blank_rows.next() {
        let column = headers.get(col_index).map(String::as_str).unwrap_or("?");
        let others = blank_rows.count();
        return Err(MigrationError::malformed_input(format!(
            "empty field in column '{}' of cleaned row {} ({} more row(s) affected)",
            column,
            row_index + 1,
            others
        )));
    }

    Ok(())
}

/// Replace whitespace inside a column name with underscores
pub fn normalize_column_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Normalize every column name, suffixing repeats with `.1`, `.2`, ... so keys stay unique
pub fn normalize_column_names(headers: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(headers.len());
    let mut names = Vec::with_capacity(headers.len());

    for header in headers {
        let base = normalize_column_name(header);
        let mut candidate = base.clone();
        let mut counter = 1;
        while seen.contains(&candidate) {
            candidate = format!("{}.{}", base, counter);
            counter += 1;
        }
        if candidate != base {
            debug!(column = %header, renamed = %candidate, "Renamed duplicate column");
        }
        seen.insert(candidate.clone());
        names.push(candidate);
    }

    names
}

/// Deduplicate, drop rows with missing values, reject blank fields and normalize column names
pub fn clean_table(table: RawTable) -> Result<(Vec<String>, Vec<Vec<RawCell>>, CleaningReport), MigrationError> {
    let input_rows = table.rows.len();

    let (rows, duplicates_removed) = remove_duplicates(table.rows);
    if duplicates_removed > 0 {
        warn!(duplicates = duplicates_removed, "Duplicate rows found and removed");
    }

    let (rows, rows_with_missing_dropped, missing_cells) = drop_missing(rows);
    if rows_with_missing_dropped > 0 {
        warn!(
            rows = rows_with_missing_dropped,
            missing_cells = missing_cells,
            "Rows with missing values found and removed"
        );
    }

    ensure_no_blank_fields(&table.headers, &rows)?;

    let columns = normalize_column_names(&table.headers);
    let report = CleaningReport {
        input_rows,
        duplicates_removed,
        rows_with_missing_dropped,
        missing_cells,
        output_rows: rows.len(),
    };

    Ok((columns, rows, report))
}
