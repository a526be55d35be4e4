use super::*;
use crate::types::RawCell;
use std::io::Write;
use tempfile::NamedTempFile;

fn load_str(content: &str) -> Result<LoadedDataset, MigrationError> {
    DatasetLoader::new().load_from_reader(content.as_bytes())
}

#[cfg(test)]
mod reader_tests {
    use super::*;

    #[test]
    fn test_read_table_keeps_cells_verbatim() {
        let table = reader::read_table("nom,age\n alice ,28\n".as_bytes(), b',').unwrap();

        assert_eq!(table.headers, vec!["nom", "age"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][0], RawCell::text(" alice "));
        assert_eq!(table.rows[0][1], RawCell::text("28"));
    }

    #[test]
    fn test_short_rows_are_padded_with_missing() {
        let table = reader::read_table("a,b,c\n1,2\n".as_bytes(), b',').unwrap();
        assert_eq!(table.rows[0][2], RawCell::Missing);
    }

    #[test]
    fn test_long_rows_are_rejected() {
        let result = reader::read_table("a,b\n1,2,3\n".as_bytes(), b',');
        assert!(matches!(result, Err(MigrationError::MalformedInput { .. })));
    }

    #[test]
    fn test_custom_delimiter() {
        let table = reader::read_table("a;b\n1;x y\n".as_bytes(), b';').unwrap();
        assert_eq!(table.rows[0][1], RawCell::text("x y"));
    }
}

#[cfg(test)]
mod cleaner_tests {
    use super::*;
    use crate::dataset_loader::cleaner::*;

    fn row(cells: &[&str]) -> Vec<RawCell> {
        cells.iter().map(|c| RawCell::from_field(c)).collect()
    }

    #[test]
    fn test_remove_duplicates_keeps_first_occurrence() {
        let rows = vec![row(&["1", "x"]), row(&["2", "y"]), row(&["1", "x"])];
        let (kept, removed) = remove_duplicates(rows);

        assert_eq!(removed, 1);
        assert_eq!(kept, vec![row(&["1", "x"]), row(&["2", "y"])]);
    }

    #[test]
    fn test_duplicates_with_missing_values_are_equal() {
        let rows = vec![row(&["NaN", "x"]), row(&["NaN", "x"])];
        let (kept, removed) = remove_duplicates(rows);
        assert_eq!(kept.len(), 1);
        assert_eq!(removed, 1);
    }

    #[test]
    fn test_drop_missing_counts_rows_and_cells() {
        let rows = vec![row(&["1", "x"]), row(&["NA", "null"]), row(&["3", "None"])];
        let (kept, dropped, cells) = drop_missing(rows);

        assert_eq!(kept, vec![row(&["1", "x"])]);
        assert_eq!(dropped, 2);
        assert_eq!(cells, 3);
    }

    #[test]
    fn test_blank_field_is_rejected() {
        let headers = vec!["A".to_string(), "B".to_string()];
        let rows = vec![row(&["1", "x"]), row(&["", "y"])];

        match ensure_no_blank_fields(&headers, &rows) {
            Err(MigrationError::MalformedInput { message }) => assert!(message.contains("'A'")),
            other => panic!("expected malformed input, got {:?}", other),
        }
    }

    #[test]
    fn test_whitespace_only_field_is_rejected() {
        let headers = vec!["A".to_string()];
        assert!(ensure_no_blank_fields(&headers, &[row(&["   "])]).is_err());
    }

    #[test]
    fn test_normalize_column_names() {
        let headers: Vec<String> = vec!["Blood Type", " Date of Admission ", "Name", "Name", "Blood_Type"]
            .into_iter()
            .map(String::from)
            .collect();

        assert_eq!(
            normalize_column_names(&headers),
            vec!["Blood_Type", "Date_of_Admission", "Name", "Name.1", "Blood_Type.1"]
        );
    }
}

#[test]
fn test_one_duplicate_among_three_rows() {
    let dataset = load_str("nom,age\nalice,28\nbob,30\nalice,28\n").unwrap();

    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.report.input_rows, 3);
    assert_eq!(dataset.report.duplicates_removed, 1);
    assert_eq!(dataset.report.output_rows, 2);
}

#[test]
fn test_duplicates_and_missing_rows_are_removed() {
    // A: [1, 2, 2, NaN], B: [x, y, y, z]
    let dataset = load_str("A,B\n1,x\n2,y\n2,y\nNaN,z\n").unwrap();

    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.report.duplicates_removed, 1);
    assert_eq!(dataset.report.rows_with_missing_dropped, 1);
    assert_eq!(dataset.report.missing_cells, 1);
}

#[test]
fn test_empty_field_fails_the_load() {
    let result = load_str("A,B\n1,x\n,y\n");
    assert!(matches!(result, Err(MigrationError::MalformedInput { .. })));
}

#[test]
fn test_empty_field_in_dropped_row_is_ignored() {
    // The blank cell sits in a row that is dropped for its missing value first.
    let dataset = load_str("A,B\n1,x\nNA,\n").unwrap();
    assert_eq!(dataset.len(), 1);
}

#[test]
fn test_header_only_yields_empty_dataset() {
    let dataset = load_str("nom,age,taille\n").unwrap();

    assert!(dataset.is_empty());
    assert_eq!(dataset.columns, vec!["nom", "age", "taille"]);
    assert_eq!(dataset.report, CleaningReport::default());
}

#[test]
fn test_completely_empty_input_yields_empty_dataset() {
    let dataset = load_str("").unwrap();
    assert!(dataset.is_empty());
    assert!(dataset.columns.is_empty());
}

#[test]
fn test_rows_carry_normalized_column_names() {
    let dataset = load_str("First Name,Blood Type\n alice ,O+\n").unwrap();
    let row = &dataset.rows[0];

    assert_eq!(row.get("First_Name"), Some(&RawCell::text(" alice ")));
    assert_eq!(row.get("Blood_Type"), Some(&RawCell::text("O+")));
}

#[test]
fn test_load_from_path() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "nom,age").unwrap();
    writeln!(file, "alice,28").unwrap();
    writeln!(file, "bob,31").unwrap();

    let dataset = DatasetLoader::new().load(file.path()).unwrap();
    assert_eq!(dataset.len(), 2);
}

#[test]
fn test_missing_file_is_io_error() {
    let result = DatasetLoader::new().load("/definitely/not/here.csv");
    assert!(matches!(result, Err(MigrationError::Io(_))));
}
