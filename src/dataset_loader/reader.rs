use crate::error::MigrationError;
use crate::types::RawCell;
use csv::ReaderBuilder;
use std::io::Read;

/// Header plus data rows exactly as read from a delimited file
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Column names from the header row, unmodified
    pub headers: Vec<String>,
    /// One entry per data row, always `headers.len()` cells wide
    pub rows: Vec<Vec<RawCell>>,
}

/// Read a delimited file with a header row.
///
/// Rows shorter than the header are padded with missing cells; rows longer than
/// the header are rejected.
pub fn read_table<R: Read>(reader: R, delimiter: u8) -> Result<RawTable, MigrationError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();

    for (index, record) in rdr.records().enumerate() {
        let record = record?;
        if record.len() > headers.len() {
            // +2: one for the header line, one for 1-based numbering
            return Err(MigrationError::malformed_input(format!(
                "line {} has {} fields but the header declares {}",
                index + 2,
                record.len(),
                headers.len()
            )));
        }

        let mut cells: Vec<RawCell> = record.iter().map(RawCell::from_field).collect();
        cells.resize(headers.len(), RawCell::Missing);
        rows.push(cells);
    }

    Ok(RawTable { headers, rows })
}
