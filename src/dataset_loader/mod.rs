// Dataset loader: delimited flat file to cleaned raw rows
pub mod cleaner;
pub mod reader;

#[cfg(test)]
mod tests;

pub use cleaner::CleaningReport;
pub use reader::RawTable;

use crate::error::MigrationError;
use crate::types::RawRow;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::info;

/// Cleaned contents of a source file
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    /// Normalized column names, in file order
    pub columns: Vec<String>,
    /// Deduplicated rows without missing values
    pub rows: Vec<RawRow>,
    /// What the cleaning step removed
    pub report: CleaningReport,
}

impl LoadedDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reads and cleans delimited flat files
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    delimiter: u8,
}

impl Default for DatasetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetLoader {
    /// Create a loader for comma separated files
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    pub fn with_delimiter(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// Load and clean the file at `path`
    pub fn load(&self, path: impl AsRef<Path>) -> Result<LoadedDataset, MigrationError> {
        let path = path.as_ref();
        info!("Loading dataset from {:?}", path);

        let file = File::open(path)?;
        let dataset = self.load_from_reader(BufReader::new(file))?;

        info!(
            columns = dataset.columns.len(),
            rows = dataset.rows.len(),
            "Dataset loaded from {:?}", path
        );
        Ok(dataset)
    }

    /// Load and clean delimited data from any reader
    pub fn load_from_reader<R: Read>(&self, reader: R) -> Result<LoadedDataset, MigrationError> {
        let table = reader::read_table(reader, self.delimiter)?;
        let (columns, rows, report) = cleaner::clean_table(table)?;

        let rows = rows
            .into_iter()
            .map(|cells| columns.iter().cloned().zip(cells).collect::<RawRow>())
            .collect();

        Ok(LoadedDataset {
            columns,
            rows,
            report,
        })
    }
}
