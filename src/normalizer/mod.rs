// Record normalizer: raw rows to typed records, one cell at a time
pub mod classifier;


pub use classifier::classify_cell;

use crate::types::{FieldKind, NormalizedRecord, RawRow};
use serde::Serialize;
use tracing::debug;

/// Per-kind field counts across a normalized batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizationStatistics {
    pub records: usize,
    pub integers: usize,
    pub decimals: usize,
    pub dates: usize,
    pub texts: usize,
    pub nulls: usize,
}

impl NormalizationStatistics {
    fn count(&mut self, kind: FieldKind) {
        match kind {
            FieldKind::Integer => self.integers += 1,
            FieldKind::Decimal => self.decimals += 1,
            FieldKind::Date => self.dates += 1,
            FieldKind::Text => self.texts += 1,
            FieldKind::Null => self.nulls += 1,
        }
    }
}

/// Records produced from a batch of rows
#[derive(Debug, Clone, Default)]
pub struct NormalizationResult {
    pub records: Vec<NormalizedRecord>,
    pub statistics: NormalizationStatistics,
}

/// Normalize one row. Pure: the result depends only on `row`.
pub fn normalize(row: &RawRow) -> NormalizedRecord {
    row.cells()
        .map(|(column, cell)| (column, classify_cell(cell)))
        .collect()
}

/// Normalize every row independently and collect per-kind statistics
pub fn normalize_all(rows: &[RawRow]) -> NormalizationResult {
    let mut statistics = NormalizationStatistics::default();

    let records: Vec<NormalizedRecord> = rows
        .iter()
        .map(|row| {
            let record = normalize(row);
            for (_, value) in record.fields() {
                statistics.count(value.kind());
            }
            record
        })
        .collect();

    statistics.records = records.len();
    debug!(
        records = statistics.records,
        integers = statistics.integers,
        decimals = statistics.decimals,
        dates = statistics.dates,
        texts = statistics.texts,
        nulls = statistics.nulls,
        "Normalized records"
    );

    NormalizationResult {
        records,
        statistics,
    }
}
