use chrono::{NaiveDate, NaiveTime};
use mongodb::bson::{self, Bson, Document};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Name of the identifier field assigned by the destination store
pub const ID_FIELD: &str = "_id";

/// Cell tokens treated as missing values when reading a flat file.
///
/// Matching is exact. The empty string is not a marker: blank cells are
/// rejected by the loader instead of being dropped.
pub const MISSING_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Returns true if the token is one of the recognised missing-value markers
pub fn is_missing_marker(value: &str) -> bool {
    MISSING_MARKERS.contains(&value)
}

/// An untyped cell value as read from the source file
#[derive(Debug, Clone)]
pub enum RawCell {
    /// Missing-value marker
    Missing,
    /// Textual cell, kept exactly as read (no trimming)
    Text(String),
    /// Integer cell, only produced by programmatic callers
    Integer(i64),
    /// Decimal cell, only produced by programmatic callers
    Decimal(f64),
}

impl RawCell {
    /// Build a cell from a field read out of a delimited file
    pub fn from_field(field: &str) -> Self {
        if is_missing_marker(field) {
            RawCell::Missing
        } else {
            RawCell::Text(field.to_string())
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        RawCell::Text(value.into())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, RawCell::Missing)
    }

    /// Textual cell that is empty once surrounding whitespace is removed
    pub fn is_blank(&self) -> bool {
        matches!(self, RawCell::Text(s) if s.trim().is_empty())
    }

    /// String form the type-inference rules operate on; `None` for missing cells
    pub fn string_form(&self) -> Option<Cow<'_, str>> {
        match self {
            RawCell::Missing => None,
            RawCell::Text(s) => Some(Cow::Borrowed(s.as_str())),
            RawCell::Integer(i) => Some(Cow::Owned(i.to_string())),
            RawCell::Decimal(d) => Some(Cow::Owned(format_decimal(*d))),
        }
    }
}

impl PartialEq for RawCell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RawCell::Missing, RawCell::Missing) => true,
            (RawCell::Text(a), RawCell::Text(b)) => a == b,
            (RawCell::Integer(a), RawCell::Integer(b)) => a == b,
            (RawCell::Decimal(a), RawCell::Decimal(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl Eq for RawCell {}

impl Hash for RawCell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            RawCell::Missing => {}
            RawCell::Text(s) => s.hash(state),
            RawCell::Integer(i) => i.hash(state),
            RawCell::Decimal(d) => d.to_bits().hash(state),
        }
    }
}

/// Ordered mapping from column name to raw cell, as read from the source file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: Vec<(String, RawCell)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion, used heavily by tests
    pub fn with(mut self, column: impl Into<String>, cell: RawCell) -> Self {
        self.push(column, cell);
        self
    }

    /// Append a cell, replacing any existing cell of the same column in place
    pub fn push(&mut self, column: impl Into<String>, cell: RawCell) {
        let column = column.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some(existing) => existing.1 = cell,
            None => self.cells.push((column, cell)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&RawCell> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell)
    }

    pub fn cells(&self) -> impl Iterator<Item = (&str, &RawCell)> {
        self.cells.iter().map(|(name, cell)| (name.as_str(), cell))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, RawCell)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, RawCell)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (column, cell) in iter {
            row.push(column, cell);
        }
        row
    }
}

/// Kind tag of a normalized value, also used to compare against stored BSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Integer,
    Decimal,
    Date,
    Text,
    Null,
}

impl FieldKind {
    /// Kind of a stored BSON value; `None` for BSON types this crate never writes
    pub fn of_bson(value: &Bson) -> Option<FieldKind> {
        match value {
            Bson::Int32(_) | Bson::Int64(_) => Some(FieldKind::Integer),
            Bson::Double(_) => Some(FieldKind::Decimal),
            Bson::DateTime(_) => Some(FieldKind::Date),
            Bson::String(_) => Some(FieldKind::Text),
            Bson::Null => Some(FieldKind::Null),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Integer => "integer",
            FieldKind::Decimal => "decimal",
            FieldKind::Date => "date",
            FieldKind::Text => "text",
            FieldKind::Null => "null",
        };
        f.write_str(name)
    }
}

/// A typed, coerced field value ready for persistence
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    /// Rounded to two fractional digits
    Decimal(f64),
    Date(NaiveDate),
    Text(String),
    Null,
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Integer(_) => FieldKind::Integer,
            FieldValue::Decimal(_) => FieldKind::Decimal,
            FieldValue::Date(_) => FieldKind::Date,
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Null => FieldKind::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Convert to the BSON value stored in the destination collection.
    /// Dates are stored as datetimes at UTC midnight.
    pub fn to_bson(&self) -> Bson {
        match self {
            FieldValue::Integer(i) => Bson::Int64(*i),
            FieldValue::Decimal(d) => Bson::Double(*d),
            FieldValue::Date(date) => {
                let millis = date.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
                Bson::DateTime(bson::DateTime::from_millis(millis))
            }
            FieldValue::Text(s) => Bson::String(s.clone()),
            FieldValue::Null => Bson::Null,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Decimal(d) => f.write_str(&format_decimal(*d)),
            FieldValue::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Null => Ok(()),
        }
    }
}

/// Decimal text that always carries a fractional part, so `30.0` never reads back as an integer
pub fn format_decimal(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Mapping from field name to typed value, in source column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRecord {
    fields: Vec<(String, FieldValue)>,
}

impl NormalizedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing any existing value of the same name in place
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(field) => field.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// BSON document for insertion; the store assigns the identifier
    pub fn to_document(&self) -> Document {
        self.fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_bson()))
            .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for NormalizedRecord {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        let mut record = NormalizedRecord::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

impl Serialize for NormalizedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
