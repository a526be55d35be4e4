use crate::types::{FieldValue, RawCell};
use chrono::NaiveDate;

/// Strict calendar date pattern recognised by the date rule
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Infer a typed value for one cell.
///
/// Rules are applied in order and overlap, so the order is significant:
/// 1. missing marker -> null
/// 2. all digits -> integer
/// 3. all digits once a single `.` is removed -> decimal rounded to 2 places
/// 4. text containing `-` -> `YYYY-MM-DD` date, else the trimmed text as-is
/// 5. anything else -> trimmed, title-cased text
pub fn classify_cell(cell: &RawCell) -> FieldValue {
    let form = match cell.string_form() {
        Some(form) => form,
        None => return FieldValue::Null,
    };

    if is_all_digits(&form) {
        // Overflowing integers fall through to the decimal rule
        if let Ok(value) = form.parse::<i64>() {
            return FieldValue::Integer(value);
        }
    }

    if is_decimal_literal(&form) {
        if let Ok(value) = form.parse::<f64>() {
            return FieldValue::Decimal(round_to_cents(value));
        }
    }

    if let RawCell::Text(text) = cell {
        if text.contains('-') {
            let trimmed = text.trim();
            return match NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
                Ok(date) => FieldValue::Date(date),
                Err(_) => FieldValue::Text(trimmed.to_string()),
            };
        }
    }

    let titled = title_case(form.trim());
    if titled.is_empty() {
        FieldValue::Null
    } else {
        FieldValue::Text(titled)
    }
}

/// Non-empty and made only of ASCII digits
pub fn is_all_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// All digits after removing the first `.`, if any
pub fn is_decimal_literal(value: &str) -> bool {
    is_all_digits(&value.replacen('.', "", 1))
}

pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Capitalize the first letter of each whitespace-separated word and lowercase the rest.
/// Whitespace itself is preserved.
pub fn title_case(text: &str) -> String {
    let mut titled = String::with_capacity(text.len());
    let mut at_word_start = true;

    for c in text.chars() {
        if c.is_whitespace() {
            at_word_start = true;
            titled.push(c);
        } else if at_word_start {
            titled.extend(c.to_uppercase());
            at_word_start = false;
        } else {
            titled.extend(c.to_lowercase());
        }
    }

    titled
}
