use chrono::NaiveDateTime;

use crate::error::IngestError;

/// Storage form used for every instant written to SQLite.
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse an instant from either of the two forms this system encounters:
///
/// - the export form, `2023-07-01T15:54:25.881Z` (the fractional tail varies in
///   length, so the date and time slices are taken positionally);
/// - the storage form, `2023-07-01 15:54:25` (exactly 19 characters).
pub fn parse_instant(raw: &str) -> Result<NaiveDateTime, IngestError> {
    let canonical = if raw.contains('T') {
        if raw.len() < 19 || !raw.is_ascii() {
            return Err(IngestError::MalformedTimestamp(raw.to_string()));
        }
        format!("{} {}", &raw[..10], &raw[11..19])
    } else if raw.len() == 19 {
        raw.to_string()
    } else {
        return Err(IngestError::MalformedTimestamp(raw.to_string()));
    };

    NaiveDateTime::parse_from_str(&canonical, STORAGE_FORMAT)
        .map_err(|_| IngestError::MalformedTimestamp(raw.to_string()))
}

/// Render an instant in the storage form. `parse_instant` of the result yields
/// the same date and time to the second.
pub fn format_instant(instant: NaiveDateTime) -> String {
    instant.format(STORAGE_FORMAT).to_string()
}

/// Confidence values are persisted rounded to two decimal digits.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
