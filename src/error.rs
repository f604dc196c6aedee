use thiserror::Error;

/// Errors that abort ingestion of the current batch. Segments already driven to
/// completion before the failure stay durable; nothing is rolled back.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The raw value matches neither the export timestamp form
    /// (`2023-07-01T15:54:25.881Z`) nor the storage form (`2023-07-01 15:54:25`).
    #[error("timestamp '{0}' matches neither the export nor the storage format")]
    MalformedTimestamp(String),

    /// The ranked guess list for a segment is not confidence-descending. The
    /// classifier's early exit relies on that ordering, so we refuse to guess.
    #[error(
        "guess list for segment starting at '{start}' is not ordered by descending \
         confidence ({previous} followed by {current})"
    )]
    UnorderedConfidence {
        start: String,
        previous: f64,
        current: f64,
    },
}
