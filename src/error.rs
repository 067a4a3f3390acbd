use thiserror::Error;

/// Failures surfaced by the review record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("review store query failed: {0}")]
    Query(#[from] sqlx::Error),
}

/// Failure taxonomy of the analytics engine. Malformed individual records
/// are never errors; they are skipped or counted per the windowing rules.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unsupported period token: {0}")]
    InvalidPeriod(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("aggregation cancelled by caller")]
    Cancelled,
}
