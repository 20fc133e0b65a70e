use chrono::NaiveDate;
use thiserror::Error;

/// Failure taxonomy shared by the pure core and the storage seam.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid date range: {end} precedes {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("malformed day key `{key}`")]
    MalformedKey { key: String },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] anyhow::Error),

    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },
}

impl EngineError {
    pub fn storage(err: impl Into<anyhow::Error>) -> Self {
        Self::StorageUnavailable(err.into())
    }

    pub fn habit_not_found(id: i64) -> Self {
        Self::NotFound {
            entity: "habit",
            id: id.to_string(),
        }
    }
}
