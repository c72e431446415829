use thiserror::Error;

/// Failures raised by a [`RecordStore`](crate::store::RecordStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to prepare database location: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported database connection string: {0}")]
    UnsupportedUrl(String),

    /// The store's own uniqueness constraint rejected a second record for a day.
    #[error("a record for {0} already exists")]
    Duplicate(String),

    #[error("stored timestamp {value:?} is malformed")]
    Timestamp { value: String },
}

/// Outcome of a weather service operation.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("a weather record for {0} already exists")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(StoreError),

    /// A stored date does not parse against the configured date format.
    #[error("record {id} has malformed date {value:?}")]
    Format { id: i64, value: String },
}

impl From<StoreError> for WeatherError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(date) => WeatherError::Conflict(date),
            other => WeatherError::Storage(other),
        }
    }
}

impl WeatherError {
    pub fn validation(msg: impl Into<String>) -> Self {
        WeatherError::Validation(msg.into())
    }
}
