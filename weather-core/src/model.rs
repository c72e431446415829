use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted daily observation.
///
/// `recorded_at` is the canonical `YYYY-MM-DD` text the store holds. The
/// bookkeeping timestamps belong to the store; nothing here writes `deleted_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub id: i64,
    pub recorded_at: String,
    pub humidity: f64,
    pub temperature: f64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Values for an observation that is about to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewObservation {
    pub recorded_at: String,
    pub humidity: f64,
    pub temperature: f64,
}

/// Inbound create body. Every field is required; `Option` lets a missing
/// field surface as a validation error instead of a decode error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherRecordRequest {
    pub date: Option<String>,
    pub humidity: Option<f64>,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawValues {
    pub humidity: f64,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedValues {
    pub humidity: String,
    pub temperature: String,
}

/// Outbound record, as returned by reads and creates and pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecordResponse {
    pub date: String,
    pub raw: RawValues,
    pub formatted: FormattedValues,
}
