//! Persistence seam for weather observations.

use async_trait::async_trait;

use crate::{
    error::StoreError,
    model::{NewObservation, Observation},
    store::sqlite::SqliteStore,
};

pub mod sqlite;

/// Key-ordered storage of observations.
///
/// Dates passed in are canonical `YYYY-MM-DD` strings, so string comparison
/// matches calendar order.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All live observations recorded on `date`.
    async fn find_on(&self, date: &str) -> Result<Vec<Observation>, StoreError>;

    /// All live observations with `from <= recorded_at <= to`, ascending.
    async fn find_between(&self, from: &str, to: &str) -> Result<Vec<Observation>, StoreError>;

    /// Open a write transaction. Dropping it without [`StoreTransaction::commit`]
    /// rolls back everything done through it.
    async fn begin<'a>(&'a self) -> Result<Box<dyn StoreTransaction + 'a>, StoreError>;
}

#[async_trait]
pub trait StoreTransaction: Send {
    async fn exists_on(&mut self, date: &str) -> Result<bool, StoreError>;

    /// Insert and return the row as stored.
    async fn insert(&mut self, record: &NewObservation) -> Result<Observation, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Open the store named by a connection string such as `sqlite://weather.db`.
pub fn store_from_url(url: &str) -> Result<Box<dyn RecordStore>, StoreError> {
    if let Some(location) = url.strip_prefix("sqlite://") {
        let store = if location == ":memory:" {
            SqliteStore::open_in_memory()?
        } else {
            SqliteStore::open(location)?
        };
        return Ok(Box::new(store));
    }

    Err(StoreError::UnsupportedUrl(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_url_opens_empty_store() {
        let store = store_from_url("sqlite://:memory:").expect("store must open");
        let rows = store.find_between("0000-01-01", "9999-12-31").await.unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn postgres_is_not_supported() {
        let err = store_from_url("postgresql://localhost/weather").err().unwrap();
        assert!(matches!(err, StoreError::UnsupportedUrl(_)));
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        assert!(store_from_url("weather.db").is_err());
    }
}
