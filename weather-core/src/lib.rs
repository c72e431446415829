//! Core library for the weather observation service.
//!
//! This crate defines:
//! - Configuration & unit table handling
//! - Date validation and unit formatting
//! - The record store abstraction and its SQLite backend
//! - The weather service that owns the business rules
//! - A bulk ingestion client
//!
//! It is used by `weather-server`, but can also be reused by other binaries or services.

pub mod config;
pub mod dates;
pub mod error;
pub mod ingest;
pub mod model;
pub mod notify;
pub mod service;
pub mod store;
pub mod units;

pub use config::{Config, Settings, UnitConfig};
pub use error::{StoreError, WeatherError};
pub use ingest::IngestClient;
pub use model::{Observation, WeatherRecordRequest, WeatherRecordResponse};
pub use notify::NotificationSink;
#[cfg(any(test, feature = "test-util"))]
pub use notify::RecordingSink;
pub use service::WeatherService;
pub use store::{RecordStore, StoreTransaction, store_from_url};
