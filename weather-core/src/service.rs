//! Business rules for recording and reading daily observations.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::{
    config::UnitConfig,
    dates::{ISO_DATE, is_date_in_future, parse_iso_date},
    error::WeatherError,
    model::{
        FormattedValues, NewObservation, Observation, RawValues, WeatherRecordRequest,
        WeatherRecordResponse,
    },
    store::RecordStore,
    units::format_float,
};

/// Validates, persists and formats weather observations.
#[derive(Clone)]
pub struct WeatherService {
    store: Arc<dyn RecordStore>,
    units: UnitConfig,
}

impl std::fmt::Debug for WeatherService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherService").field("units", &self.units).finish_non_exhaustive()
    }
}

impl WeatherService {
    pub fn new(store: Arc<dyn RecordStore>, units: UnitConfig) -> Self {
        Self { store, units }
    }

    /// Records for one day. `date` must already be a valid ISO date.
    pub async fn get_for_single_day(
        &self,
        date: &str,
    ) -> Result<Vec<WeatherRecordResponse>, WeatherError> {
        let rows = self.store.find_on(date).await?;
        self.format_records(&rows)
    }

    /// Records in the inclusive range `[from, to]`, ascending by date.
    pub async fn get_for_range(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Vec<WeatherRecordResponse>, WeatherError> {
        let rows = self.store.find_between(from, to).await?;
        self.format_records(&rows)
    }

    /// Validate and persist one observation.
    ///
    /// The existence check, the insert and the formatting of the stored row run
    /// in one transaction; it commits only once the response is ready.
    pub async fn create(
        &self,
        request: WeatherRecordRequest,
    ) -> Result<WeatherRecordResponse, WeatherError> {
        let record = validate(request)?;

        let mut tx = self.store.begin().await?;
        if tx.exists_on(&record.recorded_at).await? {
            return Err(WeatherError::Conflict(record.recorded_at));
        }

        let stored = tx.insert(&record).await?;
        let response = self.format_record(&stored)?;
        tx.commit().await?;

        tracing::debug!(date = %response.date, "Stored weather record");
        Ok(response)
    }

    /// Any unparsable stored date fails the whole batch.
    fn format_records(
        &self,
        rows: &[Observation],
    ) -> Result<Vec<WeatherRecordResponse>, WeatherError> {
        rows.iter().map(|row| self.format_record(row)).collect()
    }

    fn format_record(&self, row: &Observation) -> Result<WeatherRecordResponse, WeatherError> {
        let date = NaiveDate::parse_from_str(&row.recorded_at, &self.units.date_format)
            .map_err(|_| WeatherError::Format { id: row.id, value: row.recorded_at.clone() })?;

        Ok(WeatherRecordResponse {
            date: date.format(&self.units.date_format).to_string(),
            raw: RawValues { humidity: row.humidity, temperature: row.temperature },
            formatted: FormattedValues {
                humidity: format_float(row.humidity, &self.units.humidity_unit),
                temperature: format_float(row.temperature, &self.units.temperature_unit),
            },
        })
    }
}

/// Check presence and date rules, normalizing the date for storage.
fn validate(request: WeatherRecordRequest) -> Result<NewObservation, WeatherError> {
    let WeatherRecordRequest { date, humidity, temperature } = request;

    let date = date.ok_or_else(|| WeatherError::validation("missing field 'date'"))?;
    let humidity = humidity.ok_or_else(|| WeatherError::validation("missing field 'humidity'"))?;
    let temperature =
        temperature.ok_or_else(|| WeatherError::validation("missing field 'temperature'"))?;

    let parsed = parse_iso_date(&date)
        .ok_or_else(|| WeatherError::validation(format!("invalid date {date:?}")))?;
    if is_date_in_future(&date) {
        return Err(WeatherError::validation(format!("date {date} is in the future")));
    }

    Ok(NewObservation {
        recorded_at: parsed.format(ISO_DATE).to_string(),
        humidity,
        temperature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::sqlite::SqliteStore;

    fn service() -> (WeatherService, Arc<SqliteStore>) {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        (WeatherService::new(store.clone(), UnitConfig::metric()), store)
    }

    fn request(date: &str) -> WeatherRecordRequest {
        WeatherRecordRequest {
            date: Some(date.to_string()),
            humidity: Some(60.98765),
            temperature: Some(25.98765),
        }
    }

    fn expected(date: &str) -> WeatherRecordResponse {
        WeatherRecordResponse {
            date: date.to_string(),
            raw: RawValues { humidity: 60.98765, temperature: 25.98765 },
            formatted: FormattedValues {
                humidity: "60.99%".to_string(),
                temperature: "25.99°C".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn create_then_read_same_day() {
        let (svc, _) = service();

        let created = svc.create(request("2024-06-01")).await.unwrap();
        assert_eq!(created, expected("2024-06-01"));

        let read = svc.get_for_single_day("2024-06-01").await.unwrap();
        assert_eq!(read, vec![expected("2024-06-01")]);
    }

    #[tokio::test]
    async fn duplicate_day_conflicts_and_keeps_original() {
        let (svc, _) = service();
        svc.create(request("2024-06-01")).await.unwrap();

        let mut second = request("2024-06-01");
        second.humidity = Some(10.0);
        let err = svc.create(second).await.unwrap_err();
        assert!(matches!(err, WeatherError::Conflict(ref d) if d == "2024-06-01"));

        let read = svc.get_for_single_day("2024-06-01").await.unwrap();
        assert_eq!(read, vec![expected("2024-06-01")]);
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let (svc, store) = service();

        let mut no_humidity = request("2024-06-01");
        no_humidity.humidity = None;
        let only_temperature =
            WeatherRecordRequest { temperature: Some(25.98765), ..Default::default() };

        for req in [no_humidity, only_temperature] {
            let err = svc.create(req).await.unwrap_err();
            assert!(matches!(err, WeatherError::Validation(_)));
        }
        assert!(store.find_between("0000-01-01", "9999-12-31").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_and_future_dates_are_rejected() {
        let (svc, _) = service();

        for date in ["invalid date!", "2024-02-30", "2999-01-01"] {
            let err = svc.create(request(date)).await.unwrap_err();
            assert!(matches!(err, WeatherError::Validation(_)), "{date} must be rejected");
        }
    }

    #[tokio::test]
    async fn range_read_is_inclusive_and_repeatable() {
        let (svc, _) = service();
        for date in ["2025-01-04", "2025-01-02", "2025-01-01", "2025-01-03"] {
            svc.create(request(date)).await.unwrap();
        }

        let first = svc.get_for_range("2025-01-01", "2025-01-03").await.unwrap();
        assert_eq!(
            first,
            vec![expected("2025-01-01"), expected("2025-01-02"), expected("2025-01-03")]
        );

        let second = svc.get_for_range("2025-01-01", "2025-01-03").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn empty_day_is_not_an_error() {
        let (svc, _) = service();
        assert!(svc.get_for_single_day("2024-06-01").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn corrupted_stored_date_fails_the_batch() {
        let (svc, store) = service();
        svc.create(request("2025-01-01")).await.unwrap();
        store
            .execute_raw(
                "INSERT INTO weather (recorded_at, humidity, temperature) VALUES ('2025-01-02T', 1.0, 2.0)",
            )
            .await
            .unwrap();

        let err = svc.get_for_range("2025-01-01", "2025-01-03").await.unwrap_err();
        assert!(matches!(err, WeatherError::Format { ref value, .. } if value == "2025-01-02T"));
    }
}
