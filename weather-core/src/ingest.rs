//! Bulk upload of observations from a tab-separated data file.

use anyhow::{Context, Result, anyhow, bail};
use reqwest::{Client, Url};

use crate::model::WeatherRecordRequest;

/// Parse `date<TAB>humidity<TAB>temperature` lines. Trailing blank lines are ignored.
pub fn parse_records(contents: &str) -> Result<Vec<WeatherRecordRequest>> {
    contents
        .trim()
        .lines()
        .enumerate()
        .map(|(idx, line)| {
            parse_line(line).with_context(|| format!("Invalid record on line {}", idx + 1))
        })
        .collect()
}

fn parse_line(line: &str) -> Result<WeatherRecordRequest> {
    let line = line.trim_end_matches('\r');
    let mut fields = line.split('\t');

    let (Some(date), Some(humidity), Some(temperature), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        bail!("expected 3 tab-separated fields, got {:?}", line);
    };

    let humidity: f64 = humidity
        .trim()
        .parse()
        .with_context(|| format!("humidity {humidity:?} is not a number"))?;
    let temperature: f64 = temperature
        .trim()
        .parse()
        .with_context(|| format!("temperature {temperature:?} is not a number"))?;

    Ok(WeatherRecordRequest {
        date: Some(date.trim().to_string()),
        humidity: Some(humidity),
        temperature: Some(temperature),
    })
}

/// Posts records one by one to a running weather server.
#[derive(Debug, Clone)]
pub struct IngestClient {
    endpoint: Url,
    api_token: String,
    http: Client,
}

impl IngestClient {
    pub fn new(host: &str, api_token: String) -> Result<Self> {
        let mut base =
            Url::parse(host).with_context(|| format!("API host {host:?} is not a valid URL"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join("weather")
            .with_context(|| format!("Failed to build endpoint URL from {host:?}"))?;

        Ok(Self { endpoint, api_token, http: Client::new() })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn send(&self, record: &WeatherRecordRequest) -> Result<()> {
        let res = self
            .http
            .post(self.endpoint.clone())
            .header("X-Api-Token", &self.api_token)
            .json(record)
            .send()
            .await
            .context("Failed to send record to weather server")?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Weather server rejected record with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        Ok(())
    }

    /// Send every record in order, stopping at the first failure.
    pub async fn send_all(&self, records: &[WeatherRecordRequest]) -> Result<usize> {
        for (idx, record) in records.iter().enumerate() {
            tracing::info!(date = ?record.date, "Processing record");
            self.send(record)
                .await
                .with_context(|| format!("Stopped at record {} of {}", idx + 1, records.len()))?;
        }
        Ok(records.len())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
