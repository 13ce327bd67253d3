//! Historical demand acquisition from the EIA open-data API (v2).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

use crate::domain::{DemandPoint, DemandSeries};

/// Source of historical demand series.
#[async_trait]
pub trait DemandProvider: Send + Sync {
    /// Fetch hourly demand between two period stamps (EIA format,
    /// e.g. `2023-01-01T00`).
    async fn fetch_demand(&self, start: &str, end: &str) -> Result<DemandSeries>;
}

/// Demand provider backed by the EIA regional electricity API.
#[derive(Clone)]
pub struct EiaDemandProvider {
    base_url: String,
    api_key: String,
    /// Balancing-authority respondent code, e.g. `TEX` for ERCOT.
    respondent: String,
    client: reqwest::Client,
}

impl EiaDemandProvider {
    pub fn new(
        base_url: String,
        api_key: String,
        respondent: String,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("capacity-planner/0.1"));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            base_url,
            api_key,
            respondent,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v2/electricity/rto/region-data/data/",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Deserialize)]
struct EiaEnvelope {
    response: EiaResponse,
}

#[derive(Debug, Deserialize)]
struct EiaResponse {
    data: Vec<EiaRecord>,
}

#[derive(Debug, Deserialize)]
struct EiaRecord {
    period: String,
    value: EiaValue,
}

/// The API reports values as numbers or strings depending on the series.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EiaValue {
    Number(f64),
    Text(String),
}

impl EiaValue {
    fn as_f64(&self) -> Result<f64> {
        match self {
            EiaValue::Number(v) => Ok(*v),
            EiaValue::Text(s) => s
                .parse::<f64>()
                .with_context(|| format!("non-numeric demand value '{s}'")),
        }
    }
}

/// Parse an EIA hourly period stamp (`2023-01-01T00`) to UTC.
fn parse_period(period: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    let naive = NaiveDateTime::parse_from_str(&format!("{period}:00"), "%Y-%m-%dT%H:%M")
        .with_context(|| format!("unparseable period stamp '{period}'"))?;
    Ok(naive.and_utc())
}

#[async_trait]
impl DemandProvider for EiaDemandProvider {
    async fn fetch_demand(&self, start: &str, end: &str) -> Result<DemandSeries> {
        let response = self
            .client
            .get(self.endpoint())
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("frequency", "hourly"),
                ("data[0]", "value"),
                ("facets[respondent][]", self.respondent.as_str()),
                ("facets[type][]", "D"),
                ("start", start),
                ("end", end),
                ("sort[0][column]", "period"),
                ("sort[0][direction]", "asc"),
                ("offset", "0"),
                ("length", "5000"),
            ])
            .send()
            .await
            .context("EIA request failed")?
            .error_for_status()
            .context("EIA returned an error status")?;

        let envelope: EiaEnvelope = response.json().await.context("invalid EIA payload")?;
        if envelope.response.data.is_empty() {
            anyhow::bail!(
                "EIA returned no demand records for respondent {} in {start}..{end}",
                self.respondent
            );
        }

        let mut points = envelope
            .response
            .data
            .iter()
            .map(|record| {
                Ok(DemandPoint {
                    timestamp: parse_period(&record.period)?,
                    demand_mw: record.value.as_f64()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        points.sort_by_key(|p| p.timestamp);

        info!(
            records = points.len(),
            respondent = %self.respondent,
            "fetched demand series from EIA"
        );
        DemandSeries::new(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hourly_period_stamps() {
        let ts = parse_period("2023-01-05T07").unwrap();
        assert_eq!(ts.to_rfc3339(), "2023-01-05T07:00:00+00:00");
    }

    #[test]
    fn rejects_garbage_period_stamps() {
        assert!(parse_period("yesterday").is_err());
    }
}
