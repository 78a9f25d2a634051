use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::snapshot::{PriceRecord, SourceType};

pub const NOAA_WATER_MONITOR_URL: &str = "https://api.water.noaa.gov/nwps/v1/monitor";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A source of market observations. Implementations are thin wrappers over
/// external feeds; bad rows are skipped, never raised.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_latest(&self) -> Result<Vec<PriceRecord>>;
}

/// Polls a JSON feed of market rows shaped like the raw-data sheet:
/// `[{"location": ..., "price": ..., "volume": ..., "date": ..., "type": ...}]`.
pub struct MarketFeedSource {
    name: String,
    url: String,
    client: Client,
}

impl MarketFeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("building HTTP client for market feed")?;

        Ok(Self {
            name: name.into(),
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl MarketDataSource for MarketFeedSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_latest(&self) -> Result<Vec<PriceRecord>> {
        info!("Fetching market data from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .header("accept", "application/json")
            .send()
            .await
            .with_context(|| format!("requesting market feed {}", self.url))?
            .error_for_status()
            .with_context(|| format!("market feed {} returned an error", self.url))?;

        let payload: Value = response.json().await.context("decoding market feed JSON")?;
        let rows = payload
            .as_array()
            .cloned()
            .or_else(|| payload.get("records").and_then(Value::as_array).cloned())
            .unwrap_or_default();

        let now = Utc::now();
        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            match parse_feed_row(row, now) {
                Some(record) => records.push(record),
                None => warn!("Skipping malformed market row: {}", row),
            }
        }

        debug!(
            "Parsed {} of {} rows from {}",
            records.len(),
            rows.len(),
            self.name
        );
        Ok(records)
    }
}

/// Maps one feed row to a `PriceRecord`. Returns `None` on any missing or
/// malformed field; callers skip and continue.
fn parse_feed_row(row: &Value, fallback_ts: DateTime<Utc>) -> Option<PriceRecord> {
    let location = field(row, "location")?.as_str()?.trim().to_string();
    if location.is_empty() {
        return None;
    }

    let price = parse_number(field(row, "price")?)?;
    if !price.is_finite() || price <= 0.0 {
        return None;
    }

    let volume = parse_number(field(row, "volume")?)? as u64;
    let source_type = parse_source_type(field(row, "type").and_then(Value::as_str))?;
    let timestamp = field(row, "date")
        .and_then(Value::as_str)
        .and_then(parse_timestamp)
        .unwrap_or(fallback_ts);

    Some(PriceRecord {
        location,
        price,
        volume,
        timestamp,
        source_type,
    })
}

fn field<'a>(row: &'a Value, name: &str) -> Option<&'a Value> {
    // Feeds differ on header casing; the sheet used "Location", "Price", ...
    let capitalized = format!("{}{}", name[..1].to_uppercase(), &name[1..]);
    row.get(name).or_else(|| row.get(&capitalized))
}

fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_source_type(value: Option<&str>) -> Option<SourceType> {
    match value?.trim() {
        "Surface" => Some(SourceType::Surface),
        "Groundwater" => Some(SourceType::Groundwater),
        "Colorado River" | "ColoradoRiver" => Some(SourceType::ColoradoRiver),
        _ => None,
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    // Sheet-style timestamps: "2025-08-25 14:30:00"
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Thin client for the NOAA water monitor API. Used by `init` as a
/// connectivity probe and by the analyst for hydrology context.
pub struct NoaaWaterSource {
    url: String,
    api_key: Option<String>,
    client: Client,
}

impl NoaaWaterSource {
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("building HTTP client for NOAA")?;

        Ok(Self {
            url: url.into(),
            api_key,
            client,
        })
    }

    pub async fn monitor(&self) -> Result<Value> {
        info!("Calling NOAA water monitor at {}", self.url);

        let mut request = self.client.get(&self.url).header("accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .context("requesting NOAA water monitor")?
            .error_for_status()
            .context("NOAA water monitor returned an error")?;

        response.json().await.context("decoding NOAA response")
    }
}
