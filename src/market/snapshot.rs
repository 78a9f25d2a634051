use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::error::{Result, WaterSeerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    Surface,
    Groundwater,
    #[serde(rename = "Colorado River")]
    ColoradoRiver,
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Surface => write!(f, "Surface"),
            SourceType::Groundwater => write!(f, "Groundwater"),
            SourceType::ColoradoRiver => write!(f, "Colorado River"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub location: String,
    /// Price in dollars per acre-foot.
    pub price: f64,
    /// Available volume in acre-feet.
    pub volume: u64,
    pub timestamp: DateTime<Utc>,
    pub source_type: SourceType,
}

impl PriceRecord {
    /// A record is usable when its location is non-empty and its price is a
    /// finite positive number. Anything else is a data-quality problem and
    /// gets skipped, never propagated.
    pub fn is_usable(&self) -> bool {
        !self.location.trim().is_empty() && self.price.is_finite() && self.price > 0.0
    }
}

/// Append-only store of market observations. Only the most recent record per
/// location feeds detection; older records stay around for the analyst's
/// trend summary.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    records: Vec<PriceRecord>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: PriceRecord) -> Result<()> {
        if !record.is_usable() {
            return Err(WaterSeerError::market_data_error(format!(
                "unusable price record for '{}': price={}",
                record.location, record.price
            )));
        }
        self.records.push(record);
        Ok(())
    }

    /// Appends every usable record, skipping the rest. Returns how many
    /// records were actually stored.
    pub fn append_all(&mut self, records: impl IntoIterator<Item = PriceRecord>) -> usize {
        let mut stored = 0;
        for record in records {
            match self.append(record) {
                Ok(()) => stored += 1,
                Err(e) => warn!("Skipping record: {}", e),
            }
        }
        stored
    }

    /// Latest record per location. Latest-wins on timestamp; an equal
    /// timestamp is resolved in favor of the later insertion.
    pub fn latest_per_location(&self) -> BTreeMap<String, PriceRecord> {
        let mut latest: BTreeMap<String, PriceRecord> = BTreeMap::new();
        for record in &self.records {
            match latest.get(&record.location) {
                Some(existing) if record.timestamp < existing.timestamp => {}
                _ => {
                    latest.insert(record.location.clone(), record.clone());
                }
            }
        }
        latest
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(location: &str, price: f64, ts_secs: i64) -> PriceRecord {
        PriceRecord {
            location: location.to_string(),
            price,
            volume: 1000,
            timestamp: Utc.timestamp_opt(ts_secs, 0).unwrap(),
            source_type: SourceType::Surface,
        }
    }

    #[test]
    fn latest_wins_per_location() {
        let mut store = SnapshotStore::new();
        store.append(record("Central Valley", 450.0, 100)).unwrap();
        store.append(record("Central Valley", 480.0, 200)).unwrap();
        store.append(record("Bay Area", 750.0, 150)).unwrap();

        let latest = store.latest_per_location();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest["Central Valley"].price, 480.0);
        assert_eq!(latest["Bay Area"].price, 750.0);
    }

    #[test]
    fn equal_timestamps_resolve_to_later_insertion() {
        let mut store = SnapshotStore::new();
        store.append(record("Central Valley", 450.0, 100)).unwrap();
        store.append(record("Central Valley", 470.0, 100)).unwrap();

        let latest = store.latest_per_location();
        assert_eq!(latest["Central Valley"].price, 470.0);
    }

    #[test]
    fn rejects_unusable_records() {
        let mut store = SnapshotStore::new();
        assert!(store.append(record("", 450.0, 100)).is_err());
        assert!(store.append(record("Bay Area", 0.0, 100)).is_err());
        assert!(store.append(record("Bay Area", -10.0, 100)).is_err());
        assert!(store.append(record("Bay Area", f64::NAN, 100)).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn append_all_skips_bad_records_and_continues() {
        let mut store = SnapshotStore::new();
        let stored = store.append_all(vec![
            record("Central Valley", 450.0, 100),
            record("Bay Area", f64::INFINITY, 100),
            record("Southern CA", 680.0, 100),
        ]);
        assert_eq!(stored, 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn source_type_serializes_to_original_labels() {
        assert_eq!(
            serde_json::to_string(&SourceType::ColoradoRiver).unwrap(),
            "\"Colorado River\""
        );
        assert_eq!(
            serde_json::to_string(&SourceType::Surface).unwrap(),
            "\"Surface\""
        );
    }
}
