use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Regional weather conditions affecting water demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherFactor {
    pub location: String,
    pub temp_f: f64,
    pub humidity_pct: f64,
    /// Water-scarcity exposure in [0, 1].
    pub drought_risk: f64,
}

/// Drought exposure lookup, injected into the detector so tests can
/// substitute deterministic fixtures.
pub trait DroughtRiskLookup {
    fn drought_risk(&self, location: &str) -> f64;
}

/// Table-backed lookup with a default for unmodeled locations.
#[derive(Debug, Clone)]
pub struct StaticWeatherTable {
    factors: HashMap<String, WeatherFactor>,
    default_risk: f64,
}

pub const DEFAULT_DROUGHT_RISK: f64 = 0.5;

impl StaticWeatherTable {
    pub fn new(default_risk: f64) -> Self {
        Self {
            factors: HashMap::new(),
            default_risk,
        }
    }

    /// The California markets the system was built around.
    pub fn california() -> Self {
        let mut table = Self::new(DEFAULT_DROUGHT_RISK);
        table.insert("Central Valley", 95.0, 30.0, 0.7);
        table.insert("Southern CA", 88.0, 45.0, 0.8);
        table.insert("Bay Area", 72.0, 65.0, 0.3);
        table.insert("Sacramento Valley", 89.0, 40.0, 0.5);
        table.insert("Imperial Valley", 102.0, 25.0, 0.6);
        table
    }

    pub fn insert(&mut self, location: &str, temp_f: f64, humidity_pct: f64, drought_risk: f64) {
        self.factors.insert(
            location.to_string(),
            WeatherFactor {
                location: location.to_string(),
                temp_f,
                humidity_pct,
                drought_risk,
            },
        );
    }

    pub fn factor(&self, location: &str) -> Option<&WeatherFactor> {
        self.factors.get(location)
    }
}

impl Default for StaticWeatherTable {
    fn default() -> Self {
        Self::new(DEFAULT_DROUGHT_RISK)
    }
}

impl DroughtRiskLookup for StaticWeatherTable {
    fn drought_risk(&self, location: &str) -> f64 {
        self.factors
            .get(location)
            .map(|f| f.drought_risk)
            .unwrap_or(self.default_risk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_location_returns_modeled_risk() {
        let table = StaticWeatherTable::california();
        assert_eq!(table.drought_risk("Southern CA"), 0.8);
        assert_eq!(table.drought_risk("Bay Area"), 0.3);
    }

    #[test]
    fn unknown_location_falls_back_to_default() {
        let table = StaticWeatherTable::california();
        assert_eq!(table.drought_risk("Lake Tahoe"), DEFAULT_DROUGHT_RISK);
    }
}
