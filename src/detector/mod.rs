pub mod engine;
pub mod risk;
pub mod transport;
pub mod weather;

pub use engine::{DetectorConfig, OpportunityDetector};
pub use risk::RiskModel;
pub use transport::TransportCostModel;
pub use weather::{DroughtRiskLookup, StaticWeatherTable, WeatherFactor};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A viable buy/sell pairing for one detection cycle. Recomputed from
/// scratch every cycle; never updated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub buy_location: String,
    pub buy_price: f64,
    pub sell_location: String,
    pub sell_price: f64,
    /// Price spread minus transport cost, per unit.
    pub net_profit: f64,
    /// Heuristic composite in [0, 1].
    pub risk_score: f64,
    pub timestamp: DateTime<Utc>,
}
