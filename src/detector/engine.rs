use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::error::{Result, WaterSeerError};
use crate::market::PriceRecord;

use super::risk::RiskModel;
use super::transport::TransportCostModel;
use super::weather::DroughtRiskLookup;
use super::Opportunity;

/// Tunable thresholds for opportunity detection. All dollar amounts are per
/// unit of water.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Minimum price spread before a pair is a candidate. Default 50.
    pub min_gross_profit: f64,
    /// Minimum profit margin (percent of buy price). Default 10.
    pub min_margin_pct: f64,
    /// Minimum profit after transport costs. Default 20.
    pub min_net_profit: f64,
    /// Margin above which prices look unstable and risk goes up. Default 50.
    pub high_margin_pct: f64,
    /// Buy-side volume below which scarcity risk goes up. Default 500.
    pub low_volume_threshold: u64,
    /// Cap on the number of reported opportunities. Default 10.
    pub max_results: usize,
    /// When false, only the more profitable direction of each location pair
    /// is reported. Default true: each direction is judged on its own.
    pub bidirectional: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_gross_profit: 50.0,
            min_margin_pct: 10.0,
            min_net_profit: 20.0,
            high_margin_pct: 50.0,
            low_volume_threshold: 500,
            max_results: 10,
            bidirectional: true,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("min_gross_profit", self.min_gross_profit),
            ("min_margin_pct", self.min_margin_pct),
            ("min_net_profit", self.min_net_profit),
            ("high_margin_pct", self.high_margin_pct),
        ] {
            if !(value >= 0.0) {
                return Err(WaterSeerError::config_error(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        if self.max_results == 0 {
            return Err(WaterSeerError::config_error("max_results must be positive"));
        }
        Ok(())
    }
}

/// Rule-based arbitrage scan over the latest snapshot. Pure and synchronous:
/// given the same inputs it produces the same output.
pub struct OpportunityDetector {
    config: DetectorConfig,
    risk: RiskModel,
}

impl OpportunityDetector {
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        let risk = RiskModel::new(config.high_margin_pct, config.low_volume_threshold);
        Ok(Self { config, risk })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Scans every ordered location pair in the snapshot and returns viable
    /// opportunities sorted by net profit descending, ties broken by buy
    /// then sell location. At most `max_results` entries.
    ///
    /// Records with a non-positive or non-finite price are excluded from the
    /// scan; fewer than two usable locations yields an empty list.
    pub fn detect(
        &self,
        latest: &BTreeMap<String, PriceRecord>,
        weather: &dyn DroughtRiskLookup,
        transport: &TransportCostModel,
        as_of: DateTime<Utc>,
    ) -> Vec<Opportunity> {
        let usable: Vec<(&String, &PriceRecord)> = latest
            .iter()
            .filter(|(_, record)| record.is_usable())
            .collect();

        if usable.len() < 2 {
            debug!(
                "Only {} usable location(s) in snapshot, nothing to scan",
                usable.len()
            );
            return Vec::new();
        }

        let mut opportunities = Vec::new();

        for &(buy_location, buy) in &usable {
            for &(sell_location, sell) in &usable {
                if buy_location == sell_location {
                    continue;
                }

                let gross_profit = sell.price - buy.price;
                if gross_profit <= self.config.min_gross_profit {
                    continue;
                }

                let profit_margin_pct = gross_profit / buy.price * 100.0;
                if profit_margin_pct <= self.config.min_margin_pct {
                    continue;
                }

                let risk_score = self.risk.score(
                    profit_margin_pct,
                    buy.volume,
                    weather.drought_risk(buy_location),
                    weather.drought_risk(sell_location),
                );

                let transport_cost = transport.cost(buy_location, sell_location);
                let net_profit = gross_profit - transport_cost;
                if net_profit <= self.config.min_net_profit {
                    continue;
                }

                opportunities.push(Opportunity {
                    buy_location: buy_location.clone(),
                    buy_price: buy.price,
                    sell_location: sell_location.clone(),
                    sell_price: sell.price,
                    net_profit,
                    risk_score,
                    timestamp: as_of,
                });
            }
        }

        opportunities.sort_by(compare_opportunities);

        if !self.config.bidirectional {
            let mut seen = HashSet::new();
            opportunities.retain(|opp| seen.insert(unordered_key(opp)));
        }

        opportunities.truncate(self.config.max_results);
        opportunities
    }
}

/// Net profit descending; ties resolved by buy then sell location so the
/// output order is deterministic.
fn compare_opportunities(a: &Opportunity, b: &Opportunity) -> Ordering {
    b.net_profit
        .partial_cmp(&a.net_profit)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.buy_location.cmp(&b.buy_location))
        .then_with(|| a.sell_location.cmp(&b.sell_location))
}

fn unordered_key(opp: &Opportunity) -> (String, String) {
    if opp.buy_location <= opp.sell_location {
        (opp.buy_location.clone(), opp.sell_location.clone())
    } else {
        (opp.sell_location.clone(), opp.buy_location.clone())
    }
}
