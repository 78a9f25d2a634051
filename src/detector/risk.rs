/// Heuristic risk model for an arbitrage pairing. Pure sum of independent
/// terms, clamped to [0, 1]:
///
/// - a flat base of 0.1,
/// - +0.3 when the margin is wide enough to suggest unstable prices,
/// - +0.2 when the buy side has scarce volume,
/// - +0.3 weighted by the pair's average drought exposure.
#[derive(Debug, Clone)]
pub struct RiskModel {
    high_margin_pct: f64,
    low_volume_threshold: u64,
}

const BASE_RISK: f64 = 0.1;
const HIGH_MARGIN_PENALTY: f64 = 0.3;
const LOW_VOLUME_PENALTY: f64 = 0.2;
const DROUGHT_WEIGHT: f64 = 0.3;

impl RiskModel {
    pub fn new(high_margin_pct: f64, low_volume_threshold: u64) -> Self {
        Self {
            high_margin_pct,
            low_volume_threshold,
        }
    }

    pub fn score(
        &self,
        profit_margin_pct: f64,
        buy_volume: u64,
        buy_drought_risk: f64,
        sell_drought_risk: f64,
    ) -> f64 {
        let mut risk = BASE_RISK;

        if profit_margin_pct > self.high_margin_pct {
            risk += HIGH_MARGIN_PENALTY;
        }

        if buy_volume < self.low_volume_threshold {
            risk += LOW_VOLUME_PENALTY;
        }

        let avg_drought_risk = (buy_drought_risk + sell_drought_risk) / 2.0;
        risk += avg_drought_risk * DROUGHT_WEIGHT;

        risk.min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> RiskModel {
        RiskModel::new(50.0, 500)
    }

    #[test]
    fn base_case_is_one_tenth() {
        // Margin at threshold, plentiful volume, zero drought exposure.
        let score = model().score(50.0, 1000, 0.0, 0.0);
        assert!((score - 0.1).abs() < 1e-9);
    }

    #[test]
    fn each_term_is_independent() {
        let m = model();
        assert!((m.score(51.0, 1000, 0.0, 0.0) - 0.4).abs() < 1e-9);
        assert!((m.score(50.0, 499, 0.0, 0.0) - 0.3).abs() < 1e-9);
        assert!((m.score(50.0, 1000, 0.5, 0.5) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn drought_term_averages_both_sides() {
        let score = model().score(10.0, 1000, 0.2, 0.8);
        // avg 0.5 * 0.3 weight on top of the base
        assert!((score - 0.25).abs() < 1e-9);
    }

    #[test]
    fn score_is_clamped_to_unit_interval() {
        let score = model().score(200.0, 0, 1.0, 1.0);
        assert!(score <= 1.0);
        assert!((score - 0.9).abs() < 1e-9);
    }
}
