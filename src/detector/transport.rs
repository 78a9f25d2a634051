use std::collections::HashMap;

use crate::error::{Result, WaterSeerError};

pub const DEFAULT_TRANSPORT_COST: f64 = 30.0;

/// Per-unit transport cost between location pairs. Costs are symmetric:
/// the pair key is stored in sorted order so cost(A, B) == cost(B, A).
#[derive(Debug, Clone)]
pub struct TransportCostModel {
    costs: HashMap<(String, String), f64>,
    default_cost: f64,
}

impl TransportCostModel {
    pub fn new(default_cost: f64) -> Result<Self> {
        if !(default_cost >= 0.0) {
            return Err(WaterSeerError::config_error(format!(
                "default transport cost must be non-negative, got {}",
                default_cost
            )));
        }
        Ok(Self {
            costs: HashMap::new(),
            default_cost,
        })
    }

    /// The mock transport matrix from the prototype, in $/unit.
    pub fn california() -> Self {
        let mut model = Self {
            costs: HashMap::new(),
            default_cost: DEFAULT_TRANSPORT_COST,
        };
        model.insert("Central Valley", "Bay Area", 25.0);
        model.insert("Central Valley", "Southern CA", 35.0);
        model.insert("Imperial Valley", "Southern CA", 20.0);
        model.insert("Imperial Valley", "Bay Area", 45.0);
        model.insert("Sacramento Valley", "Bay Area", 30.0);
        model.insert("Sacramento Valley", "Southern CA", 40.0);
        model
    }

    pub fn set_route(&mut self, a: &str, b: &str, cost: f64) -> Result<()> {
        if !(cost >= 0.0) {
            return Err(WaterSeerError::config_error(format!(
                "transport cost for ({}, {}) must be non-negative, got {}",
                a, b, cost
            )));
        }
        self.insert(a, b, cost);
        Ok(())
    }

    pub fn cost(&self, from: &str, to: &str) -> f64 {
        self.costs
            .get(&pair_key(from, to))
            .copied()
            .unwrap_or(self.default_cost)
    }

    fn insert(&mut self, a: &str, b: &str, cost: f64) {
        self.costs.insert(pair_key(a, b), cost);
    }
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_is_symmetric() {
        let model = TransportCostModel::california();
        for (from, to) in [
            ("Central Valley", "Bay Area"),
            ("Imperial Valley", "Southern CA"),
            ("Sacramento Valley", "Southern CA"),
        ] {
            assert_eq!(model.cost(from, to), model.cost(to, from));
        }
        assert_eq!(model.cost("Central Valley", "Bay Area"), 25.0);
    }

    #[test]
    fn unmodeled_pair_gets_default_cost() {
        let model = TransportCostModel::california();
        assert_eq!(
            model.cost("Central Valley", "Imperial Valley"),
            DEFAULT_TRANSPORT_COST
        );
    }

    #[test]
    fn rejects_negative_costs() {
        assert!(TransportCostModel::new(-1.0).is_err());

        let mut model = TransportCostModel::new(30.0).unwrap();
        assert!(model.set_route("A", "B", -5.0).is_err());
        assert!(model.set_route("A", "B", 12.5).is_ok());
        assert_eq!(model.cost("B", "A"), 12.5);
    }
}
