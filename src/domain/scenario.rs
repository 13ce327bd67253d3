//! Demand scenario construction.
//!
//! Scenarios are built by deterministic contiguous block partition: scenario
//! `s` takes periods `[s * horizon, (s + 1) * horizon)` of the input series
//! and carries uniform weight `1 / S`. The same input always yields the same
//! scenario set.

use serde::{Deserialize, Serialize};

use crate::domain::DemandSeries;
use crate::error::PlannerError;

/// Probability weights must sum to 1 within this tolerance.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// One discrete, weighted realization of the uncertain demand trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub index: usize,
    pub probability: f64,
    /// Demand per horizon period, MW.
    pub demand: Vec<f64>,
}

/// Ordered collection of equal-horizon scenarios with a shared time grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSet {
    scenarios: Vec<Scenario>,
    horizon_periods: usize,
    period_hours: f64,
}

impl ScenarioSet {
    /// Partition `series` into `scenario_count` contiguous blocks of
    /// `horizon_periods` values each.
    pub fn from_series(
        series: &DemandSeries,
        scenario_count: usize,
        horizon_periods: usize,
        period_hours: f64,
    ) -> Result<Self, PlannerError> {
        if scenario_count == 0 {
            return Err(PlannerError::InvalidParameter(
                "scenario count must be positive".into(),
            ));
        }
        if horizon_periods == 0 {
            return Err(PlannerError::InvalidParameter(
                "horizon must have at least one period".into(),
            ));
        }
        if !(period_hours.is_finite() && period_hours > 0.0) {
            return Err(PlannerError::InvalidParameter(format!(
                "period length must be positive, got {period_hours}"
            )));
        }

        let required = scenario_count * horizon_periods;
        if series.len() < required {
            return Err(PlannerError::InsufficientData {
                available: series.len(),
                required,
                scenarios: scenario_count,
                horizon: horizon_periods,
            });
        }

        let values = series.values();
        let probability = 1.0 / scenario_count as f64;
        let scenarios = (0..scenario_count)
            .map(|s| Scenario {
                index: s,
                probability,
                demand: values[s * horizon_periods..(s + 1) * horizon_periods].to_vec(),
            })
            .collect();

        let set = Self {
            scenarios,
            horizon_periods,
            period_hours,
        };
        set.validate()?;
        Ok(set)
    }

    /// Check the structural invariants: equal horizons, positive weights
    /// summing to 1 within [`WEIGHT_SUM_TOLERANCE`].
    pub fn validate(&self) -> Result<(), PlannerError> {
        if self
            .scenarios
            .iter()
            .any(|s| s.demand.len() != self.horizon_periods)
        {
            return Err(PlannerError::InvalidParameter(
                "all scenarios must share the same horizon length".into(),
            ));
        }
        if self
            .scenarios
            .iter()
            .any(|s| !(s.probability > 0.0 && s.probability <= 1.0))
        {
            return Err(PlannerError::InvalidParameter(
                "scenario probabilities must lie in (0, 1]".into(),
            ));
        }
        let total: f64 = self.scenarios.iter().map(|s| s.probability).sum();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(PlannerError::InvalidParameter(format!(
                "scenario probabilities sum to {total}, expected 1"
            )));
        }
        Ok(())
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub fn horizon_periods(&self) -> usize {
        self.horizon_periods
    }

    pub fn period_hours(&self) -> f64 {
        self.period_hours
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DemandPoint;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    fn series(values: &[f64]) -> DemandSeries {
        let base = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        DemandSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(i, &demand_mw)| DemandPoint {
                    timestamp: base + Duration::hours(i as i64),
                    demand_mw,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn partitions_into_contiguous_blocks() {
        let set = ScenarioSet::from_series(&series(&[100.0, 120.0, 150.0, 90.0]), 2, 2, 1.0)
            .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.scenarios()[0].demand, vec![100.0, 120.0]);
        assert_eq!(set.scenarios()[1].demand, vec![150.0, 90.0]);
        assert_eq!(set.scenarios()[0].probability, 0.5);
    }

    #[test]
    fn surplus_periods_beyond_last_block_are_ignored() {
        let set =
            ScenarioSet::from_series(&series(&[1.0, 2.0, 3.0, 4.0, 5.0]), 2, 2, 1.0).unwrap();
        assert_eq!(set.scenarios()[1].demand, vec![3.0, 4.0]);
    }

    #[test]
    fn too_short_series_is_insufficient_data() {
        let err = ScenarioSet::from_series(&series(&[1.0, 2.0, 3.0]), 2, 2, 1.0).unwrap_err();
        assert!(matches!(
            err,
            PlannerError::InsufficientData {
                available: 3,
                required: 4,
                ..
            }
        ));
    }

    #[test]
    fn zero_counts_are_rejected() {
        let s = series(&[1.0, 2.0]);
        assert!(matches!(
            ScenarioSet::from_series(&s, 0, 2, 1.0),
            Err(PlannerError::InvalidParameter(_))
        ));
        assert!(matches!(
            ScenarioSet::from_series(&s, 2, 0, 1.0),
            Err(PlannerError::InvalidParameter(_))
        ));
    }

    #[test]
    fn construction_is_deterministic() {
        let s = series(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
        let a = ScenarioSet::from_series(&s, 3, 2, 1.0).unwrap();
        let b = ScenarioSet::from_series(&s, 3, 2, 1.0).unwrap();
        for (x, y) in a.scenarios().iter().zip(b.scenarios()) {
            assert_eq!(x.demand, y.demand);
            assert_eq!(x.probability, y.probability);
        }
    }

    proptest! {
        #[test]
        fn weights_sum_to_one_for_any_valid_partition(
            scenario_count in 1usize..40,
            horizon in 1usize..24,
            extra in 0usize..10,
        ) {
            let len = scenario_count * horizon + extra;
            let values: Vec<f64> = (0..len).map(|i| (i % 97) as f64).collect();
            let set = ScenarioSet::from_series(&series(&values), scenario_count, horizon, 1.0)
                .unwrap();

            let total: f64 = set.scenarios().iter().map(|s| s.probability).sum();
            prop_assert!((total - 1.0).abs() <= WEIGHT_SUM_TOLERANCE);
            prop_assert!(set.scenarios().iter().all(|s| s.demand.len() == horizon));
        }
    }
}
