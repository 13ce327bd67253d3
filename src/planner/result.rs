//! Interpretation of raw solver output.
//!
//! The extractor maps the flat variable assignment back into domain
//! quantities and recomputes the objective from dispatch and shed values
//! alone. The recomputation is deliberately independent of the solver's
//! reported objective; a disagreement beyond tolerance means the model or
//! the solver precision is broken, and that is surfaced as an error rather
//! than averaged away.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::ScenarioSet;
use crate::error::{PlannerError, SolveStatus};
use crate::planner::model::{PlanParameters, VarKey};
use crate::planner::solver::RawSolution;

/// Reported and recomputed objectives may differ by at most this relative
/// tolerance before the result is rejected.
pub const OBJECTIVE_RELATIVE_TOLERANCE: f64 = 1e-4;

/// Domain-level outcome of one optimal solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolutionResult {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: SolveStatus,
    /// Installed capacity per technology, MW.
    pub capacities_mw: BTreeMap<String, f64>,
    /// Dispatched output per technology, indexed `[scenario][period]`, MW.
    pub dispatch_mw: BTreeMap<String, Vec<Vec<f64>>>,
    /// Unserved demand indexed `[scenario][period]`, MW.
    pub shed_mw: Vec<Vec<f64>>,
    /// Realized operating cost per scenario.
    pub scenario_costs: Vec<f64>,
    /// Probability-weighted mean of the scenario costs.
    pub expected_cost: f64,
    /// Smallest scenario cost whose cumulative probability reaches the
    /// configured confidence level.
    pub value_at_risk: f64,
    /// Conditional value-at-risk of the operating cost at the configured
    /// confidence level.
    pub cvar: f64,
    /// Highest realized scenario cost.
    pub worst_case_cost: f64,
    /// Objective as reported by the solver.
    pub objective_value: f64,
}

/// Maps a [`RawSolution`] back to a [`SolutionResult`].
pub struct ResultExtractor<'a> {
    scenarios: &'a ScenarioSet,
    params: &'a PlanParameters,
}

impl<'a> ResultExtractor<'a> {
    pub fn new(scenarios: &'a ScenarioSet, params: &'a PlanParameters) -> Self {
        Self { scenarios, params }
    }

    pub fn extract(&self, raw: &RawSolution) -> Result<SolutionResult, PlannerError> {
        if raw.status != SolveStatus::Optimal {
            return Err(PlannerError::SolverFailure {
                status: raw.status,
                detail: "result extraction requires an optimal solve".into(),
            });
        }

        let horizon = self.scenarios.horizon_periods();
        let dt_h = self.scenarios.period_hours();

        let capacities_mw: BTreeMap<String, f64> = self
            .params
            .technologies
            .keys()
            .map(|name| {
                (
                    name.clone(),
                    raw.value(&VarKey::Capacity { tech: name.clone() }),
                )
            })
            .collect();

        let dispatch_mw: BTreeMap<String, Vec<Vec<f64>>> = self
            .params
            .technologies
            .keys()
            .map(|name| {
                let per_scenario = self
                    .scenarios
                    .scenarios()
                    .iter()
                    .map(|scenario| {
                        (0..horizon)
                            .map(|t| {
                                raw.value(&VarKey::Dispatch {
                                    tech: name.clone(),
                                    scenario: scenario.index,
                                    period: t,
                                })
                            })
                            .collect()
                    })
                    .collect();
                (name.clone(), per_scenario)
            })
            .collect();

        let shed_mw: Vec<Vec<f64>> = self
            .scenarios
            .scenarios()
            .iter()
            .map(|scenario| {
                (0..horizon)
                    .map(|t| {
                        raw.value(&VarKey::Shed {
                            scenario: scenario.index,
                            period: t,
                        })
                    })
                    .collect()
            })
            .collect();

        // Realized operating cost per scenario, rebuilt from dispatch and
        // shed quantities rather than read off any solver expression.
        let scenario_costs: Vec<f64> = self
            .scenarios
            .scenarios()
            .iter()
            .map(|scenario| {
                let s = scenario.index;
                let dispatch_cost: f64 = self
                    .params
                    .technologies
                    .iter()
                    .map(|(name, tech)| {
                        dispatch_mw[name][s]
                            .iter()
                            .map(|&mw| mw * tech.variable_cost * dt_h)
                            .sum::<f64>()
                    })
                    .sum();
                let shed_cost: f64 = shed_mw[s]
                    .iter()
                    .map(|&mw| mw * self.params.shed_penalty * dt_h)
                    .sum();
                dispatch_cost + shed_cost
            })
            .collect();

        let expected_cost: f64 = self
            .scenarios
            .scenarios()
            .iter()
            .map(|scenario| scenario.probability * scenario_costs[scenario.index])
            .sum();

        let worst_case_cost = scenario_costs.iter().copied().fold(f64::MIN, f64::max);

        // VaR and CVaR come from the realized cost distribution, never from
        // the solver's threshold variable: with lambda = 0 that column has no
        // objective weight and the solver may park it anywhere feasible.
        let mut order: Vec<usize> = (0..scenario_costs.len()).collect();
        order.sort_by(|&a, &b| scenario_costs[a].total_cmp(&scenario_costs[b]));
        let mut cumulative = 0.0;
        let mut value_at_risk = worst_case_cost;
        for &s in &order {
            cumulative += self.scenarios.scenarios()[s].probability;
            if cumulative >= self.params.alpha - 1e-9 {
                value_at_risk = scenario_costs[s];
                break;
            }
        }
        let tail: f64 = self
            .scenarios
            .scenarios()
            .iter()
            .map(|scenario| {
                scenario.probability
                    * (scenario_costs[scenario.index] - value_at_risk).max(0.0)
            })
            .sum();
        let cvar = value_at_risk + tail / (1.0 - self.params.alpha);

        let capital_cost: f64 = self
            .params
            .technologies
            .iter()
            .map(|(name, tech)| tech.capital_cost * capacities_mw[name])
            .sum();
        let recomputed = capital_cost
            + (1.0 - self.params.lambda) * expected_cost
            + self.params.lambda * cvar;

        let relative_error =
            (recomputed - raw.objective_value).abs() / raw.objective_value.abs().max(1.0);
        if relative_error > OBJECTIVE_RELATIVE_TOLERANCE {
            return Err(PlannerError::ResultInconsistency {
                recomputed,
                reported: raw.objective_value,
                relative_error,
            });
        }

        Ok(SolutionResult {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            status: SolveStatus::Optimal,
            capacities_mw,
            dispatch_mw,
            shed_mw,
            scenario_costs,
            expected_cost,
            value_at_risk,
            cvar,
            worst_case_cost,
            objective_value: raw.objective_value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DemandPoint, DemandSeries, TechnologyParameters};
    use chrono::{Duration, TimeZone};
    use std::collections::HashMap;

    fn scenario_set() -> ScenarioSet {
        let base = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let series = DemandSeries::new(
            [100.0, 120.0, 150.0, 90.0]
                .iter()
                .enumerate()
                .map(|(i, &demand_mw)| DemandPoint {
                    timestamp: base + Duration::hours(i as i64),
                    demand_mw,
                })
                .collect(),
        )
        .unwrap();
        ScenarioSet::from_series(&series, 2, 2, 1.0).unwrap()
    }

    fn params() -> PlanParameters {
        PlanParameters {
            lambda: 0.5,
            alpha: 0.95,
            shed_penalty: 1000.0,
            allow_shed: true,
            technologies: BTreeMap::from([(
                "wind".to_string(),
                TechnologyParameters {
                    capital_cost: 100.0,
                    capacity_factors: vec![1.0, 1.0],
                    variable_cost: 2.0,
                    block_size_mw: None,
                    max_capacity_mw: None,
                },
            )]),
        }
    }

    /// Hand-checked assignment: 150 MW of wind serves every period with no
    /// shortfall; at alpha = 0.95 both VaR and CVaR land on the worse
    /// scenario's cost.
    fn raw_solution() -> RawSolution {
        let mut values: HashMap<VarKey, f64> = HashMap::new();
        values.insert(VarKey::Capacity { tech: "wind".into() }, 150.0);
        for (s, demand) in [[100.0, 120.0], [150.0, 90.0]].iter().enumerate() {
            for (t, &mw) in demand.iter().enumerate() {
                values.insert(
                    VarKey::Dispatch { tech: "wind".into(), scenario: s, period: t },
                    mw,
                );
                values.insert(VarKey::Shed { scenario: s, period: t }, 0.0);
            }
        }
        // Scenario operating costs: 2 * 220 = 440 and 2 * 240 = 480.
        values.insert(VarKey::Eta, 480.0);
        values.insert(VarKey::Excess { scenario: 0 }, 0.0);
        values.insert(VarKey::Excess { scenario: 1 }, 0.0);

        // capex 15000 + 0.5 * E[cost] (460) + 0.5 * cvar (480).
        RawSolution {
            status: SolveStatus::Optimal,
            objective_value: 15_000.0 + 0.5 * 460.0 + 0.5 * 480.0,
            values,
        }
    }

    #[test]
    fn round_trips_a_hand_checked_assignment() {
        let set = scenario_set();
        let p = params();
        let result = ResultExtractor::new(&set, &p).extract(&raw_solution()).unwrap();

        assert_eq!(result.capacities_mw["wind"], 150.0);
        assert!((result.scenario_costs[0] - 440.0).abs() < 1e-9);
        assert!((result.scenario_costs[1] - 480.0).abs() < 1e-9);
        assert!((result.expected_cost - 460.0).abs() < 1e-9);
        assert!((result.value_at_risk - 480.0).abs() < 1e-9);
        assert!((result.cvar - 480.0).abs() < 1e-9);
        assert_eq!(result.worst_case_cost, 480.0);
        assert!(result.cvar >= result.expected_cost);
    }

    #[test]
    fn cvar_ignores_a_stale_threshold_variable() {
        // With lambda = 0 the threshold column carries no objective weight,
        // so a solver is free to leave it at 0. The reported risk figures
        // must still describe the realized cost distribution.
        let set = scenario_set();
        let mut p = params();
        p.lambda = 0.0;

        let mut raw = raw_solution();
        raw.values.insert(VarKey::Eta, 0.0);
        raw.objective_value = 15_000.0 + 460.0;

        let result = ResultExtractor::new(&set, &p).extract(&raw).unwrap();
        assert!((result.value_at_risk - 480.0).abs() < 1e-9);
        assert!((result.cvar - 480.0).abs() < 1e-9);
    }

    #[test]
    fn perturbed_objective_is_rejected_as_inconsistent() {
        let set = scenario_set();
        let p = params();
        let mut raw = raw_solution();
        raw.objective_value *= 1.01;

        let err = ResultExtractor::new(&set, &p).extract(&raw).unwrap_err();
        assert!(matches!(err, PlannerError::ResultInconsistency { .. }));
    }

    #[test]
    fn non_optimal_raw_solution_is_refused() {
        let set = scenario_set();
        let p = params();
        let mut raw = raw_solution();
        raw.status = SolveStatus::TimedOut;

        let err = ResultExtractor::new(&set, &p).extract(&raw).unwrap_err();
        assert_eq!(err.solve_status(), Some(SolveStatus::TimedOut));
    }
}
