//! Two-stage stochastic program assembly.
//!
//! First stage: one installed-capacity variable per technology, fixed before
//! demand uncertainty resolves. Second stage: per scenario and period, a
//! dispatch variable per technology plus an unserved-demand (shed) variable.
//! The two stages share state only through the capacity variables.
//!
//! Tail risk enters through the Rockafellar-Uryasev linearization of CVaR at
//! confidence `alpha`: an auxiliary threshold variable `eta` and per-scenario
//! excess variables `z_s >= cost_s - eta`, `z_s >= 0`. Minimizing
//! `eta + (1 / (1 - alpha)) * E[z]` over `eta` reproduces CVaR exactly, so
//! the non-smooth risk measure becomes a set of linear rows.

use std::collections::{BTreeMap, HashMap};

use highs::{Col, RowProblem};
use serde::{Deserialize, Serialize};

use crate::domain::{ScenarioSet, TechnologyParameters};
use crate::error::PlannerError;

fn default_allow_shed() -> bool {
    true
}

/// Risk and cost configuration for one plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanParameters {
    /// Risk-aversion weight in [0, 1]: 0 = pure expected cost, 1 = pure CVaR.
    pub lambda: f64,
    /// CVaR confidence level in (0, 1), e.g. 0.95.
    pub alpha: f64,
    /// Penalty per MWh of unserved demand.
    pub shed_penalty: f64,
    /// When false, shed variables are omitted and demand becomes a hard
    /// constraint. Used to probe feasibility of a no-shortfall design.
    #[serde(default = "default_allow_shed")]
    pub allow_shed: bool,
    /// Technologies eligible for investment, keyed by name. A `BTreeMap`
    /// keeps variable ordering deterministic across runs.
    pub technologies: BTreeMap<String, TechnologyParameters>,
}

/// Identity of one decision variable in the assembled program.
///
/// The solver boundary reports its raw assignment keyed by these, so result
/// extraction never depends on solver-internal column numbering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarKey {
    /// First stage: installed capacity of `tech`, MW.
    Capacity { tech: String },
    /// First stage: integer block count backing a quantized capacity.
    Blocks { tech: String },
    /// Second stage: dispatched output of `tech`, MW.
    Dispatch {
        tech: String,
        scenario: usize,
        period: usize,
    },
    /// Second stage: unserved demand, MW.
    Shed { scenario: usize, period: usize },
    /// CVaR auxiliary: value-at-risk threshold.
    Eta,
    /// CVaR auxiliary: cost excess over `eta` in one scenario.
    Excess { scenario: usize },
}

/// Fully assembled linear/mixed-integer program.
///
/// Built once, then moved into the solver boundary by value; nothing mutates
/// it after hand-off. `columns` records variable identities in insertion
/// order, which is the order the solver reports values in.
pub struct OptimizationProgram {
    problem: RowProblem,
    columns: Vec<VarKey>,
}

impl OptimizationProgram {
    /// Variable identities in solver column order.
    pub fn columns(&self) -> &[VarKey] {
        &self.columns
    }

    pub(crate) fn into_parts(self) -> (RowProblem, Vec<VarKey>) {
        (self.problem, self.columns)
    }
}

/// Assembles an [`OptimizationProgram`] from a scenario set and parameters.
///
/// Parameter validation happens in [`ModelBuilder::new`], before any part of
/// the program is constructed; out-of-range inputs are never clamped.
#[derive(Debug)]
pub struct ModelBuilder<'a> {
    scenarios: &'a ScenarioSet,
    params: &'a PlanParameters,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(
        scenarios: &'a ScenarioSet,
        params: &'a PlanParameters,
    ) -> Result<Self, PlannerError> {
        validate_parameters(scenarios, params)?;
        Ok(Self { scenarios, params })
    }

    pub fn build(&self) -> OptimizationProgram {
        let params = self.params;
        let scenarios = self.scenarios.scenarios();
        let horizon = self.scenarios.horizon_periods();
        let dt_h = self.scenarios.period_hours();
        let lambda = params.lambda;

        let mut problem = RowProblem::default();
        let mut columns: Vec<VarKey> = Vec::new();
        let mut cols: HashMap<VarKey, Col> = HashMap::new();

        fn add_col(
            columns: &mut Vec<VarKey>,
            cols: &mut HashMap<VarKey, Col>,
            key: VarKey,
            col: Col,
        ) {
            columns.push(key.clone());
            cols.insert(key, col);
        }

        // First stage: capacity per technology, objective carries capex.
        for (name, tech) in &params.technologies {
            let col = match tech.max_capacity_mw {
                Some(max) => problem.add_column(tech.capital_cost, 0.0..=max),
                None => problem.add_column(tech.capital_cost, 0.0..),
            };
            add_col(
                &mut columns,
                &mut cols,
                VarKey::Capacity { tech: name.clone() },
                col,
            );

            if tech.block_size_mw.is_some() {
                let blocks = problem.add_integer_column(0.0, 0.0..);
                add_col(
                    &mut columns,
                    &mut cols,
                    VarKey::Blocks { tech: name.clone() },
                    blocks,
                );
            }
        }

        // Second stage: dispatch and shed per scenario and period. Expected
        // operating cost enters the objective through the column coefficients,
        // discounted by the scenario probability and the (1 - lambda) weight.
        for scenario in scenarios {
            let s = scenario.index;
            let expectation = (1.0 - lambda) * scenario.probability;
            for t in 0..horizon {
                for (name, tech) in &params.technologies {
                    let col =
                        problem.add_column(expectation * tech.variable_cost * dt_h, 0.0..);
                    add_col(
                        &mut columns,
                        &mut cols,
                        VarKey::Dispatch {
                            tech: name.clone(),
                            scenario: s,
                            period: t,
                        },
                        col,
                    );
                }
                if params.allow_shed {
                    let col =
                        problem.add_column(expectation * params.shed_penalty * dt_h, 0.0..);
                    add_col(
                        &mut columns,
                        &mut cols,
                        VarKey::Shed {
                            scenario: s,
                            period: t,
                        },
                        col,
                    );
                }
            }
        }

        // CVaR auxiliaries. Scenario costs are non-negative here, so eta can
        // be bounded below by zero without cutting off the optimum.
        let eta = problem.add_column(lambda, 0.0..);
        add_col(&mut columns, &mut cols, VarKey::Eta, eta);
        for scenario in scenarios {
            let tail_weight = lambda * scenario.probability / (1.0 - params.alpha);
            let col = problem.add_column(tail_weight, 0.0..);
            add_col(
                &mut columns,
                &mut cols,
                VarKey::Excess {
                    scenario: scenario.index,
                },
                col,
            );
        }

        // Capacity bound: dispatch[i, s, t] - cf_i(t) * capacity_i <= 0.
        for (name, tech) in &params.technologies {
            let capacity = cols[&VarKey::Capacity { tech: name.clone() }];
            for scenario in scenarios {
                for t in 0..horizon {
                    let dispatch = cols[&VarKey::Dispatch {
                        tech: name.clone(),
                        scenario: scenario.index,
                        period: t,
                    }];
                    problem.add_row(
                        ..=0.0,
                        [(dispatch, 1.0), (capacity, -tech.capacity_factor(t))],
                    );
                }
            }

            // Quantized capacity: capacity_i - block * n_i = 0, n_i integer.
            if let Some(block) = tech.block_size_mw {
                let blocks = cols[&VarKey::Blocks { tech: name.clone() }];
                problem.add_row(0.0..=0.0, [(capacity, 1.0), (blocks, -block)]);
            }
        }

        // Demand balance: sum_i dispatch + shed = demand, per scenario/period.
        for scenario in scenarios {
            for (t, &demand) in scenario.demand.iter().enumerate() {
                let mut terms: Vec<(Col, f64)> = params
                    .technologies
                    .keys()
                    .map(|name| {
                        (
                            cols[&VarKey::Dispatch {
                                tech: name.clone(),
                                scenario: scenario.index,
                                period: t,
                            }],
                            1.0,
                        )
                    })
                    .collect();
                if params.allow_shed {
                    terms.push((
                        cols[&VarKey::Shed {
                            scenario: scenario.index,
                            period: t,
                        }],
                        1.0,
                    ));
                }
                problem.add_row(demand..=demand, terms);
            }
        }

        // CVaR excess: z_s + eta - cost_s >= 0, where cost_s is the scenario's
        // operating cost (dispatch cost plus shed penalty). Capital cost is a
        // first-stage quantity and stays out of the tail measure.
        for scenario in scenarios {
            let s = scenario.index;
            let mut terms: Vec<(Col, f64)> = vec![
                (cols[&VarKey::Excess { scenario: s }], 1.0),
                (eta, 1.0),
            ];
            for (name, tech) in &params.technologies {
                if tech.variable_cost == 0.0 {
                    continue;
                }
                for t in 0..horizon {
                    terms.push((
                        cols[&VarKey::Dispatch {
                            tech: name.clone(),
                            scenario: s,
                            period: t,
                        }],
                        -tech.variable_cost * dt_h,
                    ));
                }
            }
            if params.allow_shed {
                for t in 0..horizon {
                    terms.push((
                        cols[&VarKey::Shed {
                            scenario: s,
                            period: t,
                        }],
                        -params.shed_penalty * dt_h,
                    ));
                }
            }
            problem.add_row(0.0.., terms);
        }

        OptimizationProgram { problem, columns }
    }
}

fn validate_parameters(
    scenarios: &ScenarioSet,
    params: &PlanParameters,
) -> Result<(), PlannerError> {
    scenarios.validate()?;

    if !(params.lambda >= 0.0 && params.lambda <= 1.0) {
        return Err(PlannerError::InvalidParameter(format!(
            "lambda must lie in [0, 1], got {}",
            params.lambda
        )));
    }
    if !(params.alpha > 0.0 && params.alpha < 1.0) {
        return Err(PlannerError::InvalidParameter(format!(
            "alpha must lie in (0, 1), got {}",
            params.alpha
        )));
    }
    if !(params.shed_penalty.is_finite() && params.shed_penalty > 0.0) {
        return Err(PlannerError::InvalidParameter(format!(
            "shed penalty must be positive, got {}",
            params.shed_penalty
        )));
    }
    if params.technologies.is_empty() {
        return Err(PlannerError::InvalidParameter(
            "at least one technology is required".into(),
        ));
    }
    for (name, tech) in &params.technologies {
        if tech.capacity_factors.is_empty() {
            return Err(PlannerError::InvalidParameter(format!(
                "technology '{name}' has an empty capacity factor profile"
            )));
        }
        // A technology that can never produce makes its capacity decision
        // meaningless and almost certainly indicates a data bug.
        if !tech.capacity_factors.iter().any(|&cf| cf > 0.0) {
            return Err(PlannerError::InvalidParameter(format!(
                "technology '{name}' has no period with a positive capacity factor"
            )));
        }
        if !(tech.capital_cost.is_finite() && tech.capital_cost >= 0.0) {
            return Err(PlannerError::InvalidParameter(format!(
                "technology '{name}' has invalid capital cost {}",
                tech.capital_cost
            )));
        }
        if !(tech.variable_cost.is_finite() && tech.variable_cost >= 0.0) {
            return Err(PlannerError::InvalidParameter(format!(
                "technology '{name}' has invalid variable cost {}",
                tech.variable_cost
            )));
        }
        if let Some(block) = tech.block_size_mw {
            if !(block.is_finite() && block > 0.0) {
                return Err(PlannerError::InvalidParameter(format!(
                    "technology '{name}' has invalid block size {block}"
                )));
            }
        }
        if let Some(max) = tech.max_capacity_mw {
            if !(max.is_finite() && max >= 0.0) {
                return Err(PlannerError::InvalidParameter(format!(
                    "technology '{name}' has invalid max capacity {max}"
                )));
            }
        }
    }
    Ok(())
}
