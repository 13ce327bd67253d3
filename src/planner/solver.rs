//! Solver boundary.
//!
//! The planning core treats the numerical solver as an opaque capability:
//! it hands over an assembled program, gets back a status and a raw variable
//! assignment, and never looks inside the solving algorithm. Swapping the
//! backend means implementing [`SolverAdapter`] for something else; nothing
//! in model construction or result extraction changes.

use std::collections::HashMap;
use std::time::Duration;

use highs::{HighsModelStatus, Sense};
use tracing::debug;

use crate::error::{PlannerError, SolveStatus};
use crate::planner::model::{OptimizationProgram, VarKey};

/// Raw solver output for an optimal solve: the objective as reported by the
/// solver plus the variable assignment keyed by identity.
#[derive(Debug, Clone)]
pub struct RawSolution {
    pub status: SolveStatus,
    pub objective_value: f64,
    pub values: HashMap<VarKey, f64>,
}

impl RawSolution {
    /// Value of one variable, defaulting to zero for variables the program
    /// omitted (e.g. shed columns when shedding is disallowed).
    pub fn value(&self, key: &VarKey) -> f64 {
        self.values.get(key).copied().unwrap_or(0.0)
    }
}

/// Narrow interface to an LP/MILP solver backend.
///
/// A non-`Optimal` outcome is an error, never a degraded answer: the adapter
/// does not retry with different parameters, it reports the status and lets
/// the caller decide.
pub trait SolverAdapter {
    fn solve(
        &self,
        program: OptimizationProgram,
        time_limit: Option<Duration>,
    ) -> Result<RawSolution, PlannerError>;
}

/// [`SolverAdapter`] backed by the HiGHS simplex / branch-and-bound solver.
#[derive(Debug, Clone, Default)]
pub struct HighsSolver {
    /// Forward HiGHS log output to stdout. Off by default; the planner logs
    /// through `tracing` instead.
    pub verbose: bool,
}

impl SolverAdapter for HighsSolver {
    fn solve(
        &self,
        program: OptimizationProgram,
        time_limit: Option<Duration>,
    ) -> Result<RawSolution, PlannerError> {
        let (problem, columns) = program.into_parts();
        debug!(columns = columns.len(), "handing program to HiGHS");

        let mut model = problem.optimise(Sense::Minimise);
        model.set_option("output_flag", self.verbose);
        if let Some(limit) = time_limit {
            model.set_option("time_limit", limit.as_secs_f64());
        }

        let solved = model.try_solve().map_err(|status| PlannerError::SolverFailure {
            status: SolveStatus::SolverError,
            detail: format!("solver rejected the model: {status:?}"),
        })?;

        match solved.status() {
            HighsModelStatus::Optimal => {}
            HighsModelStatus::Infeasible => {
                return Err(PlannerError::SolverFailure {
                    status: SolveStatus::Infeasible,
                    detail: "no feasible assignment satisfies the constraints".into(),
                });
            }
            HighsModelStatus::Unbounded | HighsModelStatus::UnboundedOrInfeasible => {
                return Err(PlannerError::SolverFailure {
                    status: SolveStatus::Unbounded,
                    detail: "objective is unbounded below".into(),
                });
            }
            HighsModelStatus::ReachedTimeLimit => {
                return Err(PlannerError::SolverFailure {
                    status: SolveStatus::TimedOut,
                    detail: format!("time limit {time_limit:?} reached before optimality"),
                });
            }
            other => {
                return Err(PlannerError::SolverFailure {
                    status: SolveStatus::SolverError,
                    detail: format!("unexpected solver status {other:?}"),
                });
            }
        }

        let solution = solved.get_solution();
        let values: HashMap<VarKey, f64> = columns
            .into_iter()
            .zip(solution.columns().iter().copied())
            .collect();

        Ok(RawSolution {
            status: SolveStatus::Optimal,
            objective_value: solved.objective_value(),
            values,
        })
    }
}
