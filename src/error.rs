use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Terminal outcome reported by the solver for one solve attempt.
///
/// Anything other than `Optimal` is surfaced to the caller as a
/// [`PlannerError::SolverFailure`]; the planner never retries on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    TimedOut,
    SolverError,
}

/// Error taxonomy for the planning core.
///
/// Every variant is raised at the point of detection and propagated
/// unmodified. None of these are recoverable inside the core: masking any
/// of them would turn into a wrong capacity recommendation downstream.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error(
        "insufficient data: series has {available} periods, need {required} \
         ({scenarios} scenarios x {horizon} periods)"
    )]
    InsufficientData {
        available: usize,
        required: usize,
        scenarios: usize,
        horizon: usize,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(
        "solver result inconsistent: recomputed objective {recomputed} vs \
         reported {reported} (relative error {relative_error:.3e})"
    )]
    ResultInconsistency {
        recomputed: f64,
        reported: f64,
        relative_error: f64,
    },

    #[error("solver failed with status '{status}': {detail}")]
    SolverFailure { status: SolveStatus, detail: String },
}

impl PlannerError {
    /// The solve status behind this error, if it came from the solver.
    pub fn solve_status(&self) -> Option<SolveStatus> {
        match self {
            PlannerError::SolverFailure { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_render_in_snake_case() {
        assert_eq!(SolveStatus::TimedOut.to_string(), "timed_out");
        assert_eq!(SolveStatus::Optimal.to_string(), "optimal");
    }

    #[test]
    fn solve_status_is_exposed_only_for_solver_failures() {
        let failure = PlannerError::SolverFailure {
            status: SolveStatus::Infeasible,
            detail: "no feasible assignment".into(),
        };
        assert_eq!(failure.solve_status(), Some(SolveStatus::Infeasible));
        assert_eq!(
            PlannerError::InvalidParameter("alpha".into()).solve_status(),
            None
        );
    }

    #[test]
    fn insufficient_data_message_names_the_shortfall() {
        let err = PlannerError::InsufficientData {
            available: 3,
            required: 4,
            scenarios: 2,
            horizon: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("3 periods"));
        assert!(msg.contains("need 4"));
    }
}
