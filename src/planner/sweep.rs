//! Risk-aversion parameter sweeps.
//!
//! Independent solves share no mutable state, so a sweep over lambda is run
//! as one blocking task per value and collected as the tasks finish.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinSet;
use tracing::info;

use crate::domain::ScenarioSet;
use crate::planner::model::{ModelBuilder, PlanParameters};
use crate::planner::result::{ResultExtractor, SolutionResult};
use crate::planner::solver::{HighsSolver, SolverAdapter};

/// Solve the same planning problem once per lambda value.
///
/// Results come back sorted by lambda. Any single failing solve fails the
/// whole sweep; a partially silent sweep would invite comparing plans that
/// were never actually computed.
pub async fn sweep_lambda(
    scenarios: Arc<ScenarioSet>,
    params: Arc<PlanParameters>,
    lambdas: Vec<f64>,
    time_limit: Option<Duration>,
) -> Result<Vec<(f64, SolutionResult)>> {
    let mut tasks = JoinSet::new();
    for lambda in lambdas {
        let scenarios = Arc::clone(&scenarios);
        let params = Arc::clone(&params);
        tasks.spawn_blocking(move || {
            let mut params = (*params).clone();
            params.lambda = lambda;
            let program = ModelBuilder::new(&scenarios, &params)?.build();
            let raw = HighsSolver::default().solve(program, time_limit)?;
            let result = ResultExtractor::new(&scenarios, &params).extract(&raw)?;
            Ok::<_, crate::error::PlannerError>((lambda, result))
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (lambda, result) = joined.context("sweep worker panicked")??;
        info!(lambda, expected_cost = result.expected_cost, cvar = result.cvar, "sweep point solved");
        results.push((lambda, result));
    }
    results.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(results)
}
