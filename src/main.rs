use anyhow::Result;
use capacity_planner::config::Config;
use capacity_planner::data::{load_series, save_series, DemandProvider, EiaDemandProvider};
use capacity_planner::domain::{DemandSeries, ScenarioSet};
use capacity_planner::error::PlannerError;
use capacity_planner::planner::{HighsSolver, ModelBuilder, ResultExtractor, SolverAdapter};
use capacity_planner::{report, telemetry};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let cfg = Config::load()?;

    let series = load_or_fetch_series(&cfg).await?;
    info!(periods = series.len(), "demand series ready");

    let scenarios = ScenarioSet::from_series(
        &series,
        cfg.planner.scenario_count,
        cfg.planner.horizon_periods,
        cfg.planner.period_hours,
    )?;
    info!(
        scenarios = scenarios.len(),
        horizon = scenarios.horizon_periods(),
        "scenario set constructed"
    );

    let params = cfg.plan_parameters();
    let time_limit = cfg.planner.solver_time_limit();
    let result = tokio::task::spawn_blocking(move || -> Result<_, PlannerError> {
        let program = ModelBuilder::new(&scenarios, &params)?.build();
        let raw = HighsSolver::default().solve(program, time_limit)?;
        ResultExtractor::new(&scenarios, &params).extract(&raw)
    })
    .await??;

    info!(
        expected_cost = result.expected_cost,
        cvar = result.cvar,
        "plan solved"
    );
    println!("{}", report::render(&result));
    Ok(())
}

/// Use the local CSV copy if present; otherwise fetch from EIA and save it.
async fn load_or_fetch_series(cfg: &Config) -> Result<DemandSeries> {
    if cfg.data.csv_path.exists() {
        info!(path = %cfg.data.csv_path.display(), "loading demand series from disk");
        return load_series(&cfg.data.csv_path);
    }

    if cfg.data.api_key.is_empty() {
        anyhow::bail!(
            "no cached series at {} and PLANNER__DATA__API_KEY is not set; \
             provide an EIA API key or a pre-fetched CSV",
            cfg.data.csv_path.display()
        );
    }

    let provider = EiaDemandProvider::new(
        cfg.data.base_url.clone(),
        cfg.data.api_key.clone(),
        cfg.data.respondent.clone(),
        cfg.data.http_timeout(),
    )?;
    let series = provider.fetch_demand(&cfg.data.start, &cfg.data.end).await?;
    save_series(&cfg.data.csv_path, &series)?;
    Ok(series)
}
