use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::domain::TechnologyParameters;
use crate::planner::PlanParameters;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub planner: PlannerConfig,
    pub technologies: BTreeMap<String, TechnologyParameters>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    pub base_url: String,
    /// EIA API key; normally injected via PLANNER__DATA__API_KEY.
    #[serde(default)]
    pub api_key: String,
    pub respondent: String,
    pub start: String,
    pub end: String,
    pub csv_path: PathBuf,
    pub http_timeout_seconds: u64,
}

impl DataConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }
}

fn default_allow_shed() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlannerConfig {
    pub scenario_count: usize,
    pub horizon_periods: usize,
    pub period_hours: f64,
    pub lambda: f64,
    pub alpha: f64,
    pub shed_penalty: f64,
    #[serde(default = "default_allow_shed")]
    pub allow_shed: bool,
    #[serde(default)]
    pub solver_time_limit_seconds: Option<u64>,
}

impl PlannerConfig {
    pub fn solver_time_limit(&self) -> Option<Duration> {
        self.solver_time_limit_seconds.map(Duration::from_secs)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("PLANNER__").split("__"));
        Ok(figment.extract()?)
    }

    /// Assemble the planner-facing parameter set from this configuration.
    pub fn plan_parameters(&self) -> PlanParameters {
        PlanParameters {
            lambda: self.planner.lambda,
            alpha: self.planner.alpha,
            shed_penalty: self.planner.shed_penalty,
            allow_shed: self.planner.allow_shed,
            technologies: self.technologies.clone(),
        }
    }
}
