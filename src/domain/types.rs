use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed demand sample from the historical series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandPoint {
    pub timestamp: DateTime<Utc>,
    pub demand_mw: f64,
}

/// Time-ordered historical demand series.
///
/// Construction validates the external-interface contract: demand values are
/// non-negative and timestamps are strictly increasing. Everything downstream
/// (scenario construction in particular) relies on both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandSeries {
    points: Vec<DemandPoint>,
}

impl DemandSeries {
    pub fn new(points: Vec<DemandPoint>) -> Result<Self> {
        for pair in points.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                anyhow::bail!(
                    "demand series timestamps must be strictly increasing ({} followed by {})",
                    pair[0].timestamp,
                    pair[1].timestamp
                );
            }
        }
        if let Some(p) = points.iter().find(|p| !p.demand_mw.is_finite() || p.demand_mw < 0.0) {
            anyhow::bail!(
                "demand series contains invalid value {} at {}",
                p.demand_mw,
                p.timestamp
            );
        }
        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[DemandPoint] {
        &self.points
    }

    /// Demand values in time order, dropping timestamps.
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.demand_mw).collect()
    }
}

/// Technical and economic parameters for one generation technology.
///
/// `capacity_factors` is a repeating availability profile (e.g. a diurnal
/// solar shape); it is cycled modulo its length across the planning horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnologyParameters {
    /// Capital cost per MW of installed capacity, amortized over the horizon.
    pub capital_cost: f64,
    /// Per-period fraction of nameplate output available.
    pub capacity_factors: Vec<f64>,
    /// Variable operating cost per MWh dispatched. Zero for most renewables.
    #[serde(default)]
    pub variable_cost: f64,
    /// If set, installed capacity must be an integer multiple of this block.
    #[serde(default)]
    pub block_size_mw: Option<f64>,
    /// If set, installed capacity may not exceed this bound.
    #[serde(default)]
    pub max_capacity_mw: Option<f64>,
}

impl TechnologyParameters {
    /// Capacity factor for a horizon period, cycling the profile.
    pub fn capacity_factor(&self, period: usize) -> f64 {
        self.capacity_factors[period % self.capacity_factors.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(hour: u32, demand_mw: f64) -> DemandPoint {
        DemandPoint {
            timestamp: Utc.with_ymd_and_hms(2023, 1, 1, hour, 0, 0).unwrap(),
            demand_mw,
        }
    }

    #[test]
    fn accepts_ordered_non_negative_series() {
        let series = DemandSeries::new(vec![point(0, 100.0), point(1, 0.0), point(2, 80.5)]);
        assert_eq!(series.unwrap().len(), 3);
    }

    #[test]
    fn rejects_non_increasing_timestamps() {
        let err = DemandSeries::new(vec![point(1, 100.0), point(1, 90.0)]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_negative_demand() {
        let err = DemandSeries::new(vec![point(0, 100.0), point(1, -5.0)]);
        assert!(err.is_err());
    }

    #[test]
    fn capacity_factor_profile_cycles() {
        let tech = TechnologyParameters {
            capital_cost: 100.0,
            capacity_factors: vec![0.3, 0.5],
            variable_cost: 0.0,
            block_size_mw: None,
            max_capacity_mw: None,
        };
        assert_eq!(tech.capacity_factor(0), 0.3);
        assert_eq!(tech.capacity_factor(1), 0.5);
        assert_eq!(tech.capacity_factor(2), 0.3);
        assert_eq!(tech.capacity_factor(5), 0.5);
    }
}
