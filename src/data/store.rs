//! CSV persistence for fetched demand series.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::domain::{DemandPoint, DemandSeries};

/// Write a demand series as `timestamp,demand_mw` rows, creating any
/// missing parent directories first.
pub fn save_series(path: &Path, series: &DemandSeries) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    for point in series.points() {
        writer.serialize(point)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = series.len(), "saved demand series");
    Ok(())
}

/// Load a demand series saved by [`save_series`], re-validating it.
pub fn load_series(path: &Path) -> Result<DemandSeries> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    let points = reader
        .deserialize::<DemandPoint>()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("malformed demand CSV {}", path.display()))?;
    DemandSeries::new(points)
}
