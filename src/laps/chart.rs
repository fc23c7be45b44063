use std::{fmt, str::FromStr};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::LaptraceError;

use super::{
    Compound, DriverLaps, LapRecord,
    correction::{DEFAULT_MAX_LAPS, apply_fuel_correction, fuel_correction, race_trace, start_time_correction},
    filter::{FilterOptions, filter_laps, session_masks},
    stint::{StintSummaryRow, stint_summary},
};

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LapView {
    #[default]
    LapTime,
    RaceTrace,
    StintSummary,
}

impl FromStr for LapView {
    type Err = LaptraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lap-time" => Ok(LapView::LapTime),
            "race-trace" => Ok(LapView::RaceTrace),
            "stint-summary" => Ok(LapView::StintSummary),
            other => Err(LaptraceError::invalid(format!("unknown lap view {}", other))),
        }
    }
}

impl fmt::Display for LapView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LapView::LapTime => "lap-time",
            LapView::RaceTrace => "race-trace",
            LapView::StintSummary => "stint-summary",
        })
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LapChartRequest {
    /// Drivers to show; empty shows everyone
    pub drivers: Vec<String>,
    pub view: LapView,
    /// Fuel load for the fuel correction; no correction when unset
    pub fuel_load: Option<f64>,
    /// Race distance used by the fuel correction; defaults to the session's race length, at least
    /// `DEFAULT_MAX_LAPS`
    pub max_laps: Option<u32>,
    /// Laps failing these criteria are removed
    pub remove: FilterOptions,
    /// Laps failing these criteria are kept but reported as unmarked
    pub mark: Option<FilterOptions>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriverSeries {
    pub driver: String,
    pub full_name: String,
    pub color: String,
    pub lap_numbers: Vec<u32>,
    pub lap_times: Vec<f64>,
    pub compounds: Vec<Compound>,
    /// `true` where the lap passes the mark criteria (all `true` without mark criteria)
    pub marked: Vec<bool>,
    pub records: Vec<LapRecord>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "kind", content = "data")]
pub enum LapChart {
    Series(Vec<DriverSeries>),
    StintSummary(Vec<StintSummaryRow>),
}

/// Position of `driver` in the requested driver list; unrequested drivers sort last.
fn driver_rank(drivers: &[String], driver: &str) -> usize {
    drivers.iter().position(|d| d == driver).unwrap_or(usize::MAX)
}

/// Runs the lap-chart pipeline: driver selection, start-time and fuel corrections, removal filter, mark
/// filter, then the view-specific transform.
///
/// Series come out in the order of `request.drivers`. Stint rows are ranked by pace, ties in that
/// order too.
pub fn lap_chart(laps: &DriverLaps, request: &LapChartRequest) -> Result<LapChart, LaptraceError> {
    let race_length = laps.race_length();
    let mut laps = start_time_correction(&laps.select(&request.drivers)?)?;

    if let Some(fuel) = request.fuel_load {
        let max_laps = request
            .max_laps
            .unwrap_or_else(|| race_length.max(DEFAULT_MAX_LAPS));
        debug!("Applying fuel correction for {} over {} laps", fuel, max_laps);
        laps = apply_fuel_correction(&laps, &fuel_correction(max_laps, fuel)?)?;
    }

    if !request.remove.is_empty() {
        laps = filter_laps(&laps, &request.remove)?;
    }
    let marks = request
        .mark
        .as_ref()
        .map(|options| session_masks(&laps, options))
        .transpose()?;

    info!(
        "Lap chart for {} drivers with {} laps after filtering",
        laps.len(),
        laps.total_laps()
    );

    let laps = match request.view {
        LapView::StintSummary => {
            let mut rows = stint_summary(&laps)?;
            rows.sort_by(|a, b| {
                a.average_pct_off.total_cmp(&b.average_pct_off).then_with(|| {
                    driver_rank(&request.drivers, &a.driver)
                        .cmp(&driver_rank(&request.drivers, &b.driver))
                })
            });
            return Ok(LapChart::StintSummary(rows));
        }
        // a fully filtered session has nothing to trace
        LapView::RaceTrace if laps.total_laps() > 0 => race_trace(&laps)?,
        _ => laps,
    };

    let mut series: Vec<DriverSeries> = laps
        .iter()
        .map(|(driver, entry)| {
            let marked = marks
                .as_ref()
                .and_then(|m| m.get(driver).cloned())
                .unwrap_or_else(|| vec![true; entry.laps.len()]);
            DriverSeries {
                driver: driver.clone(),
                full_name: entry.full_name.clone(),
                color: entry.color.clone(),
                lap_numbers: entry.laps.lap_number().to_vec(),
                lap_times: entry.laps.lap_time().to_vec(),
                compounds: entry.laps.compound().to_vec(),
                marked,
                records: entry.laps.records(),
            }
        })
        .collect();
    series.sort_by_key(|s| driver_rank(&request.drivers, &s.driver));
    Ok(LapChart::Series(series))
}
