use serde::{Deserialize, Serialize};

use crate::{LaptraceError, stats::group_by};

use super::{Compound, DriverLaps};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StintSummaryRow {
    pub driver: String,
    pub stint: u32,
    pub stint_name: String,
    /// Compound fitted at the end of the stint
    pub compound: Compound,
    pub first_lap_number: u32,
    pub last_lap_number: u32,
    pub number_of_laps: usize,
    pub average_lap_time: f64,
    /// Percentage slower than the fastest stint of the session
    pub average_pct_off: f64,
}

/// Summarizes every stint of every driver, sorted from the fastest stint to the slowest.
///
/// A session without laps summarizes to no rows.
pub fn stint_summary(laps: &DriverLaps) -> Result<Vec<StintSummaryRow>, LaptraceError> {
    let mut rows = Vec::new();
    for (driver, entry) in laps.iter() {
        let cols = &entry.laps;
        for (stint, indexes) in group_by(0..cols.len(), |i| cols.stint()[*i]) {
            let first = indexes[0];
            let last = indexes[indexes.len() - 1];
            let total: f64 = indexes.iter().map(|i| cols.lap_time()[*i]).sum();
            rows.push(StintSummaryRow {
                driver: driver.clone(),
                stint,
                stint_name: format!("{}-S{}", driver, stint),
                compound: cols.compound()[last],
                first_lap_number: cols.lap_number()[first],
                last_lap_number: cols.lap_number()[last],
                number_of_laps: indexes.len(),
                average_lap_time: total / indexes.len() as f64,
                average_pct_off: 0.0,
            });
        }
    }

    let Some(fastest) = rows
        .iter()
        .map(|row| row.average_lap_time)
        .min_by(|a, b| a.total_cmp(b))
    else {
        return Ok(rows);
    };
    if fastest == 0.0 {
        return Err(LaptraceError::division_by_zero("stint percentage off fastest"));
    }

    for row in rows.iter_mut() {
        row.average_pct_off = (row.average_lap_time / fastest - 1.0) * 100.0;
    }
    rows.sort_by(|a, b| a.average_pct_off.total_cmp(&b.average_pct_off));
    Ok(rows)
}
