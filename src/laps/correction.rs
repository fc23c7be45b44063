//! Lap-time corrections: start-time recomputation, fuel load and race-trace normalization.
//!
//! Each transform returns a new [`DriverLaps`] whose only changed column is `LapTime`.

use std::collections::BTreeMap;

use log::debug;

use crate::LaptraceError;

use super::DriverLaps;

/// Lap-time penalty per unit of fuel load on the opening lap, in milliseconds.
pub const FUEL_TIME_COEFFICIENT: f64 = 32.0;
pub const DEFAULT_FUEL_LOAD: f64 = 100.0;
pub const MAX_FUEL_LOAD: f64 = 200.0;
pub const DEFAULT_MAX_LAPS: u32 = 50;

/// Recomputes every lap time as `Time - LapStartTime`.
pub fn start_time_correction(laps: &DriverLaps) -> Result<DriverLaps, LaptraceError> {
    laps.map_lap_times(|_, cols| {
        Ok(cols
            .time()
            .iter()
            .zip(cols.lap_start_time())
            .map(|(end, start)| end - start)
            .collect())
    })
}

/// Per-lap fuel correction for a race of `max_lap` laps.
///
/// Entry `i` is `32 * fuel * (1 - (i + 1) / max_lap)`, so the last lap carries no correction.
pub fn fuel_correction(max_lap: u32, fuel: f64) -> Result<Vec<f64>, LaptraceError> {
    if max_lap == 0 {
        return Err(LaptraceError::division_by_zero("fuel correction"));
    }
    if !(0.0..=MAX_FUEL_LOAD).contains(&fuel) {
        return Err(LaptraceError::invalid(format!(
            "fuel load must be within 0 and {}, got {}",
            MAX_FUEL_LOAD, fuel
        )));
    }
    let total = FUEL_TIME_COEFFICIENT * fuel;
    Ok((0..max_lap)
        .map(|i| total * (1.0 - (i + 1) as f64 / max_lap as f64))
        .collect())
}

/// Subtracts `correction` from each driver's lap times, matched by row position.
pub fn apply_fuel_correction(
    laps: &DriverLaps,
    correction: &[f64],
) -> Result<DriverLaps, LaptraceError> {
    laps.map_lap_times(|driver, cols| {
        if cols.len() > correction.len() {
            return Err(LaptraceError::invalid(format!(
                "{} has {} laps but the fuel correction only covers {}",
                driver,
                cols.len(),
                correction.len()
            )));
        }
        Ok(cols
            .lap_time()
            .iter()
            .zip(correction)
            .map(|(lap_time, fix)| lap_time - fix)
            .collect())
    })
}

/// Baseline session time per lap number for the race trace.
///
/// The baseline runs in a straight line from the earliest lap start (lowest first lap number, then
/// earliest start) to the end of the last lap (highest last lap number, then earliest finish).
pub fn normalization(laps: &DriverLaps) -> Result<BTreeMap<u32, f64>, LaptraceError> {
    let firsts = laps
        .iter()
        .filter_map(|(_, entry)| Some((*entry.laps.lap_number().first()?, *entry.laps.lap_start_time().first()?)));
    let lasts = laps
        .iter()
        .filter_map(|(_, entry)| Some((*entry.laps.lap_number().last()?, *entry.laps.time().last()?)));

    let (min_lap, min_time) = firsts
        .min_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)))
        .ok_or_else(|| LaptraceError::empty("race trace normalization"))?;
    let (max_lap, max_time) = lasts
        .min_by(|a, b| b.0.cmp(&a.0).then(a.1.total_cmp(&b.1)))
        .ok_or_else(|| LaptraceError::empty("race trace normalization"))?;

    if max_lap < min_lap {
        return Err(LaptraceError::invalid(format!(
            "last lap {} precedes first lap {}",
            max_lap, min_lap
        )));
    }
    let lap_count = max_lap - min_lap + 1;
    let slope = (max_time - min_time) / lap_count as f64;
    debug!(
        "Race trace baseline from lap {} at {} to lap {} at {}, {} per lap",
        min_lap, min_time, max_lap, max_time, slope
    );
    Ok((0..lap_count)
        .map(|i| (min_lap + i, min_time + slope * (i + 1) as f64))
        .collect())
}

/// Stores `Time - baseline(LapNumber)` in `LapTime` for the race-trace view.
pub fn race_trace(laps: &DriverLaps) -> Result<DriverLaps, LaptraceError> {
    let baseline = normalization(laps)?;
    laps.map_lap_times(|driver, cols| {
        cols.lap_number()
            .iter()
            .zip(cols.time())
            .map(|(lap_number, time)| {
                baseline
                    .get(lap_number)
                    .map(|base| time - base)
                    .ok_or_else(|| {
                        LaptraceError::invalid(format!(
                            "{} lap {} is outside the race trace baseline",
                            driver, lap_number
                        ))
                    })
            })
            .collect()
    })
}
