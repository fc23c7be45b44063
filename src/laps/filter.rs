use std::collections::BTreeMap;

use itertools::Itertools;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    LaptraceError,
    stats::{HampelParams, hampel, mean_std},
};

use super::{DriverLaps, GREEN_TRACK_STATUS, LapColumns};

/// Hampel settings of a filter pass.
///
/// On the wire a fixed window is `[window, threshold]`, as sent by the chart options; the object form
/// `{window, threshold}` is accepted too. `{threshold}` alone sizes the window from the laps.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum HampelFilter {
    Fixed(usize, f64),
    Params(HampelParams),
    /// Window of a fifth of the laps still included when the pass runs
    Scaled { threshold: f64 },
}

impl Default for HampelFilter {
    fn default() -> Self {
        HampelParams::default().into()
    }
}

impl From<HampelParams> for HampelFilter {
    fn from(params: HampelParams) -> Self {
        HampelFilter::Fixed(params.window, params.threshold)
    }
}

impl HampelFilter {
    /// Parameters for a pass over `included` laps.
    pub fn params(&self, included: usize) -> HampelParams {
        match *self {
            HampelFilter::Fixed(window, threshold) => HampelParams { window, threshold },
            HampelFilter::Params(params) => params,
            HampelFilter::Scaled { threshold } => HampelParams::scaled_to(included, threshold),
        }
    }
}

/// Criteria narrowing a driver's laps. A criterion left unset is not applied.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterOptions {
    /// Inclusive lap-number bounds
    pub lap_range: Option<(u32, u32)>,
    /// Inclusive lap-time bounds
    pub lap_time_range: Option<(f64, f64)>,
    /// `(driver, lap number)` pairs to exclude
    pub laps: Vec<(String, u32)>,
    /// Drop in-laps and out-laps
    pub box_laps: bool,
    /// Keep only green-flag laps
    pub track_status: bool,
    pub hampel: Option<HampelFilter>,
    /// Std-dev multiplier; laps further than this many deviations from the mean are dropped
    pub stddev: Option<f64>,
}

impl FilterOptions {
    pub fn is_empty(&self) -> bool {
        *self == FilterOptions::default()
    }
}

/// Inclusion mask over `driver`'s laps, `true` for every lap that passes all configured criteria.
///
/// Criteria are ANDed in a fixed order: lap range, lap-time range, explicit exclusions, box laps,
/// track status, Hampel, std-dev. The Hampel and std-dev passes only see the lap times still included
/// when they run.
pub fn lap_mask(
    driver: &str,
    laps: &LapColumns,
    options: &FilterOptions,
) -> Result<Vec<bool>, LaptraceError> {
    let mut mask = vec![true; laps.len()];

    if let Some((first, last)) = options.lap_range {
        mask = narrow(&mask, laps.lap_number(), |n| (first..=last).contains(n));
    }

    if let Some((fastest, slowest)) = options.lap_time_range {
        mask = narrow(&mask, laps.lap_time(), |t| *t >= fastest && *t <= slowest);
    }

    if !options.laps.is_empty() {
        mask = exclude_laps(driver, laps, &options.laps, mask);
    }

    if options.box_laps {
        let no_pit = laps
            .pit_in_time()
            .iter()
            .zip(laps.pit_out_time())
            .map(|(pit_in, pit_out)| pit_in.is_none() && pit_out.is_none())
            .collect_vec();
        mask = narrow(&mask, &no_pit, |clear| *clear);
    }

    if options.track_status {
        mask = narrow(&mask, laps.track_status(), |status| status == GREEN_TRACK_STATUS);
    }

    // laps without a lap time never pass the statistical criteria
    if options.hampel.is_some() || options.stddev.is_some() {
        mask = narrow(&mask, laps.lap_time(), |t| t.is_finite());
    }

    if let Some(filter) = options.hampel {
        let (included, lap_times) = included_lap_times(&mask, laps);
        if !included.is_empty() {
            let keep = hampel(&lap_times, filter.params(included.len()))?;
            let mut narrowed = mask.clone();
            for (idx, keep) in included.into_iter().zip(keep) {
                narrowed[idx] = narrowed[idx] && keep;
            }
            mask = narrowed;
        }
    }

    if let Some(multiplier) = options.stddev {
        let (_, lap_times) = included_lap_times(&mask, laps);
        if !lap_times.is_empty() {
            let stats = mean_std(&lap_times)?;
            mask = narrow(&mask, laps.lap_time(), |t| {
                (t - stats.mean).abs() < multiplier * stats.std
            });
        }
    }

    debug!(
        "{}: {} of {} laps pass the filter",
        driver,
        mask.iter().filter(|keep| **keep).count(),
        mask.len()
    );
    Ok(mask)
}

/// Masks for every driver in the session.
pub fn session_masks(
    laps: &DriverLaps,
    options: &FilterOptions,
) -> Result<BTreeMap<String, Vec<bool>>, LaptraceError> {
    laps.iter()
        .map(|(driver, entry)| Ok((driver.clone(), lap_mask(driver, &entry.laps, options)?)))
        .collect()
}

/// Applies `options` to every driver and keeps only the passing laps.
pub fn filter_laps(laps: &DriverLaps, options: &FilterOptions) -> Result<DriverLaps, LaptraceError> {
    laps.apply_masks(&session_masks(laps, options)?)
}

fn narrow<T, P>(mask: &[bool], column: &[T], predicate: P) -> Vec<bool>
where
    P: Fn(&T) -> bool,
{
    mask.iter()
        .zip(column)
        .map(|(keep, value)| *keep && predicate(value))
        .collect()
}

fn included_lap_times(mask: &[bool], laps: &LapColumns) -> (Vec<usize>, Vec<f64>) {
    mask.iter()
        .zip(laps.lap_time())
        .enumerate()
        .filter(|(_, (keep, _))| **keep)
        .map(|(idx, (_, lap_time))| (idx, *lap_time))
        .unzip()
}

/// Excludes rows by position: lap number `n` is assumed to live at row `n - 1`.
///
/// This only holds when lap numbers start at 1 without gaps. Mismatches are logged and the positional
/// row is still excluded.
fn exclude_laps(
    driver: &str,
    laps: &LapColumns,
    exclusions: &[(String, u32)],
    mut mask: Vec<bool>,
) -> Vec<bool> {
    for (_, lap_number) in exclusions.iter().filter(|(d, _)| d == driver) {
        let Some(row) = (*lap_number as usize).checked_sub(1) else {
            warn!("{}: ignoring exclusion of lap {}", driver, lap_number);
            continue;
        };
        match laps.lap_number().get(row) {
            Some(found) => {
                if *found != *lap_number {
                    warn!(
                        "{}: excluding row {} which holds lap {} instead of lap {}",
                        driver, row, found, lap_number
                    );
                }
                mask[row] = false;
            }
            None => warn!(
                "{}: lap {} is beyond the {} recorded laps, exclusion ignored",
                driver,
                lap_number,
                laps.len()
            ),
        }
    }
    mask
}
