//! Split points along a lap and per-segment time comparison.

use itertools::Itertools;
use log::debug;

use crate::{LaptraceError, stats::rolling_mean};

use super::{
    Channel, LapTel,
    diff::{col_max_inds, ms_to_seconds},
};

/// Values of the fastest-lap series are bucketed into halves of this width.
const SPEED_BUCKET_WIDTH: f64 = 0.5;
const SPEED_BUCKET_CAP: f64 = 0.999;

/// Interior split indexes dividing `distance` into `count` segments of equal length.
///
/// Each boundary sits on the first sample whose distance exceeds a multiple of `total / count`.
/// Boundaries with no such sample are skipped and boundaries landing on the same sample collapse.
pub fn equal_segments(distance: &[f64], count: usize) -> Result<Vec<usize>, LaptraceError> {
    if count == 0 {
        return Err(LaptraceError::invalid("segment count must be at least 1"));
    }
    let total = *distance.last().ok_or_else(|| LaptraceError::empty("equal segments"))?;
    let step = total / count as f64;
    let splits = (1..count)
        .filter_map(|k| {
            let threshold = step * k as f64;
            distance.iter().position(|d| *d > threshold)
        })
        .dedup()
        .collect_vec();
    debug!("{} equal segments split at {:?}", count, splits);
    Ok(splits)
}

/// Split indexes where the lap holding the highest speed changes.
///
/// The per-sample fastest-lap index is optionally smoothed, capped just below 1 and bucketed into
/// halves; a split is emitted wherever the bucket differs from the previous sample.
pub fn speed_change_segments(
    lap_tel: &LapTel,
    rolling: Option<usize>,
) -> Result<Vec<usize>, LaptraceError> {
    let fastest = col_max_inds(lap_tel, Channel::Speed)?
        .into_iter()
        .map(|lap| lap as f64)
        .collect_vec();
    let fastest = match rolling {
        Some(window) => rolling_mean(&fastest, window)?,
        None => fastest,
    };
    let buckets = fastest
        .iter()
        .map(|v| (v.min(SPEED_BUCKET_CAP) / SPEED_BUCKET_WIDTH).floor() as i64)
        .collect_vec();
    Ok(buckets
        .iter()
        .tuple_windows()
        .positions(|(prev, cur)| prev != cur)
        .map(|pos| pos + 1)
        .collect())
}

/// Per-sample difference of segment times, `lap2 - lap1`, in seconds.
///
/// Segments run between consecutive boundaries of `[0, splits..., last sample]`. Each segment's value
/// covers its samples from its start boundary up to the next; the last sample repeats the value
/// before it.
pub fn section_time_diffs(
    lap_tel: &LapTel,
    splits: &[usize],
    lap1: usize,
    lap2: usize,
) -> Result<Vec<f64>, LaptraceError> {
    let first = lap_tel.channel(lap1, Channel::Time)?;
    let second = lap_tel.channel(lap2, Channel::Time)?;
    let samples = first.len();
    if samples < 2 {
        return Err(LaptraceError::invalid(format!(
            "section times need at least two samples, got {}",
            samples
        )));
    }
    let last = samples - 1;
    if let Some(bad) = splits.iter().find(|s| **s == 0 || **s >= last) {
        return Err(LaptraceError::invalid(format!(
            "split {} is not inside the lap of {} samples",
            bad, samples
        )));
    }
    if !splits.iter().tuple_windows().all(|(a, b)| a < b) {
        return Err(LaptraceError::invalid("split points must be strictly increasing"));
    }

    let boundaries = std::iter::once(0)
        .chain(splits.iter().copied())
        .chain(std::iter::once(last))
        .collect_vec();
    let mut diffs = Vec::with_capacity(samples);
    for (start, end) in boundaries.iter().tuple_windows() {
        let lap1_time = first[*end] - first[*start];
        let lap2_time = second[*end] - second[*start];
        let delta = ms_to_seconds(lap2_time - lap1_time);
        diffs.extend(std::iter::repeat_n(delta, end - start));
    }
    diffs.push(diffs[last - 1]);
    Ok(diffs)
}

/// Positions of `splits` along `axis`, for drawing segment boundaries.
pub fn split_positions(axis: &[f64], splits: &[usize]) -> Result<Vec<f64>, LaptraceError> {
    splits
        .iter()
        .map(|s| {
            axis.get(*s).copied().ok_or_else(|| {
                LaptraceError::invalid(format!("split {} is past the last of {} samples", s, axis.len()))
            })
        })
        .collect()
}
