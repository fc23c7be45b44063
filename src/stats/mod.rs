//! Numeric helpers shared by the lap and telemetry analysis.
//!
//! All helpers work on `f64` slices and never mutate their input.

pub mod hampel;

use std::{collections::HashMap, hash::Hash};

use serde::{Deserialize, Serialize};

use crate::LaptraceError;

pub use hampel::{DEFAULT_HAMPEL_THRESHOLD, DEFAULT_HAMPEL_WINDOW, HampelParams, hampel};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct MeanStd {
    pub mean: f64,
    pub std: f64,
}

/// Applies `window_fn` to a sliding window of `k` samples and returns one value per input sample.
///
/// The window for output `j` ends (exclusive) at cursor `j + k / 2 + 1`, so windows are roughly centered.
/// Windows at both ends are shorter than `k`; no padding is applied. Every window holds at least one
/// sample when `k >= 1`.
pub fn rolling<F>(seq: &[f64], k: usize, mut window_fn: F) -> Result<Vec<f64>, LaptraceError>
where
    F: FnMut(&[f64]) -> f64,
{
    if k == 0 {
        return Err(LaptraceError::invalid("rolling window size must be at least 1"));
    }
    let half = k / 2;
    Ok((0..seq.len())
        .map(|j| {
            let cursor = j + half + 1;
            let start = cursor.saturating_sub(k);
            let end = cursor.min(seq.len());
            window_fn(&seq[start..end])
        })
        .collect())
}

/// Rolling arithmetic mean, the smoothing used for every differential series.
pub fn rolling_mean(seq: &[f64], k: usize) -> Result<Vec<f64>, LaptraceError> {
    rolling(seq, k, mean_unchecked)
}

pub fn mean(seq: &[f64]) -> Result<f64, LaptraceError> {
    if seq.is_empty() {
        return Err(LaptraceError::empty("mean"));
    }
    Ok(mean_unchecked(seq))
}

/// Mean and population standard deviation (denominator `N`).
pub fn mean_std(seq: &[f64]) -> Result<MeanStd, LaptraceError> {
    let mean = mean(seq)?;
    let variance = seq.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / seq.len() as f64;
    Ok(MeanStd {
        mean,
        std: variance.sqrt(),
    })
}

pub fn median(seq: &[f64]) -> Result<f64, LaptraceError> {
    if seq.is_empty() {
        return Err(LaptraceError::empty("median"));
    }
    Ok(median_unchecked(seq))
}

/// Index of the element of the ascending `sorted` slice closest to `x`.
///
/// Exact matches return immediately. When `x` is equidistant from its two neighbours the lower index wins.
pub fn closest_index(sorted: &[f64], x: f64) -> Result<usize, LaptraceError> {
    if sorted.is_empty() {
        return Err(LaptraceError::empty("closest index"));
    }
    // first index whose value is greater than x
    let hi = sorted.partition_point(|v| *v <= x);
    if hi == 0 {
        return Ok(0);
    }
    let lo = hi - 1;
    if sorted[lo] == x || hi == sorted.len() {
        return Ok(lo);
    }
    if x - sorted[lo] > sorted[hi] - x {
        Ok(hi)
    } else {
        Ok(lo)
    }
}

/// Groups `items` by `key_fn`, keeping groups in first-seen order and items in insertion order.
pub fn group_by<T, K, F>(items: impl IntoIterator<Item = T>, mut key_fn: F) -> Vec<(K, Vec<T>)>
where
    K: Eq + Hash + Clone,
    F: FnMut(&T) -> K,
{
    let mut positions: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<T>)> = Vec::new();
    for item in items {
        let key = key_fn(&item);
        match positions.get(&key) {
            Some(&pos) => groups[pos].1.push(item),
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push((key, vec![item]));
            }
        }
    }
    groups
}

pub(crate) fn mean_unchecked(seq: &[f64]) -> f64 {
    seq.iter().sum::<f64>() / seq.len() as f64
}

pub(crate) fn median_unchecked(seq: &[f64]) -> f64 {
    let mut sorted = seq.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let half = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[half]
    } else {
        (sorted[half - 1] + sorted[half]) / 2.0
    }
}
