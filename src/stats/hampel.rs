use serde::{Deserialize, Serialize};

use crate::LaptraceError;

use super::{median_unchecked, rolling};

/// Scale factor turning a median absolute deviation into a standard deviation estimate for normal data.
const MAD_SCALE: f64 = 1.4826;

pub const DEFAULT_HAMPEL_WINDOW: usize = 7;
pub const DEFAULT_HAMPEL_THRESHOLD: f64 = 3.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct HampelParams {
    /// Rolling window size
    pub window: usize,
    /// Multiplier applied to the scaled MAD
    pub threshold: f64,
}

impl Default for HampelParams {
    fn default() -> Self {
        Self {
            window: DEFAULT_HAMPEL_WINDOW,
            threshold: DEFAULT_HAMPEL_THRESHOLD,
        }
    }
}

impl HampelParams {
    /// Window sized to a fifth of the number of laps, the heuristic used when no window is chosen.
    pub fn scaled_to(sample_count: usize, threshold: f64) -> Self {
        Self {
            window: (sample_count / 5).max(1),
            threshold,
        }
    }
}

/// Hampel identifier over `values`.
///
/// Returns one flag per value: `true` keeps the value, `false` marks it as an outlier. A window whose
/// MAD is zero has a zero threshold, so any deviation from its median is flagged.
pub fn hampel(values: &[f64], params: HampelParams) -> Result<Vec<bool>, LaptraceError> {
    if !(params.threshold >= 0.0) {
        return Err(LaptraceError::invalid(format!(
            "hampel threshold must be non-negative, got {}",
            params.threshold
        )));
    }
    let medians = rolling(values, params.window, median_unchecked)?;
    let mads = rolling(values, params.window, median_absolute_deviation)?;
    Ok(values
        .iter()
        .zip(medians.iter().zip(mads.iter()))
        .map(|(value, (median, mad))| (value - median).abs() <= params.threshold * MAD_SCALE * mad)
        .collect())
}

fn median_absolute_deviation(window: &[f64]) -> f64 {
    let center = median_unchecked(window);
    let deviations: Vec<f64> = window.iter().map(|v| (v - center).abs()).collect();
    median_unchecked(&deviations)
}
