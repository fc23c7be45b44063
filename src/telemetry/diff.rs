use serde::{Deserialize, Serialize};
use uom::si::{f64::Time, time};

use crate::{
    LaptraceError,
    stats::{closest_index, rolling_mean},
};

use super::{Channel, LapTel};

/// Reference point used to re-zero a differential series.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Marker {
    /// Sample index
    Index(usize),
    /// Fraction of the lap, resolved against the reference lap's x-axis channel
    Fraction(f64),
}

impl Marker {
    /// Sample index of the marker on `axis`, an ascending x-axis channel.
    pub fn resolve(&self, axis: &[f64]) -> Result<usize, LaptraceError> {
        match *self {
            Marker::Index(index) if index < axis.len() => Ok(index),
            Marker::Index(index) => Err(LaptraceError::invalid(format!(
                "marker index {} is past the last of {} samples",
                index,
                axis.len()
            ))),
            Marker::Fraction(fraction) => {
                let last = *axis.last().ok_or_else(|| LaptraceError::empty("marker position"))?;
                closest_index(axis, fraction * last)
            }
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DiffOptions {
    pub marker: Option<Marker>,
    /// Rolling-mean window applied after re-basing
    pub rolling: Option<usize>,
    /// Channel the marker fraction is measured along
    pub x_axis: Option<Channel>,
}

/// Pointwise `op(lap1, lap2)` of `channel` at equal sample indexes.
pub fn col_diff_with<F>(
    lap_tel: &LapTel,
    channel: Channel,
    lap1: usize,
    lap2: usize,
    op: F,
) -> Result<Vec<f64>, LaptraceError>
where
    F: Fn(f64, f64) -> f64,
{
    let reference = lap_tel.channel(lap1, channel)?;
    let other = lap_tel.channel(lap2, channel)?;
    if reference.len() != other.len() {
        return Err(LaptraceError::ColumnLengthMismatch {
            column: channel.to_string(),
            expected: reference.len(),
            found: other.len(),
        });
    }
    Ok(reference
        .iter()
        .zip(other.iter())
        .map(|(a, b)| op(*a, *b))
        .collect())
}

/// `lap1 - lap2` for `channel`. Time channels are converted from milliseconds to seconds.
pub fn col_diff(
    lap_tel: &LapTel,
    channel: Channel,
    lap1: usize,
    lap2: usize,
) -> Result<Vec<f64>, LaptraceError> {
    let diff = col_diff_with(lap_tel, channel, lap1, lap2, |a, b| a - b)?;
    Ok(match channel {
        Channel::Time | Channel::SessionTime => diff.into_iter().map(ms_to_seconds).collect(),
        _ => diff,
    })
}

/// Shifts `diff` so it reads zero at `index`.
pub fn rebase(diff: &[f64], index: usize) -> Result<Vec<f64>, LaptraceError> {
    let zero = *diff.get(index).ok_or_else(|| {
        LaptraceError::invalid(format!(
            "marker index {} is past the last of {} samples",
            index,
            diff.len()
        ))
    })?;
    Ok(diff.iter().map(|v| v - zero).collect())
}

/// Differential series between two laps, re-based at the marker and smoothed as requested.
pub fn channel_delta(
    lap_tel: &LapTel,
    channel: Channel,
    lap1: usize,
    lap2: usize,
    options: &DiffOptions,
) -> Result<Vec<f64>, LaptraceError> {
    let mut diff = col_diff(lap_tel, channel, lap1, lap2)?;
    if let Some(marker) = options.marker {
        let axis = lap_tel.channel(0, options.x_axis.unwrap_or(Channel::Distance))?;
        diff = rebase(&diff, marker.resolve(&axis)?)?;
    }
    if let Some(window) = options.rolling {
        diff = rolling_mean(&diff, window)?;
    }
    Ok(diff)
}

/// For every sample, the index of the lap with the highest `channel` value. Ties go to the earlier lap.
pub fn col_max_inds(lap_tel: &LapTel, channel: Channel) -> Result<Vec<usize>, LaptraceError> {
    let columns = (0..lap_tel.laps().len())
        .map(|lap| lap_tel.channel(lap, channel))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((0..lap_tel.sample_count())
        .map(|sample| {
            columns
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (lap, values)| {
                    if values[sample] > best.1 {
                        (lap, values[sample])
                    } else {
                        best
                    }
                })
                .0
        })
        .collect())
}

/// Symmetric color range for a speed difference map, `ceil(max |diff|)`.
pub fn speed_color_range(speed_diff: &[f64]) -> f64 {
    max_abs(speed_diff).ceil()
}

/// Symmetric axis range in seconds for a time difference given in milliseconds, never below one second.
pub fn time_axis_range(time_diff_ms: &[f64]) -> f64 {
    (max_abs(time_diff_ms).max(1000.0) / 100.0).ceil() / 10.0
}

fn max_abs(values: &[f64]) -> f64 {
    values.iter().map(|v| v.abs()).fold(0.0, f64::max)
}

pub(crate) fn ms_to_seconds(value: f64) -> f64 {
    Time::new::<time::millisecond>(value).get::<time::second>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::test_support::*;
    use proptest::prelude::*;

    fn comparison() -> LapTel {
        lap_tel(vec![
            lap("VER", 10, &[100.0, 200.0, 250.0, 150.0, 280.0]),
            lap("LEC", 12, &[110.0, 190.0, 240.0, 170.0, 270.0]),
            lap("HAM", 8, &[105.0, 195.0, 260.0, 160.0, 275.0]),
        ])
    }

    #[test]
    fn test_speed_diff() {
        let diff = col_diff(&comparison(), Channel::Speed, 0, 1).unwrap();
        assert_eq!(diff, vec![-10.0, 10.0, 10.0, -20.0, 10.0]);
        let ratio = col_diff_with(&comparison(), Channel::Speed, 0, 1, |a, b| a / b).unwrap();
        assert!((ratio[1] - 200.0 / 190.0).abs() < 1e-12);
    }

    #[test]
    fn test_time_diff_in_seconds() {
        let tel = comparison();
        let diff = col_diff(&tel, Channel::Time, 0, 1).unwrap();
        let ver = tel.channel(0, Channel::Time).unwrap();
        let lec = tel.channel(1, Channel::Time).unwrap();
        assert_eq!(diff[0], 0.0);
        assert!((diff[4] - (ver[4] - lec[4]) / 1000.0).abs() < 1e-12);
    }

    #[test]
    fn test_marker_rebases() {
        let options = DiffOptions {
            marker: Some(Marker::Index(1)),
            ..Default::default()
        };
        let diff = channel_delta(&comparison(), Channel::Speed, 0, 1, &options).unwrap();
        assert_eq!(diff, vec![-20.0, 0.0, 0.0, -30.0, 0.0]);
    }

    #[test]
    fn test_marker_fraction_resolves_on_distance() {
        let distance = [0.0, 10.0, 20.0, 30.0, 40.0];
        assert_eq!(Marker::Fraction(0.5).resolve(&distance).unwrap(), 2);
        assert_eq!(Marker::Fraction(0.6).resolve(&distance).unwrap(), 2);
        assert_eq!(Marker::Fraction(1.0).resolve(&distance).unwrap(), 4);
        assert!(Marker::Index(5).resolve(&distance).is_err());
    }

    #[test]
    fn test_rolling_after_rebase() {
        let options = DiffOptions {
            marker: Some(Marker::Index(0)),
            rolling: Some(3),
            ..Default::default()
        };
        let diff = channel_delta(&comparison(), Channel::Speed, 0, 1, &options).unwrap();
        // re-based: [0, 20, 20, -10, 20]
        assert_eq!(diff.len(), 5);
        assert!((diff[0] - 10.0).abs() < 1e-12);
        assert!((diff[1] - 40.0 / 3.0).abs() < 1e-12);
        assert!((diff[4] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_fastest_lap_per_sample() {
        let fastest = col_max_inds(&comparison(), Channel::Speed).unwrap();
        assert_eq!(fastest, vec![1, 0, 2, 1, 0]);
    }

    #[test]
    fn test_display_ranges() {
        assert_eq!(speed_color_range(&[-12.2, 3.0, 8.9]), 13.0);
        assert_eq!(time_axis_range(&[120.0, -340.0]), 1.0);
        assert_eq!(time_axis_range(&[1520.0, -340.0]), 1.6);
    }

    #[test]
    fn test_out_of_range_lap() {
        assert!(matches!(
            col_diff(&comparison(), Channel::Speed, 0, 3),
            Err(LaptraceError::LapIndexOutOfRange { .. })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_identical_laps_rebase_to_zero(
            speeds in prop::collection::vec(60.0f64..340.0, 2..120),
            marker in 0usize..120,
            rolling in prop::option::of(1usize..20),
        ) {
            let tel = lap_tel(vec![lap("VER", 1, &speeds), lap("VER", 2, &speeds)]);
            let options = DiffOptions {
                marker: Some(Marker::Index(marker % speeds.len())),
                rolling,
                ..Default::default()
            };
            for channel in [Channel::Speed, Channel::Time] {
                let diff = channel_delta(&tel, channel, 0, 1, &options).unwrap();
                prop_assert_eq!(diff.len(), speeds.len());
                prop_assert!(diff.iter().all(|v| *v == 0.0));
            }
        }
    }
}
