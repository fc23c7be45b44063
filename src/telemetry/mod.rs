//! Per-lap telemetry traces as delivered by the telemetry loader.
//!
//! Traces of laps being compared are resampled upstream onto one common distance axis, so sample `i`
//! of every lap refers to the same point of the track. [`LapTel`] checks that all traces have the same
//! number of samples; nothing in this crate interpolates.

pub mod axis;
pub mod diff;
pub mod segments;

use std::{borrow::Cow, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};

use crate::LaptraceError;

/// Numeric telemetry channels that can be compared between laps.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Time,
    SessionTime,
    Date,
    Speed,
    #[serde(rename = "RPM")]
    Rpm,
    #[serde(rename = "nGear")]
    NGear,
    Throttle,
    Brake,
    #[serde(rename = "DRS")]
    Drs,
    Distance,
    RelativeDistance,
    X,
    Y,
    Z,
}

impl Channel {
    pub const ALL: [Channel; 14] = [
        Channel::Time,
        Channel::SessionTime,
        Channel::Date,
        Channel::Speed,
        Channel::Rpm,
        Channel::NGear,
        Channel::Throttle,
        Channel::Brake,
        Channel::Drs,
        Channel::Distance,
        Channel::RelativeDistance,
        Channel::X,
        Channel::Y,
        Channel::Z,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Time => "Time",
            Channel::SessionTime => "SessionTime",
            Channel::Date => "Date",
            Channel::Speed => "Speed",
            Channel::Rpm => "RPM",
            Channel::NGear => "nGear",
            Channel::Throttle => "Throttle",
            Channel::Brake => "Brake",
            Channel::Drs => "DRS",
            Channel::Distance => "Distance",
            Channel::RelativeDistance => "RelativeDistance",
            Channel::X => "X",
            Channel::Y => "Y",
            Channel::Z => "Z",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = LaptraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|channel| channel.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| LaptraceError::MissingChannel {
                channel: s.to_string(),
            })
    }
}

/// Telemetry of one lap, one entry per sample in every channel.
///
/// Channels the loader did not send are empty.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetrySample {
    #[serde(rename = "Time")]
    pub time: Vec<f64>,
    #[serde(rename = "SessionTime")]
    pub session_time: Vec<f64>,
    #[serde(rename = "Date")]
    pub date: Vec<f64>,
    #[serde(rename = "Speed")]
    pub speed: Vec<f64>,
    #[serde(rename = "RPM")]
    pub rpm: Vec<f64>,
    #[serde(rename = "nGear")]
    pub n_gear: Vec<f64>,
    #[serde(rename = "Throttle")]
    pub throttle: Vec<f64>,
    #[serde(rename = "Brake")]
    pub brake: Vec<bool>,
    #[serde(rename = "DRS")]
    pub drs: Vec<f64>,
    #[serde(rename = "Distance")]
    pub distance: Vec<f64>,
    #[serde(rename = "RelativeDistance")]
    pub relative_distance: Vec<f64>,
    #[serde(rename = "X")]
    pub x: Vec<f64>,
    #[serde(rename = "Y")]
    pub y: Vec<f64>,
    #[serde(rename = "Z")]
    pub z: Vec<f64>,
    #[serde(rename = "Status")]
    pub status: Vec<String>,
    #[serde(rename = "Source")]
    pub source: Vec<String>,
    #[serde(rename = "DriverAhead")]
    pub driver_ahead: Vec<Option<String>>,
    #[serde(rename = "DistanceToDriverAhead")]
    pub distance_to_driver_ahead: Vec<Option<f64>>,
}

impl TelemetrySample {
    /// Number of samples, taken from the longest channel.
    pub fn len(&self) -> usize {
        self.channel_lengths()
            .into_iter()
            .map(|(_, len)| len)
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values of a numeric channel. `Brake` is reported as 0 or 1.
    pub fn channel(&self, channel: Channel) -> Result<Cow<'_, [f64]>, LaptraceError> {
        let values: Cow<'_, [f64]> = match channel {
            Channel::Time => Cow::Borrowed(&self.time),
            Channel::SessionTime => Cow::Borrowed(&self.session_time),
            Channel::Date => Cow::Borrowed(&self.date),
            Channel::Speed => Cow::Borrowed(&self.speed),
            Channel::Rpm => Cow::Borrowed(&self.rpm),
            Channel::NGear => Cow::Borrowed(&self.n_gear),
            Channel::Throttle => Cow::Borrowed(&self.throttle),
            Channel::Brake => Cow::Owned(
                self.brake
                    .iter()
                    .map(|on| if *on { 1.0 } else { 0.0 })
                    .collect(),
            ),
            Channel::Drs => Cow::Borrowed(&self.drs),
            Channel::Distance => Cow::Borrowed(&self.distance),
            Channel::RelativeDistance => Cow::Borrowed(&self.relative_distance),
            Channel::X => Cow::Borrowed(&self.x),
            Channel::Y => Cow::Borrowed(&self.y),
            Channel::Z => Cow::Borrowed(&self.z),
        };
        if values.is_empty() && !self.is_empty() {
            return Err(LaptraceError::MissingChannel {
                channel: channel.to_string(),
            });
        }
        Ok(values)
    }

    fn channel_lengths(&self) -> [(&'static str, usize); 18] {
        [
            ("Time", self.time.len()),
            ("SessionTime", self.session_time.len()),
            ("Date", self.date.len()),
            ("Speed", self.speed.len()),
            ("RPM", self.rpm.len()),
            ("nGear", self.n_gear.len()),
            ("Throttle", self.throttle.len()),
            ("Brake", self.brake.len()),
            ("DRS", self.drs.len()),
            ("Distance", self.distance.len()),
            ("RelativeDistance", self.relative_distance.len()),
            ("X", self.x.len()),
            ("Y", self.y.len()),
            ("Z", self.z.len()),
            ("Status", self.status.len()),
            ("Source", self.source.len()),
            ("DriverAhead", self.driver_ahead.len()),
            ("DistanceToDriverAhead", self.distance_to_driver_ahead.len()),
        ]
    }

    /// Checks that every channel that was sent has the same number of samples.
    pub fn validate(&self) -> Result<(), LaptraceError> {
        let expected = self.len();
        match self
            .channel_lengths()
            .into_iter()
            .find(|(_, len)| *len != 0 && *len != expected)
        {
            Some((column, found)) => Err(LaptraceError::ColumnLengthMismatch {
                column: column.to_string(),
                expected,
                found,
            }),
            None => Ok(()),
        }
    }
}

/// Lap identifier within a comparison: a lap number, or a label for synthetic laps such as averages.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum LapLabel {
    Number(u32),
    Label(String),
}

impl<'de> Deserialize<'de> for LapLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Number(u32),
            Text(String),
        }
        Ok(match Wire::deserialize(deserializer)? {
            Wire::Number(n) => LapLabel::Number(n),
            Wire::Text(text) => match text.parse::<u32>() {
                Ok(n) => LapLabel::Number(n),
                Err(_) => LapLabel::Label(text),
            },
        })
    }
}

impl fmt::Display for LapLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LapLabel::Number(n) => write!(f, "{}", n),
            LapLabel::Label(label) => f.write_str(label),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LapTelemetry {
    pub driver: String,
    pub lap_number: LapLabel,
    pub tel: TelemetrySample,
}

impl LapTelemetry {
    pub fn name(&self) -> String {
        format!("{}-{}", self.driver, self.lap_number)
    }
}

/// Two or more laps on a common sample axis. Lap 0 is the reference lap.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Vec<LapTelemetry>", into = "Vec<LapTelemetry>")]
pub struct LapTel {
    laps: Vec<LapTelemetry>,
}

impl TryFrom<Vec<LapTelemetry>> for LapTel {
    type Error = LaptraceError;

    fn try_from(laps: Vec<LapTelemetry>) -> Result<Self, Self::Error> {
        if laps.len() < 2 {
            return Err(LaptraceError::invalid(format!(
                "a comparison needs at least two laps, got {}",
                laps.len()
            )));
        }
        for lap in &laps {
            lap.tel.validate()?;
        }
        let expected = laps[0].tel.len();
        if let Some(lap) = laps.iter().find(|lap| lap.tel.len() != expected) {
            return Err(LaptraceError::ColumnLengthMismatch {
                column: lap.name(),
                expected,
                found: lap.tel.len(),
            });
        }
        Ok(Self { laps })
    }
}

impl From<LapTel> for Vec<LapTelemetry> {
    fn from(value: LapTel) -> Self {
        value.laps
    }
}

impl LapTel {
    pub fn new(laps: Vec<LapTelemetry>) -> Result<Self, LaptraceError> {
        Self::try_from(laps)
    }

    pub fn laps(&self) -> &[LapTelemetry] {
        &self.laps
    }

    pub fn reference(&self) -> &LapTelemetry {
        &self.laps[0]
    }

    /// Samples per lap.
    pub fn sample_count(&self) -> usize {
        self.laps[0].tel.len()
    }

    pub fn lap(&self, index: usize) -> Result<&LapTelemetry, LaptraceError> {
        self.laps.get(index).ok_or(LaptraceError::LapIndexOutOfRange {
            index,
            laps: self.laps.len(),
        })
    }

    pub fn channel(&self, lap: usize, channel: Channel) -> Result<Cow<'_, [f64]>, LaptraceError> {
        self.lap(lap)?.tel.channel(channel)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A lap sampled every 10 m over `speeds.len()` samples, time derived from speed in km/h.
    pub(crate) fn lap(driver: &str, lap_number: u32, speeds: &[f64]) -> LapTelemetry {
        let distance: Vec<f64> = (0..speeds.len()).map(|i| i as f64 * 10.0).collect();
        let mut time = Vec::with_capacity(speeds.len());
        let mut elapsed_ms = 0.0;
        for (i, speed) in speeds.iter().enumerate() {
            if i > 0 {
                elapsed_ms += 10.0 / (speed / 3.6) * 1000.0;
            }
            time.push(elapsed_ms);
        }
        let last = distance.last().copied().unwrap_or(0.0);
        LapTelemetry {
            driver: driver.to_string(),
            lap_number: LapLabel::Number(lap_number),
            tel: TelemetrySample {
                relative_distance: distance.iter().map(|d| if last > 0.0 { d / last } else { 0.0 }).collect(),
                distance,
                time,
                speed: speeds.to_vec(),
                throttle: vec![100.0; speeds.len()],
                brake: vec![false; speeds.len()],
                ..Default::default()
            },
        }
    }

    pub(crate) fn lap_tel(laps: Vec<LapTelemetry>) -> LapTel {
        LapTel::new(laps).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_channel_lookup() {
        let lap = lap("VER", 12, &[200.0, 210.0, 220.0]);
        assert_eq!(lap.tel.channel(Channel::Speed).unwrap().as_ref(), &[200.0, 210.0, 220.0]);
        assert_eq!(lap.tel.channel(Channel::Brake).unwrap().as_ref(), &[0.0, 0.0, 0.0]);
        assert!(matches!(
            lap.tel.channel(Channel::Rpm),
            Err(LaptraceError::MissingChannel { .. })
        ));
    }

    #[test]
    fn test_channel_from_str() {
        assert_eq!("speed".parse::<Channel>().unwrap(), Channel::Speed);
        assert_eq!("nGear".parse::<Channel>().unwrap(), Channel::NGear);
        assert_eq!("DRS".parse::<Channel>().unwrap(), Channel::Drs);
        assert!("Steering".parse::<Channel>().is_err());
    }

    #[test]
    fn test_lap_tel_requires_two_equal_laps() {
        assert!(LapTel::new(vec![lap("VER", 1, &[200.0, 210.0])]).is_err());
        assert!(matches!(
            LapTel::new(vec![lap("VER", 1, &[200.0, 210.0]), lap("HAM", 1, &[200.0])]),
            Err(LaptraceError::ColumnLengthMismatch { .. })
        ));
        let tel = lap_tel(vec![lap("VER", 1, &[200.0, 210.0]), lap("HAM", 1, &[190.0, 215.0])]);
        assert_eq!(tel.sample_count(), 2);
        assert!(matches!(
            tel.lap(2),
            Err(LaptraceError::LapIndexOutOfRange { index: 2, laps: 2 })
        ));
    }

    #[test]
    fn test_ragged_sample_rejected() {
        let mut ver = lap("VER", 1, &[200.0, 210.0]);
        ver.tel.throttle.pop();
        assert!(ver.tel.validate().is_err());
    }

    #[test]
    fn test_deserialize_comparison() {
        let json = r#"[
            {"driver": "VER", "lapNumber": "12",
             "tel": {"Time": [0, 1000], "Speed": [280.5, 281.0], "Distance": [0.0, 78.0],
                     "Brake": [false, true], "DriverAhead": [null, "44"]}},
            {"driver": "COMB", "lapNumber": "1",
             "tel": {"Time": [0, 1010], "Speed": [279.0, 282.0], "Distance": [0.0, 78.0],
                     "Brake": [false, false], "DriverAhead": ["1", null]}},
            {"driver": "HAM", "lapNumber": "avg",
             "tel": {"Time": [0, 990], "Speed": [281.0, 283.0], "Distance": [0.0, 78.0],
                     "Brake": [true, true], "DriverAhead": [null, null]}}
        ]"#;
        let tel: LapTel = serde_json::from_str(json).unwrap();
        assert_eq!(tel.laps().len(), 3);
        assert_eq!(tel.reference().lap_number, LapLabel::Number(12));
        assert_eq!(tel.laps()[2].lap_number, LapLabel::Label("avg".to_string()));
        assert_eq!(tel.channel(1, Channel::Brake).unwrap().as_ref(), &[0.0, 0.0]);
        assert_eq!(tel.laps()[2].name(), "HAM-avg");
    }
}
