//! Per-lap summary data as delivered by the session loader.
//!
//! A driver's laps are stored column by column. [`LapColumns`] checks on construction that every column
//! has the same length and that lap numbers never decrease, so every other module can index the columns
//! in lockstep.

pub mod chart;
pub mod correction;
pub mod filter;
pub mod stint;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};

use crate::LaptraceError;

/// Track status code for a green, clear track.
pub const GREEN_TRACK_STATUS: &str = "1";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Compound {
    Soft,
    Medium,
    Hard,
    Intermediate,
    Wet,
    #[serde(other)]
    Unknown,
}

impl Compound {
    pub fn color(&self) -> &'static str {
        match self {
            Compound::Soft => "#C1221C",
            Compound::Medium => "#E3D244",
            Compound::Hard => "#F1F4F8",
            Compound::Intermediate => "#58BF4B",
            Compound::Wet => "#1763C1",
            Compound::Unknown => "#555",
        }
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Compound::Soft => "SOFT",
            Compound::Medium => "MEDIUM",
            Compound::Hard => "HARD",
            Compound::Intermediate => "INTERMEDIATE",
            Compound::Wet => "WET",
            Compound::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Lap columns exactly as they come off the wire, before any validation.
///
/// Session exports write integer columns as floats and missing values as `null`. Lap and stint numbers
/// must still be whole numbers; a missing timing value becomes NaN and a missing compound `Unknown`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawLapColumns {
    pub driver: Vec<String>,
    #[serde(deserialize_with = "nullable_floats")]
    pub time: Vec<f64>,
    #[serde(deserialize_with = "nullable_floats")]
    pub lap_time: Vec<f64>,
    #[serde(deserialize_with = "whole_numbers")]
    pub lap_number: Vec<u32>,
    #[serde(deserialize_with = "whole_numbers")]
    pub stint: Vec<u32>,
    pub sector1_time: Vec<Option<f64>>,
    pub sector2_time: Vec<Option<f64>>,
    pub sector3_time: Vec<Option<f64>>,
    #[serde(deserialize_with = "nullable_compounds")]
    pub compound: Vec<Compound>,
    #[serde(deserialize_with = "nullable_floats")]
    pub tyre_life: Vec<f64>,
    #[serde(deserialize_with = "nullable_floats")]
    pub lap_start_time: Vec<f64>,
    pub pit_out_time: Vec<Option<f64>>,
    pub pit_in_time: Vec<Option<f64>>,
    pub track_status: Vec<String>,
}

fn nullable_floats<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
    Ok(Vec::<Option<f64>>::deserialize(deserializer)?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

fn whole_numbers<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u32>, D::Error> {
    Vec::<f64>::deserialize(deserializer)?
        .into_iter()
        .map(|v| {
            if v.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&v) {
                Ok(v as u32)
            } else {
                Err(D::Error::custom(format!("expected a whole lap or stint number, got {}", v)))
            }
        })
        .collect()
}

fn nullable_compounds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Compound>, D::Error> {
    Ok(Vec::<Option<Compound>>::deserialize(deserializer)?
        .into_iter()
        .map(|c| c.unwrap_or(Compound::Unknown))
        .collect())
}

/// One driver's laps, one entry per lap in every column.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase", try_from = "RawLapColumns")]
pub struct LapColumns {
    driver: Vec<String>,
    time: Vec<f64>,
    lap_time: Vec<f64>,
    lap_number: Vec<u32>,
    stint: Vec<u32>,
    sector1_time: Vec<Option<f64>>,
    sector2_time: Vec<Option<f64>>,
    sector3_time: Vec<Option<f64>>,
    compound: Vec<Compound>,
    tyre_life: Vec<f64>,
    lap_start_time: Vec<f64>,
    pit_out_time: Vec<Option<f64>>,
    pit_in_time: Vec<Option<f64>>,
    track_status: Vec<String>,
}

impl TryFrom<RawLapColumns> for LapColumns {
    type Error = LaptraceError;

    fn try_from(raw: RawLapColumns) -> Result<Self, Self::Error> {
        let expected = raw.lap_number.len();
        let lengths = [
            ("Driver", raw.driver.len()),
            ("Time", raw.time.len()),
            ("LapTime", raw.lap_time.len()),
            ("Stint", raw.stint.len()),
            ("Sector1Time", raw.sector1_time.len()),
            ("Sector2Time", raw.sector2_time.len()),
            ("Sector3Time", raw.sector3_time.len()),
            ("Compound", raw.compound.len()),
            ("TyreLife", raw.tyre_life.len()),
            ("LapStartTime", raw.lap_start_time.len()),
            ("PitOutTime", raw.pit_out_time.len()),
            ("PitInTime", raw.pit_in_time.len()),
            ("TrackStatus", raw.track_status.len()),
        ];
        if let Some((column, found)) = lengths.iter().find(|(_, len)| *len != expected) {
            return Err(LaptraceError::ColumnLengthMismatch {
                column: column.to_string(),
                expected,
                found: *found,
            });
        }
        if let Some(pos) = raw.lap_number.windows(2).position(|w| w[1] < w[0]) {
            return Err(LaptraceError::invalid(format!(
                "lap numbers decrease from {} to {} at row {}",
                raw.lap_number[pos],
                raw.lap_number[pos + 1],
                pos + 1
            )));
        }
        Ok(Self {
            driver: raw.driver,
            time: raw.time,
            lap_time: raw.lap_time,
            lap_number: raw.lap_number,
            stint: raw.stint,
            sector1_time: raw.sector1_time,
            sector2_time: raw.sector2_time,
            sector3_time: raw.sector3_time,
            compound: raw.compound,
            tyre_life: raw.tyre_life,
            lap_start_time: raw.lap_start_time,
            pit_out_time: raw.pit_out_time,
            pit_in_time: raw.pit_in_time,
            track_status: raw.track_status,
        })
    }
}

impl LapColumns {
    pub fn len(&self) -> usize {
        self.lap_number.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lap_number.is_empty()
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn lap_time(&self) -> &[f64] {
        &self.lap_time
    }

    pub fn lap_number(&self) -> &[u32] {
        &self.lap_number
    }

    pub fn stint(&self) -> &[u32] {
        &self.stint
    }

    pub fn compound(&self) -> &[Compound] {
        &self.compound
    }

    pub fn lap_start_time(&self) -> &[f64] {
        &self.lap_start_time
    }

    pub fn pit_out_time(&self) -> &[Option<f64>] {
        &self.pit_out_time
    }

    pub fn pit_in_time(&self) -> &[Option<f64>] {
        &self.pit_in_time
    }

    pub fn track_status(&self) -> &[String] {
        &self.track_status
    }

    /// Copy of these laps with a replacement `LapTime` column.
    pub fn with_lap_times(&self, lap_time: Vec<f64>) -> Result<Self, LaptraceError> {
        if lap_time.len() != self.len() {
            return Err(LaptraceError::ColumnLengthMismatch {
                column: "LapTime".to_string(),
                expected: self.len(),
                found: lap_time.len(),
            });
        }
        Ok(Self {
            lap_time,
            ..self.clone()
        })
    }

    /// Copy holding only the rows whose mask entry is `true`.
    pub fn retain(&self, mask: &[bool]) -> Result<Self, LaptraceError> {
        if mask.len() != self.len() {
            return Err(LaptraceError::ColumnLengthMismatch {
                column: "mask".to_string(),
                expected: self.len(),
                found: mask.len(),
            });
        }
        fn keep<T: Clone>(column: &[T], mask: &[bool]) -> Vec<T> {
            column
                .iter()
                .zip(mask)
                .filter(|(_, keep)| **keep)
                .map(|(v, _)| v.clone())
                .collect()
        }
        Ok(Self {
            driver: keep(&self.driver, mask),
            time: keep(&self.time, mask),
            lap_time: keep(&self.lap_time, mask),
            lap_number: keep(&self.lap_number, mask),
            stint: keep(&self.stint, mask),
            sector1_time: keep(&self.sector1_time, mask),
            sector2_time: keep(&self.sector2_time, mask),
            sector3_time: keep(&self.sector3_time, mask),
            compound: keep(&self.compound, mask),
            tyre_life: keep(&self.tyre_life, mask),
            lap_start_time: keep(&self.lap_start_time, mask),
            pit_out_time: keep(&self.pit_out_time, mask),
            pit_in_time: keep(&self.pit_in_time, mask),
            track_status: keep(&self.track_status, mask),
        })
    }

    /// Row view of the columns, one record per lap.
    pub fn records(&self) -> Vec<LapRecord> {
        (0..self.len())
            .map(|i| LapRecord {
                driver: self.driver[i].clone(),
                time: self.time[i],
                lap_time: self.lap_time[i],
                lap_number: self.lap_number[i],
                stint: self.stint[i],
                sector1_time: self.sector1_time[i],
                sector2_time: self.sector2_time[i],
                sector3_time: self.sector3_time[i],
                compound: self.compound[i],
                tyre_life: self.tyre_life[i],
                lap_start_time: self.lap_start_time[i],
                pit_out_time: self.pit_out_time[i],
                pit_in_time: self.pit_in_time[i],
                track_status: self.track_status[i].clone(),
            })
            .collect()
    }
}

/// A single lap, used for tooltips and row-oriented output.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct LapRecord {
    pub driver: String,
    pub time: f64,
    pub lap_time: f64,
    pub lap_number: u32,
    pub stint: u32,
    pub sector1_time: Option<f64>,
    pub sector2_time: Option<f64>,
    pub sector3_time: Option<f64>,
    pub compound: Compound,
    pub tyre_life: f64,
    pub lap_start_time: f64,
    pub pit_out_time: Option<f64>,
    pub pit_in_time: Option<f64>,
    pub track_status: String,
}

impl FromIterator<LapRecord> for RawLapColumns {
    fn from_iter<I: IntoIterator<Item = LapRecord>>(iter: I) -> Self {
        let mut raw = RawLapColumns::default();
        for lap in iter {
            raw.driver.push(lap.driver);
            raw.time.push(lap.time);
            raw.lap_time.push(lap.lap_time);
            raw.lap_number.push(lap.lap_number);
            raw.stint.push(lap.stint);
            raw.sector1_time.push(lap.sector1_time);
            raw.sector2_time.push(lap.sector2_time);
            raw.sector3_time.push(lap.sector3_time);
            raw.compound.push(lap.compound);
            raw.tyre_life.push(lap.tyre_life);
            raw.lap_start_time.push(lap.lap_start_time);
            raw.pit_out_time.push(lap.pit_out_time);
            raw.pit_in_time.push(lap.pit_in_time);
            raw.track_status.push(lap.track_status);
        }
        raw
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriverEntry {
    pub laps: LapColumns,
    pub color: String,
    pub full_name: String,
}

/// Laps of every driver in a session, keyed by driver identifier.
///
/// Every transformation returns a new `DriverLaps`; nothing is modified in place.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DriverLaps(BTreeMap<String, DriverEntry>);

impl DriverLaps {
    pub fn new(entries: BTreeMap<String, DriverEntry>) -> Self {
        Self(entries)
    }

    pub fn get(&self, driver: &str) -> Option<&DriverEntry> {
        self.0.get(driver)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DriverEntry)> {
        self.0.iter()
    }

    pub fn drivers(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total_laps(&self) -> usize {
        self.0.values().map(|entry| entry.laps.len()).sum()
    }

    /// Length of the longest race in the session: the highest lap number, or the row count when a
    /// driver has more rows than that.
    pub fn race_length(&self) -> u32 {
        self.0
            .values()
            .map(|entry| {
                let highest = entry.laps.lap_number().iter().copied().max().unwrap_or(0);
                highest.max(entry.laps.len() as u32)
            })
            .max()
            .unwrap_or(0)
    }

    /// Restricts the session to `drivers`; an empty selection keeps every driver.
    pub fn select(&self, drivers: &[String]) -> Result<Self, LaptraceError> {
        if drivers.is_empty() {
            return Ok(self.clone());
        }
        drivers
            .iter()
            .map(|driver| {
                self.0
                    .get(driver)
                    .map(|entry| (driver.clone(), entry.clone()))
                    .ok_or_else(|| LaptraceError::UnknownDriver {
                        driver: driver.clone(),
                    })
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Self)
    }

    /// Replaces every driver's `LapTime` column with the output of `fix`.
    pub fn map_lap_times<F>(&self, mut fix: F) -> Result<Self, LaptraceError>
    where
        F: FnMut(&str, &LapColumns) -> Result<Vec<f64>, LaptraceError>,
    {
        self.0
            .iter()
            .map(|(driver, entry)| {
                let lap_time = fix(driver, &entry.laps)?;
                Ok((
                    driver.clone(),
                    DriverEntry {
                        laps: entry.laps.with_lap_times(lap_time)?,
                        ..entry.clone()
                    },
                ))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Self)
    }

    /// Keeps only the rows flagged `true` in each driver's mask.
    pub fn apply_masks(&self, masks: &BTreeMap<String, Vec<bool>>) -> Result<Self, LaptraceError> {
        self.0
            .iter()
            .map(|(driver, entry)| {
                let mask = masks.get(driver).ok_or_else(|| LaptraceError::UnknownDriver {
                    driver: driver.clone(),
                })?;
                Ok((
                    driver.clone(),
                    DriverEntry {
                        laps: entry.laps.retain(mask)?,
                        ..entry.clone()
                    },
                ))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()
            .map(Self)
    }
}

impl FromIterator<(String, DriverEntry)> for DriverLaps {
    fn from_iter<I: IntoIterator<Item = (String, DriverEntry)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Builds a lap with green track status and no pit activity.
    pub(crate) fn lap(driver: &str, lap_number: u32, stint: u32, lap_time: f64) -> LapRecord {
        let lap_start_time = 3_600_000.0 + (lap_number as f64 - 1.0) * 90_000.0;
        LapRecord {
            driver: driver.to_string(),
            time: lap_start_time + lap_time,
            lap_time,
            lap_number,
            stint,
            sector1_time: Some(lap_time * 0.3),
            sector2_time: Some(lap_time * 0.4),
            sector3_time: Some(lap_time * 0.3),
            compound: Compound::Medium,
            tyre_life: lap_number as f64,
            lap_start_time,
            pit_out_time: None,
            pit_in_time: None,
            track_status: GREEN_TRACK_STATUS.to_string(),
        }
    }

    pub(crate) fn columns(laps: Vec<LapRecord>) -> LapColumns {
        LapColumns::try_from(laps.into_iter().collect::<RawLapColumns>()).unwrap()
    }

    pub(crate) fn entry(laps: Vec<LapRecord>) -> DriverEntry {
        DriverEntry {
            laps: columns(laps),
            color: "#fff".to_string(),
            full_name: "Test Driver".to_string(),
        }
    }

    /// `count` consecutive laps starting at lap 1, all in stint 1.
    pub(crate) fn stint_laps(driver: &str, lap_times: &[f64]) -> Vec<LapRecord> {
        lap_times
            .iter()
            .enumerate()
            .map(|(i, t)| lap(driver, i as u32 + 1, 1, *t))
            .collect()
    }
}
