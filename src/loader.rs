use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use log::info;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{LaptraceError, laps::DriverLaps, telemetry::LapTel};

/// A telemetry comparison document: aligned laps and, when known, the distances of the sector ends.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub laptel: LapTel,
    #[serde(default)]
    pub sector_dists: Option<Vec<f64>>,
}

pub fn load_driver_laps(source_file: &Path) -> Result<DriverLaps, LaptraceError> {
    let laps: DriverLaps = load_json(source_file)?;
    info!(
        "Loaded {} laps for {} drivers from {:?}",
        laps.total_laps(),
        laps.len(),
        source_file
    );
    Ok(laps)
}

pub fn load_comparison(source_file: &Path) -> Result<Comparison, LaptraceError> {
    let comparison: Comparison = load_json(source_file)?;
    info!(
        "Loaded {} laps of {} samples from {:?}",
        comparison.laptel.laps().len(),
        comparison.laptel.sample_count(),
        source_file
    );
    Ok(comparison)
}

pub fn driver_laps_from_reader<R: Read>(reader: R) -> Result<DriverLaps, LaptraceError> {
    from_reader(reader)
}

pub fn comparison_from_reader<R: Read>(reader: R) -> Result<Comparison, LaptraceError> {
    from_reader(reader)
}

fn load_json<T: DeserializeOwned>(source_file: &Path) -> Result<T, LaptraceError> {
    if !source_file.is_file() {
        return Err(LaptraceError::InvalidDataFile {
            path: format!("{:?}", source_file),
        });
    }
    let file = File::open(source_file).map_err(|e| LaptraceError::LoaderError { source: e })?;
    from_reader(BufReader::new(file))
}

// Validation failures inside `try_from` surface as serde_json data errors.
fn from_reader<T: DeserializeOwned, R: Read>(reader: R) -> Result<T, LaptraceError> {
    serde_json::from_reader(reader).map_err(|e| LaptraceError::LoaderParseError { source: e })
}
