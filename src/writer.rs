use std::{
    io::{self, Write},
    path::Path,
};

use log::info;
use serde::Serialize;

use crate::LaptraceError;

/// Writes `records` to `file` as JSON Lines, replacing any previous content.
pub fn write_records<T: Serialize>(file: &Path, records: &[T]) -> Result<(), LaptraceError> {
    serde_jsonlines::write_json_lines(file, records)
        .map_err(|e| LaptraceError::WriterError { source: e })?;
    info!("Wrote {} records to {:?}", records.len(), file);
    Ok(())
}

/// Appends `records` to `file` as JSON Lines, creating it when missing.
pub fn append_records<T: Serialize>(file: &Path, records: &[T]) -> Result<(), LaptraceError> {
    serde_jsonlines::append_json_lines(file, records)
        .map_err(|e| LaptraceError::WriterError { source: e })?;
    info!("Appended {} records to {:?}", records.len(), file);
    Ok(())
}

/// Writes `value` as one pretty-printed JSON document followed by a newline.
pub fn write_pretty<T: Serialize, W: Write>(mut out: W, value: &T) -> Result<(), LaptraceError> {
    serde_json::to_writer_pretty(&mut out, value)
        .map_err(|e| LaptraceError::WriterError { source: e.into() })?;
    writeln!(out).map_err(|e| LaptraceError::WriterError { source: e })?;
    out.flush()
        .map_err(|e| LaptraceError::WriterError { source: e })
}

pub fn print_pretty<T: Serialize>(value: &T) -> Result<(), LaptraceError> {
    write_pretty(io::stdout().lock(), value)
}
