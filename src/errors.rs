// Error types for laptrace

use snafu::Snafu;
use std::io;

#[derive(Debug, Snafu)]
pub enum LaptraceError {
    // Errors for malformed analysis input
    #[snafu(display("Invalid input: {reason}"))]
    InvalidInput { reason: String },
    #[snafu(display("Column {column} has {found} entries, expected {expected}"))]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
    #[snafu(display("Cannot compute {operation} of an empty sequence"))]
    EmptySequence { operation: String },
    #[snafu(display("Division by zero while computing {operation}"))]
    DivisionByZero { operation: String },
    #[snafu(display("Driver {driver} is not part of the session"))]
    UnknownDriver { driver: String },
    #[snafu(display("Telemetry channel {channel} is not available"))]
    MissingChannel { channel: String },
    #[snafu(display("Lap index {index} is out of range for {laps} laps"))]
    LapIndexOutOfRange { index: usize, laps: usize },

    // Config management errors
    #[snafu(display("Could not find application config directory"))]
    NoConfigDir,
    #[snafu(display("Error reading or writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error parsing config file"))]
    ConfigParseError { source: serde_json::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // Loader and writer errors
    #[snafu(display("Invalid data file: {path}"))]
    InvalidDataFile { path: String },
    #[snafu(display("Error loading data file"))]
    LoaderError { source: io::Error },
    #[snafu(display("Error parsing data file"))]
    LoaderParseError { source: serde_json::Error },
    #[snafu(display("Error writing output"))]
    WriterError { source: io::Error },
}

impl LaptraceError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        LaptraceError::InvalidInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn empty(operation: &str) -> Self {
        LaptraceError::EmptySequence {
            operation: operation.to_string(),
        }
    }

    pub(crate) fn division_by_zero(operation: &str) -> Self {
        LaptraceError::DivisionByZero {
            operation: operation.to_string(),
        }
    }
}
