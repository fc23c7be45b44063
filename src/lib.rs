// Library interface for laptrace
// The CLI and the integration tests both go through these modules

pub mod colors;
pub mod config;
pub mod errors;
pub mod laps;
pub mod loader;
pub mod stats;
pub mod telemetry;
pub mod writer;

// Re-export commonly used types
pub use config::AnalysisConfig;
pub use errors::LaptraceError;
pub use laps::{
    Compound, DriverEntry, DriverLaps, LapColumns,
    chart::{LapChart, LapChartRequest, LapView, lap_chart},
    filter::{FilterOptions, HampelFilter},
};
pub use loader::Comparison;
pub use telemetry::{Channel, LapTel, diff::DiffOptions, diff::Marker};
