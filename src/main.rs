use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use itertools::Itertools;
use log::{debug, error, info};
use serde::Serialize;

use laptrace::{
    AnalysisConfig, Channel, DiffOptions, FilterOptions, HampelFilter, LapChart, LapChartRequest,
    LapTel, LapView, LaptraceError, Marker,
    colors::assign_colors,
    lap_chart,
    loader::{load_comparison, load_driver_laps},
    stats::closest_index,
    telemetry::{
        axis::{Panel, PanelDomain, panel_domains},
        diff::{channel_delta, col_diff_with, col_max_inds, speed_color_range, time_axis_range},
        segments::{equal_segments, section_time_diffs, speed_change_segments, split_positions},
    },
    writer::{print_pretty, write_records},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file to use instead of the one in the user config directory
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Lap times, race trace or stint summary of a session
    Laps {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long = "driver")]
        drivers: Vec<String>,

        #[arg(long, default_value_t = LapView::LapTime)]
        view: LapView,

        /// Apply the fuel correction
        #[arg(long)]
        fuel: bool,

        /// Fuel load for the fuel correction, implies --fuel
        #[arg(long)]
        fuel_load: Option<f64>,

        /// Race distance for the fuel correction, defaults to the longest race in the session
        #[arg(long)]
        max_laps: Option<u32>,

        #[command(flatten)]
        remove: RemoveArgs,

        #[command(flatten)]
        mark: MarkArgs,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Differential telemetry between two laps of a comparison
    Compare {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long, default_value_t = Channel::Time)]
        channel: Channel,

        #[arg(long, default_value_t = 0)]
        lap1: usize,

        #[arg(long, default_value_t = 1)]
        lap2: usize,

        #[arg(long, conflicts_with = "marker_fraction")]
        marker_index: Option<usize>,

        /// Marker as a fraction of the lap along the x-axis channel
        #[arg(long)]
        marker_fraction: Option<f64>,

        #[arg(long, default_value_t = Channel::Distance)]
        x_axis: Channel,

        #[arg(long, num_args = 0..=1, default_missing_value = "0")]
        rolling: Option<usize>,

        /// Split the lap into this many equal mini-sectors
        #[arg(long, num_args = 0..=1, default_missing_value = "0", group = "split")]
        segments: Option<usize>,

        /// Split the lap wherever the fastest lap changes
        #[arg(long, group = "split")]
        speed_segments: bool,

        /// Split the lap at the sector distances of the comparison
        #[arg(long, group = "split")]
        sectors: bool,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Plot colors for a set of drivers
    Colors {
        #[arg(required = true)]
        drivers: Vec<String>,
    },
}

#[derive(Args, Debug)]
struct RemoveArgs {
    /// Keep laps between these lap numbers, e.g. 5:30
    #[arg(long, value_parser = parse_lap_range)]
    lap_range: Option<(u32, u32)>,

    /// Keep lap times between these bounds in milliseconds, e.g. 80000:95000
    #[arg(long, value_parser = parse_time_range)]
    lap_time_range: Option<(f64, f64)>,

    /// Drop a single lap, e.g. VER:12
    #[arg(long = "exclude", value_parser = parse_exclusion)]
    exclude: Vec<(String, u32)>,

    #[arg(long)]
    box_laps: bool,

    #[arg(long)]
    track_status: bool,

    #[arg(long)]
    hampel: bool,

    /// Hampel filter with a window of a fifth of the laps still included
    #[arg(long, conflicts_with = "hampel")]
    hampel_scaled: bool,

    #[arg(long)]
    stddev: bool,
}

#[derive(Args, Debug)]
struct MarkArgs {
    #[arg(long, value_parser = parse_time_range)]
    mark_lap_time_range: Option<(f64, f64)>,

    #[arg(long)]
    mark_box_laps: bool,

    #[arg(long)]
    mark_track_status: bool,

    #[arg(long)]
    mark_hampel: bool,

    #[arg(long, conflicts_with = "mark_hampel")]
    mark_hampel_scaled: bool,

    #[arg(long)]
    mark_stddev: bool,
}

fn parse_pair(value: &str) -> Result<(&str, &str), String> {
    value
        .split_once(':')
        .ok_or_else(|| format!("expected two values separated by ':', got {}", value))
}

fn parse_lap_range(value: &str) -> Result<(u32, u32), String> {
    let (from, to) = parse_pair(value)?;
    Ok((
        from.trim().parse().map_err(|e| format!("{}", e))?,
        to.trim().parse().map_err(|e| format!("{}", e))?,
    ))
}

fn parse_time_range(value: &str) -> Result<(f64, f64), String> {
    let (from, to) = parse_pair(value)?;
    Ok((
        from.trim().parse().map_err(|e| format!("{}", e))?,
        to.trim().parse().map_err(|e| format!("{}", e))?,
    ))
}

fn parse_exclusion(value: &str) -> Result<(String, u32), String> {
    let (driver, lap) = parse_pair(value)?;
    Ok((
        driver.trim().to_uppercase(),
        lap.trim().parse().map_err(|e| format!("{}", e))?,
    ))
}

fn hampel_filter(fixed: bool, scaled: bool, config: &AnalysisConfig) -> Option<HampelFilter> {
    match (fixed, scaled) {
        (true, _) => Some(config.hampel_params().into()),
        (false, true) => Some(HampelFilter::Scaled {
            threshold: config.hampel_threshold,
        }),
        (false, false) => None,
    }
}

impl RemoveArgs {
    fn to_options(&self, config: &AnalysisConfig) -> FilterOptions {
        FilterOptions {
            lap_range: self.lap_range,
            lap_time_range: self.lap_time_range,
            laps: self.exclude.clone(),
            box_laps: self.box_laps,
            track_status: self.track_status,
            hampel: hampel_filter(self.hampel, self.hampel_scaled, config),
            stddev: self.stddev.then_some(config.stddev_threshold),
        }
    }
}

impl MarkArgs {
    fn to_options(&self, config: &AnalysisConfig) -> Option<FilterOptions> {
        let options = FilterOptions {
            lap_time_range: self.mark_lap_time_range,
            box_laps: self.mark_box_laps,
            track_status: self.mark_track_status,
            hampel: hampel_filter(self.mark_hampel, self.mark_hampel_scaled, config),
            stddev: self.mark_stddev.then_some(config.stddev_threshold),
            ..Default::default()
        };
        (!options.is_empty()).then_some(options)
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<AnalysisConfig, LaptraceError> {
    match path {
        Some(path) => AnalysisConfig::load(path),
        None => Ok(AnalysisConfig::from_local_file()?.unwrap_or_default()),
    }
}

fn laps(
    input: &PathBuf,
    mut request: LapChartRequest,
    min_race_length: u32,
    output: Option<&PathBuf>,
) -> Result<(), LaptraceError> {
    let session = load_driver_laps(input)?;
    if request.fuel_load.is_some() && request.max_laps.is_none() {
        let race_length = session.race_length().max(min_race_length);
        debug!("Fuel correction over a race length of {} laps", race_length);
        request.max_laps = Some(race_length);
    }
    let chart = lap_chart(&session, &request)?;
    match (output, &chart) {
        (Some(file), LapChart::Series(series)) => write_records(file, series),
        (Some(file), LapChart::StintSummary(rows)) => write_records(file, rows),
        (None, _) => print_pretty(&chart),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SampleRow {
    index: usize,
    x: f64,
    delta: f64,
    fastest_lap: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    section_delta: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ComparisonReport {
    channel: Channel,
    lap1: String,
    lap2: String,
    x_axis: Channel,
    /// Symmetric display range of the delta
    range: f64,
    splits: Vec<usize>,
    split_positions: Vec<f64>,
    panels: Vec<PanelDomain>,
    samples: Vec<SampleRow>,
}

enum SplitMode {
    None,
    Equal(usize),
    FastestLap,
    Sectors,
}

struct CompareRequest {
    channel: Channel,
    lap1: usize,
    lap2: usize,
    options: DiffOptions,
    split: SplitMode,
}

fn splits_for(
    lap_tel: &LapTel,
    sector_dists: Option<&[f64]>,
    split: &SplitMode,
    rolling: Option<usize>,
) -> Result<Vec<usize>, LaptraceError> {
    let distance = lap_tel.channel(0, Channel::Distance)?;
    let splits = match split {
        SplitMode::None => return Ok(Vec::new()),
        SplitMode::Equal(count) => equal_segments(&distance, *count)?,
        SplitMode::FastestLap => speed_change_segments(lap_tel, rolling)?,
        SplitMode::Sectors => sector_dists
            .ok_or_else(|| LaptraceError::InvalidInput {
                reason: "the comparison carries no sector distances".to_string(),
            })?
            .iter()
            .map(|d| closest_index(&distance, *d))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .dedup()
            .collect(),
    };
    // section times run between interior boundaries only
    let last = lap_tel.sample_count().saturating_sub(1);
    Ok(splits.into_iter().filter(|s| *s > 0 && *s < last).collect())
}

fn compare(
    input: &PathBuf,
    request: CompareRequest,
    output: Option<&PathBuf>,
) -> Result<(), LaptraceError> {
    let comparison = load_comparison(input)?;
    let lap_tel = &comparison.laptel;
    let CompareRequest {
        channel,
        lap1,
        lap2,
        options,
        split,
    } = request;
    let x_axis = options.x_axis.unwrap_or(Channel::Distance);

    let delta = channel_delta(lap_tel, channel, lap1, lap2, &options)?;
    let range = match channel {
        Channel::Time | Channel::SessionTime => {
            time_axis_range(&col_diff_with(lap_tel, channel, lap1, lap2, |a, b| a - b)?)
        }
        _ => speed_color_range(&delta),
    };
    let fastest = col_max_inds(lap_tel, Channel::Speed)?;
    let splits = splits_for(
        lap_tel,
        comparison.sector_dists.as_deref(),
        &split,
        options.rolling,
    )?;
    let section_deltas = match split {
        SplitMode::None => None,
        _ => Some(section_time_diffs(lap_tel, &splits, lap1, lap2)?),
    };
    let axis = lap_tel.channel(0, x_axis)?;
    info!(
        "Compared {} of {} and {} over {} samples with {} splits",
        channel,
        lap_tel.lap(lap1)?.name(),
        lap_tel.lap(lap2)?.name(),
        delta.len(),
        splits.len()
    );

    let samples = delta
        .iter()
        .enumerate()
        .map(|(index, delta)| SampleRow {
            index,
            x: axis.get(index).copied().unwrap_or(f64::NAN),
            delta: *delta,
            fastest_lap: fastest[index],
            section_delta: section_deltas.as_ref().map(|d| d[index]),
        })
        .collect_vec();

    if let Some(file) = output {
        return write_records(file, &samples);
    }
    let mut panels = vec![Panel::Channel(channel)];
    if channel != Channel::Time {
        panels.push(Panel::TimeDiff);
    }
    let report = ComparisonReport {
        channel,
        lap1: lap_tel.lap(lap1)?.name(),
        lap2: lap_tel.lap(lap2)?.name(),
        x_axis,
        range,
        split_positions: split_positions(&axis, &splits)?,
        splits,
        panels: panel_domains(&panels),
        samples,
    };
    print_pretty(&report)
}

fn run(cli: Cli) -> Result<(), LaptraceError> {
    let config = load_config(cli.config.as_ref())?;
    debug!("Using config {:?}", config);
    match cli.command {
        Commands::Laps {
            input,
            drivers,
            view,
            fuel,
            fuel_load,
            max_laps,
            remove,
            mark,
            output,
        } => {
            let request = LapChartRequest {
                drivers: drivers.iter().map(|d| d.to_uppercase()).collect(),
                view,
                fuel_load: (fuel || fuel_load.is_some())
                    .then(|| fuel_load.unwrap_or(config.fuel_load)),
                max_laps,
                remove: remove.to_options(&config),
                mark: mark.to_options(&config),
            };
            laps(&input, request, config.max_laps, output.as_ref())
        }
        Commands::Compare {
            input,
            channel,
            lap1,
            lap2,
            marker_index,
            marker_fraction,
            x_axis,
            rolling,
            segments,
            speed_segments,
            sectors,
            output,
        } => {
            let marker = marker_index
                .map(Marker::Index)
                .or(marker_fraction.map(Marker::Fraction));
            let split = match (segments, speed_segments, sectors) {
                (Some(0), ..) => SplitMode::Equal(config.segment_count),
                (Some(count), ..) => SplitMode::Equal(count),
                (None, true, _) => SplitMode::FastestLap,
                (None, false, true) => SplitMode::Sectors,
                (None, false, false) => SplitMode::None,
            };
            let request = CompareRequest {
                channel,
                lap1,
                lap2,
                options: DiffOptions {
                    marker,
                    rolling: rolling.map(|r| if r == 0 { config.rolling_window } else { r }),
                    x_axis: Some(x_axis),
                },
                split,
            };
            compare(&input, request, output.as_ref())
        }
        Commands::Colors { drivers } => {
            let drivers = drivers.iter().map(|d| d.to_uppercase()).collect_vec();
            print_pretty(&assign_colors(drivers.as_slice()))
        }
    }
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
