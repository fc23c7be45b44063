// Integration tests running the lap and telemetry pipelines on collaborator-shaped documents
//
// The fixtures mirror what the session loader hands over: a driver-keyed lap document and a lap
// comparison with aligned telemetry.

use std::path::PathBuf;

use serde_json::{Value, json};
use tempfile::TempDir;

use laptrace::{
    Channel, DiffOptions, FilterOptions, LapChart, LapChartRequest, LapView, LaptraceError, Marker,
    lap_chart,
    laps::chart::DriverSeries,
    loader::{load_comparison, load_driver_laps},
    stats::closest_index,
    telemetry::{
        LapLabel,
        diff::channel_delta,
        segments::{section_time_diffs, split_positions},
    },
    writer::write_records,
};

const SESSION_START: f64 = 3_600_000.0;

struct DriverFixture<'a> {
    driver: &'a str,
    lap_times: &'a [f64],
    stints: &'a [u32],
    compounds: &'a [&'a str],
    track_status: &'a [&'a str],
    pit_out: &'a [usize],
    pit_in: &'a [usize],
}

fn driver_json(fixture: &DriverFixture) -> Value {
    let n = fixture.lap_times.len();
    let mut starts = Vec::with_capacity(n);
    let mut ends = Vec::with_capacity(n);
    let mut clock = SESSION_START;
    for lap_time in fixture.lap_times {
        starts.push(clock);
        clock += lap_time;
        ends.push(clock);
    }
    let pit = |laps: &[usize], times: &[f64]| -> Vec<Option<f64>> {
        (0..n).map(|i| laps.contains(&i).then(|| times[i])).collect()
    };
    json!({
        "laps": {
            "Driver": vec![fixture.driver; n],
            "Time": ends,
            "LapTime": fixture.lap_times,
            "LapNumber": (1..=n as u32).collect::<Vec<_>>(),
            "Stint": fixture.stints,
            "Sector1Time": vec![Option::<f64>::None; n],
            "Sector2Time": vec![Option::<f64>::None; n],
            "Sector3Time": vec![Option::<f64>::None; n],
            "Compound": fixture.compounds,
            "TyreLife": (1..=n).map(|i| i as f64).collect::<Vec<_>>(),
            "LapStartTime": starts,
            "PitOutTime": pit(fixture.pit_out, &starts),
            "PitInTime": pit(fixture.pit_in, &ends),
            "TrackStatus": fixture.track_status,
        },
        "color": "#fff",
        "fullName": fixture.driver,
    })
}

fn write_session(dir: &TempDir) -> PathBuf {
    let ver = DriverFixture {
        driver: "VER",
        lap_times: &[95_000.0, 90_000.0, 90_500.0, 120_000.0, 91_000.0],
        stints: &[1, 1, 1, 1, 1],
        compounds: &["MEDIUM"; 5],
        track_status: &["1", "1", "1", "4", "1"],
        pit_out: &[0],
        pit_in: &[],
    };
    let lec = DriverFixture {
        driver: "LEC",
        lap_times: &[96_000.0, 91_000.0, 91_500.0, 92_000.0, 92_500.0],
        stints: &[1, 1, 2, 2, 2],
        compounds: &["SOFT", "SOFT", "HARD", "HARD", "HARD"],
        track_status: &["1"; 5],
        pit_out: &[0, 2],
        pit_in: &[1],
    };
    let doc = json!({ "VER": driver_json(&ver), "LEC": driver_json(&lec) });
    let path = dir.path().join("laps.json");
    std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();
    path
}

fn write_comparison(dir: &TempDir) -> PathBuf {
    let distance: Vec<f64> = (0..6).map(|i| i as f64 * 10.0).collect();
    let doc = json!({
        "laptel": [
            {
                "driver": "VER",
                "lapNumber": 12,
                "tel": {
                    "Time": [0.0, 1000.0, 2000.0, 3000.0, 4000.0, 5000.0],
                    "Speed": [200.0, 210.0, 180.0, 150.0, 220.0, 250.0],
                    "Brake": [false, false, true, true, false, false],
                    "Distance": distance,
                }
            },
            {
                "driver": "LEC",
                "lapNumber": "COMB-1",
                "tel": {
                    "Time": [0.0, 1100.0, 2200.0, 3100.0, 4000.0, 5100.0],
                    "Speed": [190.0, 215.0, 170.0, 160.0, 210.0, 255.0],
                    "Brake": [false, true, true, false, false, false],
                    "Distance": distance,
                }
            }
        ],
        "sectorDists": [20.0, 40.0],
    });
    let path = dir.path().join("comp.json");
    std::fs::write(&path, serde_json::to_string(&doc).unwrap()).unwrap();
    path
}

fn series(chart: LapChart) -> Vec<DriverSeries> {
    match chart {
        LapChart::Series(series) => series,
        other => panic!("Expected series, got {:?}", other),
    }
}

#[test]
fn test_lap_chart_drops_box_and_yellow_laps() {
    let dir = tempfile::tempdir().unwrap();
    let session = load_driver_laps(&write_session(&dir)).unwrap();
    let request = LapChartRequest {
        remove: FilterOptions {
            box_laps: true,
            track_status: true,
            ..Default::default()
        },
        ..Default::default()
    };

    let series = series(lap_chart(&session, &request).unwrap());
    let lec = series.iter().find(|s| s.driver == "LEC").unwrap();
    let ver = series.iter().find(|s| s.driver == "VER").unwrap();
    assert_eq!(ver.lap_numbers, vec![2, 3, 5]);
    assert_eq!(ver.lap_times, vec![90_000.0, 90_500.0, 91_000.0]);
    assert_eq!(lec.lap_numbers, vec![4, 5]);
    assert_eq!(lec.records.len(), 2);
}

#[test]
fn test_stint_summary_ranks_stints() {
    let dir = tempfile::tempdir().unwrap();
    let session = load_driver_laps(&write_session(&dir)).unwrap();
    let request = LapChartRequest {
        view: LapView::StintSummary,
        remove: FilterOptions {
            box_laps: true,
            ..Default::default()
        },
        ..Default::default()
    };

    let LapChart::StintSummary(rows) = lap_chart(&session, &request).unwrap() else {
        panic!("Expected a stint summary");
    };
    // LEC's first stint only holds box laps and disappears
    let names: Vec<&str> = rows.iter().map(|r| r.stint_name.as_str()).collect();
    assert_eq!(names, vec!["LEC-S2", "VER-S1"]);
    assert_eq!(rows[0].average_pct_off, 0.0);
    assert_eq!(rows[0].average_lap_time, 92_250.0);
    assert_eq!(rows[1].number_of_laps, 4);
    assert!((rows[1].average_pct_off - (97_875.0 / 92_250.0 - 1.0) * 100.0).abs() < 1e-9);
}

#[test]
fn test_race_trace_baseline_ends_on_earliest_finisher() {
    let dir = tempfile::tempdir().unwrap();
    let session = load_driver_laps(&write_session(&dir)).unwrap();
    let request = LapChartRequest {
        view: LapView::RaceTrace,
        ..Default::default()
    };

    let series = series(lap_chart(&session, &request).unwrap());
    let lec = series.iter().find(|s| s.driver == "LEC").unwrap();
    let ver = series.iter().find(|s| s.driver == "VER").unwrap();
    assert!(lec.lap_times[4].abs() < 1e-6);
    // VER finishes 23.5 s after LEC
    assert!((ver.lap_times[4] - 23_500.0).abs() < 1e-6);
}

#[test]
fn test_unknown_driver_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let session = load_driver_laps(&write_session(&dir)).unwrap();
    let request = LapChartRequest {
        drivers: vec!["HAM".to_string()],
        ..Default::default()
    };
    assert!(matches!(
        lap_chart(&session, &request),
        Err(LaptraceError::UnknownDriver { .. })
    ));
}

#[test]
fn test_comparison_deltas_and_sections() {
    let dir = tempfile::tempdir().unwrap();
    let comparison = load_comparison(&write_comparison(&dir)).unwrap();
    let lap_tel = &comparison.laptel;
    assert_eq!(lap_tel.laps()[1].lap_number, LapLabel::Label("COMB-1".to_string()));

    let options = DiffOptions {
        marker: Some(Marker::Fraction(0.2)),
        ..Default::default()
    };
    let delta = channel_delta(lap_tel, Channel::Time, 0, 1, &options).unwrap();
    let expected = [0.1, 0.0, -0.1, 0.0, 0.1, 0.0];
    for (got, want) in delta.iter().zip(expected) {
        assert!((got - want).abs() < 1e-9, "{:?}", delta);
    }

    let distance = lap_tel.channel(0, Channel::Distance).unwrap();
    let splits: Vec<usize> = comparison
        .sector_dists
        .as_deref()
        .unwrap()
        .iter()
        .map(|d| closest_index(&distance, *d).unwrap())
        .collect();
    assert_eq!(splits, vec![2, 4]);
    assert_eq!(split_positions(&distance, &splits).unwrap(), vec![20.0, 40.0]);

    let sections = section_time_diffs(lap_tel, &splits, 0, 1).unwrap();
    let expected = [0.2, 0.2, -0.2, -0.2, 0.1, 0.1];
    for (got, want) in sections.iter().zip(expected) {
        assert!((got - want).abs() < 1e-9, "{:?}", sections);
    }
}

#[test]
fn test_series_written_as_json_lines() {
    let dir = tempfile::tempdir().unwrap();
    let session = load_driver_laps(&write_session(&dir)).unwrap();
    let series = series(lap_chart(&session, &LapChartRequest::default()).unwrap());

    let out = dir.path().join("series.jsonl");
    write_records(&out, &series).unwrap();
    let read: Vec<DriverSeries> = serde_jsonlines::json_lines(&out)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(read, series);
}
