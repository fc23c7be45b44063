//! Driver color assignment.
//!
//! Teams are visited in a fixed priority order. Each team takes the first color of its palette that no
//! earlier team has taken; its first driver gets that color and teammates get the next color of the
//! 20-color palette.

use std::collections::{BTreeMap, HashSet};

use itertools::Itertools;
use log::warn;

pub const DEFAULT_DRIVER_COLOR: &str = "#fff";

struct Team {
    name: &'static str,
    drivers: &'static [&'static str],
    palette: &'static [&'static str],
}

/// Teams in priority order.
static TEAMS: [Team; 10] = [
    Team {
        name: "mclaren",
        drivers: &["NOR", "RIC"],
        palette: &["#ff7f0e"],
    },
    Team {
        name: "red bull",
        drivers: &["VER", "PER"],
        palette: &["#1f77b4"],
    },
    Team {
        name: "ferrari",
        drivers: &["LEC", "SAI"],
        palette: &["#d62728"],
    },
    Team {
        name: "mercedes",
        drivers: &["HAM", "RUS"],
        palette: &["#17becf"],
    },
    Team {
        name: "alpine",
        drivers: &["ALO", "OCO"],
        palette: &["#17becf", "#1f77b4", "#bcbd22"],
    },
    Team {
        name: "williams",
        drivers: &["ALB", "LAT"],
        palette: &["#1f77b4", "#7f7f7f"],
    },
    Team {
        name: "aston martin",
        drivers: &["HUL", "STR", "VET"],
        palette: &["#2ca02c"],
    },
    Team {
        name: "alphatauri",
        drivers: &["GAS", "TSU"],
        palette: &["#1f77b4", "#9467bd"],
    },
    Team {
        name: "alfa romeo",
        drivers: &["BOT", "ZHO"],
        palette: &["#d62728", "#2ca02c", "#bcbd22", "#8c564b"],
    },
    Team {
        name: "haas",
        drivers: &["MAG", "MSC"],
        palette: &["#7f7f7f", "#d62728", "#1f77b4", "#e377c2"],
    },
];

/// Lighter or neighbouring shade used for a team's second and later drivers.
pub fn secondary_color(color: &str) -> Option<&'static str> {
    Some(match color {
        "#1f77b4" => "#aec7e8",
        "#aec7e8" => "#ff7f0e",
        "#ff7f0e" => "#ffbb78",
        "#ffbb78" => "#2ca02c",
        "#2ca02c" => "#98df8a",
        "#98df8a" => "#d62728",
        "#d62728" => "#ff9896",
        "#ff9896" => "#9467bd",
        "#9467bd" => "#c5b0d5",
        "#c5b0d5" => "#8c564b",
        "#8c564b" => "#c49c94",
        "#c49c94" => "#e377c2",
        "#e377c2" => "#f7b6d2",
        "#f7b6d2" => "#7f7f7f",
        "#7f7f7f" => "#c7c7c7",
        "#c7c7c7" => "#bcbd22",
        "#bcbd22" => "#dbdb8d",
        "#dbdb8d" => "#17becf",
        "#17becf" => "#8ac6d0",
        _ => return None,
    })
}

/// Team a driver races for, if known.
pub fn team_of(driver: &str) -> Option<&'static str> {
    TEAMS
        .iter()
        .find(|team| team.drivers.iter().any(|d| *d == driver))
        .map(|team| team.name)
}

/// Assigns a color to every driver in `drivers`. Duplicates are ignored and unknown drivers get white.
pub fn assign_colors<S: AsRef<str>>(drivers: &[S]) -> BTreeMap<String, String> {
    let present: HashSet<&str> = drivers.iter().map(|d| d.as_ref()).collect();
    let mut taken: HashSet<&'static str> = HashSet::new();
    let mut colors = BTreeMap::new();

    for team in TEAMS.iter() {
        let team_drivers = team
            .drivers
            .iter()
            .filter(|d| present.contains(**d))
            .collect_vec();
        if team_drivers.is_empty() {
            continue;
        }
        let team_color = match team.palette.iter().find(|c| !taken.contains(**c)) {
            Some(color) => *color,
            None => {
                warn!("Palette of {} is exhausted, reusing its first color", team.name);
                team.palette[0]
            }
        };
        for (i, driver) in team_drivers.into_iter().enumerate() {
            let color = if i == 0 {
                team_color
            } else {
                secondary_color(team_color).unwrap_or(team_color)
            };
            colors.insert(driver.to_string(), color.to_string());
        }
        taken.insert(team_color);
    }

    for driver in present {
        colors
            .entry(driver.to_string())
            .or_insert_with(|| DEFAULT_DRIVER_COLOR.to_string());
    }
    colors
}
