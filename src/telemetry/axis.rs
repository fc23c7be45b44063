use serde::{Deserialize, Serialize};

use super::Channel;

/// Relative height of the gap between stacked panels.
const PANEL_GAP: f64 = 1.0;
/// Relative height of a dedicated time-difference panel.
const TIME_PANEL_HEIGHT: f64 = 8.0;

/// A stacked chart panel: one telemetry channel, or the time difference on its own axis.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Panel {
    Channel(Channel),
    TimeDiff,
}

impl Panel {
    pub fn title(&self) -> &'static str {
        match self {
            Panel::Channel(Channel::Speed) => "Speed (km/h)",
            Panel::Channel(Channel::Brake) => "Brake ON",
            Panel::Channel(channel) => channel.name(),
            Panel::TimeDiff => "Time Difference (s)",
        }
    }

    pub fn height(&self) -> f64 {
        match self {
            Panel::Channel(Channel::Speed) => 25.0,
            Panel::Channel(Channel::Throttle) => 6.0,
            Panel::Channel(Channel::Brake) => 3.0,
            Panel::Channel(Channel::Drs) => 4.0,
            Panel::Channel(Channel::NGear) => 5.0,
            Panel::Channel(_) => 5.0,
            Panel::TimeDiff => TIME_PANEL_HEIGHT,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PanelDomain {
    pub panel: Panel,
    pub title: String,
    /// Vertical extent as fractions of the chart, bottom then top
    pub domain: (f64, f64),
}

/// Total relative height of `panels` stacked with gaps between them.
pub fn stacked_height(panels: &[Panel]) -> f64 {
    panels.iter().map(Panel::height).sum::<f64>()
        + PANEL_GAP * panels.len().saturating_sub(1) as f64
}

/// Vertical domains for `panels`, the first panel on top.
pub fn panel_domains(panels: &[Panel]) -> Vec<PanelDomain> {
    let total = stacked_height(panels);
    let gap = PANEL_GAP / total;
    let mut bottom = 0.0;
    let mut domains: Vec<PanelDomain> = panels
        .iter()
        .rev()
        .map(|panel| {
            let top = bottom + panel.height() / total;
            let domain = PanelDomain {
                panel: *panel,
                title: panel.title().to_string(),
                domain: (bottom, top),
            };
            bottom = top + gap;
            domain
        })
        .collect();
    domains.reverse();
    domains
}
