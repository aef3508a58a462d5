//! Plain-text rendering of the whole dashboard.

use std::fmt::Write;

use crate::charts::{ChartSlot, TextCharts};
use crate::dashboard::{Dashboard, Notifier};
use crate::filters::SelectControl;
use crate::js::number_to_string;
use crate::map::{CanvasMap, LatLng, Viewport};

const CHART_WIDTH: usize = 30;
const MARKER_LIST_LIMIT: usize = 20;

fn coord(p: LatLng) -> String {
    format!("({}, {})", number_to_string(p.lat), number_to_string(p.lng))
}

fn selector(out: &mut String, name: &str, ctl: &SelectControl) {
    let _ = writeln!(
        out,
        "  {:<11} {} [{} options]",
        name,
        ctl.selected_label(),
        ctl.options().len()
    );
}

fn chart(out: &mut String, title: &str, slot: &ChartSlot, charts: &TextCharts) {
    let _ = writeln!(out, "{}", title);
    match slot.live() {
        Some(id) => {
            for line in charts.draw(id, CHART_WIDTH) {
                let _ = writeln!(out, "  {}", line);
            }
        }
        None => {
            let _ = writeln!(out, "  (empty)");
        }
    }
}

pub fn render<N: Notifier>(d: &Dashboard<CanvasMap, TextCharts, N>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "== Filters");
    selector(&mut out, "year", &d.filters.year);
    selector(&mut out, "weather", &d.filters.weather);
    selector(&mut out, "road class", &d.filters.road_class);

    let _ = writeln!(out, "== Map");
    match d.map() {
        None => {
            let _ = writeln!(out, "  (map not initialised)");
        }
        Some(map) => {
            match map.viewport() {
                Viewport::Centered { center, zoom } => {
                    let _ = writeln!(out, "  view: centre {} zoom {}", coord(center), zoom);
                }
                Viewport::Fitted(bounds) => {
                    if let (Some(sw), Some(ne)) = (bounds.south_west(), bounds.north_east()) {
                        let _ = writeln!(out, "  view: fitted {} .. {}", coord(sw), coord(ne));
                    }
                }
            }
            let _ = writeln!(out, "  markers: {}", d.markers().len());
            for (i, m) in d.markers().iter().take(MARKER_LIST_LIMIT).enumerate() {
                let _ = writeln!(out, "  [{}] {}", i, coord(m.at));
            }
            if d.markers().len() > MARKER_LIST_LIMIT {
                let _ = writeln!(out, "  ... {} more", d.markers().len() - MARKER_LIST_LIMIT);
            }
        }
    }

    let _ = writeln!(out, "== Details");
    let panels = d.panels();
    for line in [&panels.accident_count, &panels.prediction, &panels.conditions] {
        if !line.is_empty() {
            let _ = writeln!(out, "  {}", line);
        }
    }
    chart(&mut out, "-- Casualty severity", d.severity_slot(), d.charts());
    chart(&mut out, "-- Road surface", d.road_surface_slot(), d.charts());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dashboard::RecordingNotifier;
    use crate::gateway::ScriptedGateway;
    use std::sync::Arc;

    #[test]
    fn test_fresh_dashboard_render() {
        let mut d: Dashboard<CanvasMap, TextCharts, RecordingNotifier> = Dashboard::new(
            &Config::default(),
            Arc::new(ScriptedGateway::new()),
            TextCharts::default(),
            RecordingNotifier::default(),
        );
        assert!(render(&d).contains("(map not initialised)"));

        d.init_map();
        let text = render(&d);
        assert!(text.contains("year        All [1 options]"));
        assert!(text.contains("weather     All [7 options]"));
        assert!(text.contains("view: centre (37.0902, -95.7129) zoom 4"));
        assert!(text.contains("markers: 0"));
        assert_eq!(text.matches("(empty)").count(), 2);
    }
}
