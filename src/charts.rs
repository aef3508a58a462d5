//! Chart widget port, chart specs for the two detail charts, and the slot
//! handle that keeps exactly one live chart per slot.

use std::collections::HashMap;

use crate::gateway::AccidentDetail;
use crate::js;
use crate::logging::{log, obj, v_str, Domain, Level};

pub const SEVERITY_PALETTE: [&str; 3] = ["#4caf50", "#ff9800", "#f44336"];
pub const SEVERITY_AXIS_TITLE: &str = "# casualties";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Pie,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Legend {
    Hidden,
    Bottom,
}

#[derive(Clone, Debug, PartialEq)]
pub struct YAxis {
    pub begin_at_zero: bool,
    pub title: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    /// Colours by data index, reused cyclically. Empty means library defaults.
    pub colors: Vec<&'static str>,
    pub legend: Legend,
    pub y_axis: Option<YAxis>,
    pub responsive: bool,
    pub maintain_aspect_ratio: bool,
}

impl ChartSpec {
    fn from_series(kind: ChartKind, series: &[(String, f64)], legend: Legend) -> Self {
        Self {
            kind,
            labels: series.iter().map(|(l, _)| l.clone()).collect(),
            values: series.iter().map(|(_, v)| *v).collect(),
            colors: Vec::new(),
            legend,
            y_axis: None,
            responsive: true,
            maintain_aspect_ratio: false,
        }
    }

    pub fn color_for(&self, index: usize) -> Option<&'static str> {
        if self.colors.is_empty() {
            None
        } else {
            Some(self.colors[index % self.colors.len()])
        }
    }
}

pub fn severity_chart(detail: &AccidentDetail) -> ChartSpec {
    ChartSpec {
        colors: SEVERITY_PALETTE.to_vec(),
        y_axis: Some(YAxis {
            begin_at_zero: true,
            title: Some(SEVERITY_AXIS_TITLE.to_string()),
        }),
        ..ChartSpec::from_series(ChartKind::Bar, &detail.casualty_by_severity, Legend::Hidden)
    }
}

pub fn road_surface_chart(detail: &AccidentDetail) -> ChartSpec {
    ChartSpec::from_series(ChartKind::Pie, &detail.road_surface, Legend::Bottom)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotName {
    Severity,
    RoadSurface,
}

impl SlotName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotName::Severity => "severity",
            SlotName::RoadSurface => "road_surface",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChartId(pub u64);

/// What the dashboard needs from a charting library.
pub trait ChartBackend {
    fn create(&mut self, slot: SlotName, spec: &ChartSpec) -> ChartId;
    fn destroy(&mut self, id: ChartId);
}

/// Owned handle on the single chart instance a canvas may hold.
#[derive(Debug)]
pub struct ChartSlot {
    name: SlotName,
    live: Option<ChartId>,
}

impl ChartSlot {
    pub fn new(name: SlotName) -> Self {
        Self { name, live: None }
    }

    pub fn name(&self) -> SlotName {
        self.name
    }

    pub fn live(&self) -> Option<ChartId> {
        self.live
    }

    /// Releases the current instance, then creates the new one.
    pub fn replace<B: ChartBackend>(&mut self, backend: &mut B, spec: &ChartSpec) -> ChartId {
        self.release(backend);
        let id = backend.create(self.name, spec);
        self.live = Some(id);
        log(
            Level::Debug,
            Domain::Chart,
            "chart_created",
            obj(&[("slot", v_str(self.name.as_str())), ("labels", serde_json::json!(spec.labels))]),
        );
        id
    }

    pub fn release<B: ChartBackend>(&mut self, backend: &mut B) {
        if let Some(id) = self.live.take() {
            backend.destroy(id);
            log(Level::Debug, Domain::Chart, "chart_destroyed", obj(&[("slot", v_str(self.name.as_str()))]));
        }
    }
}

/// Chart backend drawing into text, for terminals and tests.
#[derive(Debug, Default)]
pub struct TextCharts {
    live: HashMap<ChartId, (SlotName, ChartSpec)>,
    next_id: u64,
    pub created_total: u64,
    pub destroyed_total: u64,
}

impl TextCharts {
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn live_in(&self, slot: SlotName) -> Vec<&ChartSpec> {
        self.live
            .values()
            .filter(|(s, _)| *s == slot)
            .map(|(_, spec)| spec)
            .collect()
    }

    pub fn spec(&self, id: ChartId) -> Option<&ChartSpec> {
        self.live.get(&id).map(|(_, spec)| spec)
    }

    pub fn draw(&self, id: ChartId, width: usize) -> Vec<String> {
        match self.spec(id) {
            Some(spec) => draw_spec(spec, width),
            None => Vec::new(),
        }
    }
}

impl ChartBackend for TextCharts {
    fn create(&mut self, slot: SlotName, spec: &ChartSpec) -> ChartId {
        self.next_id += 1;
        self.created_total += 1;
        let id = ChartId(self.next_id);
        self.live.insert(id, (slot, spec.clone()));
        id
    }

    fn destroy(&mut self, id: ChartId) {
        if self.live.remove(&id).is_some() {
            self.destroyed_total += 1;
        }
    }
}

fn finite(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { 0.0 }
}

pub fn draw_spec(spec: &ChartSpec, width: usize) -> Vec<String> {
    let label_w = spec.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let mut lines = Vec::new();
    match spec.kind {
        ChartKind::Bar => {
            if let Some(title) = spec.y_axis.as_ref().and_then(|y| y.title.as_ref()) {
                lines.push(title.clone());
            }
            let max = spec.values.iter().copied().map(finite).fold(0.0, f64::max);
            for (label, v) in spec.labels.iter().zip(&spec.values) {
                let len = if max > 0.0 {
                    ((finite(*v) / max) * width as f64).round() as usize
                } else {
                    0
                };
                lines.push(format!(
                    "{:<w$} |{} {}",
                    label,
                    "\u{2588}".repeat(len),
                    js::number_to_string(*v),
                    w = label_w
                ));
            }
        }
        ChartKind::Pie => {
            let total: f64 = spec.values.iter().copied().map(finite).sum();
            for (label, v) in spec.labels.iter().zip(&spec.values) {
                let share = if total > 0.0 { finite(*v) / total * 100.0 } else { 0.0 };
                lines.push(format!("{:<w$} {:>5.1}% ({})", label, share, js::number_to_string(*v), w = label_w));
            }
            if spec.legend == Legend::Bottom && !spec.labels.is_empty() {
                lines.push(format!("legend: {}", spec.labels.join(", ")));
            }
        }
    }
    lines
}
