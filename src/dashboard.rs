//! Application state and the two controllers that mutate it.
//!
//! Each controller is split into a `begin_*` phase (clears what must not be
//! shown stale, issues a sequence ticket, captures the request) and an
//! `apply_*` phase (accepts a response only if its ticket is still the
//! latest for that slot). The async `load_hotspots` / `show_details` drivers
//! chain the two around the gateway call. Event-driven front ends use the
//! `spawn_*` methods instead: requests run as tasks and their answers come
//! back as `Completion`s, in whatever order the backend produces them.

use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Timelike;
use serde_json::json;
use tokio::sync::mpsc;

use crate::charts::{road_surface_chart, severity_chart, ChartBackend, ChartSlot, SlotName};
use crate::config::Config;
use crate::filters::{self, FilterControls};
use crate::gateway::{AccidentDetail, Gateway, HotspotQuery, PredictQuery, PredictionOutcome, RawPoint};
use crate::logging::{log, log_failure, log_stale, obj, v_str, Domain, Level};
use crate::map::{LatLng, LatLngBounds, MapWidget, MarkerId, MarkerSet, MarkerStyle};
use crate::seq::{RequestSeq, Ticket};

pub const NO_HOTSPOTS: &str = "No hotspots found.";
pub const PREDICTION_ERROR: &str = "Prediction: error";
pub const ACCIDENTS_UNAVAILABLE: &str = "Total accidents: unavailable";

/// Blocking user notification (an alert box in a browser).
pub trait Notifier {
    fn alert(&mut self, message: &str);
}

/// Keeps every alert; used headless and in tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub alerts: Vec<String>,
}

impl Notifier for RecordingNotifier {
    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }
}

/// The three text regions of the detail view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Panels {
    pub accident_count: String,
    pub prediction: String,
    pub conditions: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HotspotOutcome {
    Rendered(usize),
    Empty,
    Failed,
    Stale,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DetailRequest {
    pub at: LatLng,
    pub detail_ticket: Ticket,
    pub predict_ticket: Ticket,
    pub predict: PredictQuery,
}

/// A gateway answer tagged with the ticket it was requested under.
#[derive(Debug)]
pub enum Completion {
    Hotspots(Ticket, Result<Vec<RawPoint>>),
    Details(Ticket, Result<AccidentDetail>),
    Prediction(Ticket, Result<PredictionOutcome>),
}

pub type CompletionSender = mpsc::UnboundedSender<Completion>;

fn local_hour() -> u32 {
    chrono::Local::now().hour()
}

fn failure_notice(what: &str, err: &anyhow::Error) -> String {
    format!("Could not load {}: {:#}", what, err)
}

pub struct Dashboard<M, C, N> {
    pub filters: FilterControls,
    gateway: Arc<dyn Gateway>,
    map: Option<M>,
    map_center: LatLng,
    map_zoom: u8,
    markers: MarkerSet,
    charts: C,
    severity: ChartSlot,
    road_surface: ChartSlot,
    panels: Panels,
    notifier: N,
    hotspot_seq: RequestSeq,
    detail_seq: RequestSeq,
    predict_seq: RequestSeq,
    in_flight: usize,
}

impl<M: MapWidget, C: ChartBackend, N: Notifier> Dashboard<M, C, N> {
    pub fn new(cfg: &Config, gateway: Arc<dyn Gateway>, charts: C, notifier: N) -> Self {
        Self {
            filters: FilterControls::default(),
            gateway,
            map: None,
            map_center: cfg.map_center,
            map_zoom: cfg.map_zoom,
            markers: MarkerSet::default(),
            charts,
            severity: ChartSlot::new(SlotName::Severity),
            road_surface: ChartSlot::new(SlotName::RoadSurface),
            panels: Panels::default(),
            notifier,
            hotspot_seq: RequestSeq::default(),
            detail_seq: RequestSeq::default(),
            predict_seq: RequestSeq::default(),
            in_flight: 0,
        }
    }

    // ---------------------------------------------------------------------
    // Startup
    // ---------------------------------------------------------------------

    /// Map bootstrap, invoked once the map library is ready. Later calls
    /// keep the existing map.
    pub fn init_map(&mut self) {
        if self.map.is_some() {
            return;
        }
        self.map = Some(M::create(self.map_center, self.map_zoom));
        log(
            Level::Info,
            Domain::Map,
            "map_ready",
            obj(&[
                ("lat", json!(self.map_center.lat)),
                ("lng", json!(self.map_center.lng)),
                ("zoom", json!(self.map_zoom)),
            ]),
        );
    }

    pub async fn populate_years(&mut self) {
        filters::populate_years(self.gateway.as_ref(), &mut self.filters.year).await;
    }

    // ---------------------------------------------------------------------
    // Hotspot loader
    // ---------------------------------------------------------------------

    pub fn begin_hotspot_load(&mut self) -> (Ticket, HotspotQuery) {
        if let Some(map) = self.map.as_mut() {
            self.markers.clear(map);
        }
        let ticket = self.hotspot_seq.issue();
        (ticket, self.filters.selection())
    }

    pub fn apply_hotspots(&mut self, ticket: Ticket, result: Result<Vec<RawPoint>>) -> HotspotOutcome {
        if !self.hotspot_seq.is_current(ticket) {
            log_stale("hotspots", ticket.0, self.hotspot_seq.latest());
            return HotspotOutcome::Stale;
        }
        let points = match result {
            Ok(points) => points,
            Err(err) => {
                self.fail("hotspots", Domain::Map, err);
                return HotspotOutcome::Failed;
            }
        };
        let received = points.len();
        let kept: Vec<LatLng> = points.iter().filter_map(RawPoint::position).collect();
        log(
            Level::Info,
            Domain::Map,
            "hotspots_received",
            obj(&[("received", json!(received)), ("kept", json!(kept.len()))]),
        );
        if kept.is_empty() {
            self.notifier.alert(NO_HOTSPOTS);
            return HotspotOutcome::Empty;
        }
        if self.map.is_none() {
            self.fail("hotspots", Domain::Map, anyhow!("map is not ready"));
            return HotspotOutcome::Failed;
        }
        let map = match self.map.as_mut() {
            Some(map) => map,
            None => return HotspotOutcome::Failed,
        };

        self.markers.clear(map);
        let style = MarkerStyle::hotspot();
        let mut bounds = LatLngBounds::default();
        for at in &kept {
            self.markers.place(map, *at, &style);
            bounds.extend(*at);
        }
        map.fit_bounds(&bounds);
        HotspotOutcome::Rendered(kept.len())
    }

    pub async fn load_hotspots(&mut self) -> HotspotOutcome {
        let (ticket, query) = self.begin_hotspot_load();
        let result = self.gateway.hotspots(&query).await;
        self.apply_hotspots(ticket, result)
    }

    // ---------------------------------------------------------------------
    // Detail panel controller
    // ---------------------------------------------------------------------

    pub fn begin_details(&mut self, at: LatLng, hour: u32) -> DetailRequest {
        let selection = self.filters.selection();
        DetailRequest {
            at,
            detail_ticket: self.detail_seq.issue(),
            predict_ticket: self.predict_seq.issue(),
            predict: PredictQuery {
                at,
                weather_code: selection.weather_code,
                road_class_code: selection.road_class_code,
                hour,
            },
        }
    }

    /// Updates the accident count and both charts. Returns false if stale.
    pub fn apply_details(&mut self, ticket: Ticket, result: Result<AccidentDetail>) -> bool {
        if !self.detail_seq.is_current(ticket) {
            log_stale("details", ticket.0, self.detail_seq.latest());
            return false;
        }
        match result {
            Ok(detail) => {
                self.panels.accident_count = format!("Total accidents: {}", detail.total_accidents);
                self.severity.replace(&mut self.charts, &severity_chart(&detail));
                self.road_surface.replace(&mut self.charts, &road_surface_chart(&detail));
            }
            Err(err) => {
                self.panels.accident_count = ACCIDENTS_UNAVAILABLE.to_string();
                self.severity.release(&mut self.charts);
                self.road_surface.release(&mut self.charts);
                self.fail("accident details", Domain::Panel, err);
            }
        }
        true
    }

    /// Updates the prediction and conditions regions. Returns false if stale.
    pub fn apply_prediction(&mut self, ticket: Ticket, result: Result<PredictionOutcome>) -> bool {
        if !self.predict_seq.is_current(ticket) {
            log_stale("predict", ticket.0, self.predict_seq.latest());
            return false;
        }
        match result {
            Ok(PredictionOutcome::Ready { label, conditions }) => {
                self.panels.prediction = format!("Prediction: {}", label);
                self.panels.conditions = conditions.summary();
            }
            Ok(PredictionOutcome::Error(reason)) => {
                log(
                    Level::Warn,
                    Domain::Panel,
                    "prediction_error",
                    obj(&[("msg", v_str(&reason))]),
                );
                self.show_prediction_error();
            }
            Err(err) => {
                log_failure(Domain::Panel, "prediction", &err);
                self.show_prediction_error();
            }
        }
        true
    }

    fn show_prediction_error(&mut self) {
        self.panels.prediction = PREDICTION_ERROR.to_string();
        self.panels.conditions.clear();
    }

    /// Detail view for `at` using the current local hour.
    pub async fn show_details(&mut self, at: LatLng) {
        self.show_details_at(at, local_hour()).await;
    }

    /// Both fetches run concurrently and each result is applied as soon as
    /// it arrives, so a stalled prediction never holds back the counts.
    pub async fn show_details_at(&mut self, at: LatLng, hour: u32) {
        let req = self.begin_details(at, hour);
        let gateway = Arc::clone(&self.gateway);
        let details = gateway.details(req.at);
        let prediction = gateway.predict(&req.predict);
        tokio::pin!(details, prediction);

        let (mut details_done, mut prediction_done) = (false, false);
        while !(details_done && prediction_done) {
            tokio::select! {
                result = &mut details, if !details_done => {
                    details_done = true;
                    self.apply_details(req.detail_ticket, result);
                }
                result = &mut prediction, if !prediction_done => {
                    prediction_done = true;
                    self.apply_prediction(req.predict_ticket, result);
                }
            }
        }
    }

    /// Click handler of a marker: shows the details of its coordinates.
    pub async fn marker_clicked(&mut self, id: MarkerId) -> bool {
        match self.markers.position_of(id) {
            Some(at) => {
                self.show_details(at).await;
                true
            }
            None => false,
        }
    }

    // ---------------------------------------------------------------------
    // Event-driven requests
    // ---------------------------------------------------------------------

    fn dispatch<F>(&mut self, tx: &CompletionSender, request: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = tx.clone();
        tokio::spawn(async move {
            // the receiver is gone only when the front end is shutting down
            let _ = tx.send(request.await);
        });
    }

    /// Starts a hotspot load in the background. Its answer arrives on `tx`.
    pub fn spawn_hotspot_load(&mut self, tx: &CompletionSender) -> Ticket {
        let (ticket, query) = self.begin_hotspot_load();
        let gateway = Arc::clone(&self.gateway);
        self.dispatch(tx, async move {
            Completion::Hotspots(ticket, gateway.hotspots(&query).await)
        });
        ticket
    }

    pub fn spawn_details(&mut self, at: LatLng, tx: &CompletionSender) -> DetailRequest {
        self.spawn_details_at(at, local_hour(), tx)
    }

    /// Starts the detail and prediction fetches as two independent tasks.
    pub fn spawn_details_at(&mut self, at: LatLng, hour: u32, tx: &CompletionSender) -> DetailRequest {
        let req = self.begin_details(at, hour);

        let gateway = Arc::clone(&self.gateway);
        let ticket = req.detail_ticket;
        self.dispatch(tx, async move {
            Completion::Details(ticket, gateway.details(at).await)
        });

        let gateway = Arc::clone(&self.gateway);
        let ticket = req.predict_ticket;
        let query = req.predict.clone();
        self.dispatch(tx, async move {
            Completion::Prediction(ticket, gateway.predict(&query).await)
        });
        req
    }

    /// Applies an answer from a spawned request. Returns false if stale.
    pub fn complete(&mut self, done: Completion) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        match done {
            Completion::Hotspots(ticket, result) => self.apply_hotspots(ticket, result) != HotspotOutcome::Stale,
            Completion::Details(ticket, result) => self.apply_details(ticket, result),
            Completion::Prediction(ticket, result) => self.apply_prediction(ticket, result),
        }
    }

    /// Spawned requests whose answers have not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    fn fail(&mut self, what: &str, domain: Domain, err: anyhow::Error) {
        log_failure(domain, what, &err);
        self.notifier.alert(&failure_notice(what, &err));
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn map(&self) -> Option<&M> {
        self.map.as_ref()
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn charts(&self) -> &C {
        &self.charts
    }

    pub fn severity_slot(&self) -> &ChartSlot {
        &self.severity
    }

    pub fn road_surface_slot(&self) -> &ChartSlot {
        &self.road_surface
    }

    pub fn panels(&self) -> &Panels {
        &self.panels
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }
}
