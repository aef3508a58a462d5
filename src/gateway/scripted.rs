use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde_json::Value;

use crate::gateway::wire::{self, AccidentDetail, PredictionOutcome, RawPoint, Year};
use crate::gateway::{location_params, Gateway, HotspotQuery, PredictQuery};
use crate::map::LatLng;

/// A canned answer for one request.
#[derive(Clone, Debug)]
pub enum Reply {
    Json(Value),
    /// Transport-level failure (connection refused, body not JSON, ...).
    Fail(String),
    /// The inner reply, delivered after a wait.
    After(Duration, Box<Reply>),
    /// A backend that accepts the request and never answers.
    Stall,
}

impl Reply {
    pub fn after(wait: Duration, reply: Reply) -> Self {
        Reply::After(wait, Box::new(reply))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeenRequest {
    pub path: &'static str,
    pub params: Vec<(&'static str, String)>,
}

/// In-memory gateway answering from per-endpoint reply queues.
///
/// Bodies go through the same decoding as `HttpGateway`, so a scripted
/// session exercises everything but the socket.
#[derive(Default)]
pub struct ScriptedGateway {
    replies: Mutex<HashMap<&'static str, VecDeque<Reply>>>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, path: &'static str, reply: Reply) -> &Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.entry(path).or_default().push_back(reply);
        }
        self
    }

    pub fn push_json(&self, path: &'static str, body: Value) -> &Self {
        self.push(path, Reply::Json(body))
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Logs the request and takes the next queued reply for `path`.
    fn take(&self, path: &'static str, params: Vec<(&'static str, String)>) -> Result<Option<Reply>> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(SeenRequest { path, params });
        }
        let mut replies = self
            .replies
            .lock()
            .map_err(|_| anyhow!("scripted gateway poisoned"))?;
        Ok(replies.get_mut(path).and_then(VecDeque::pop_front))
    }

    async fn answer(&self, path: &'static str, params: Vec<(&'static str, String)>) -> Result<Value> {
        let mut reply = match self.take(path, params)? {
            Some(reply) => reply,
            None => return Err(anyhow!("GET {}: no scripted reply", path)),
        };
        loop {
            match reply {
                Reply::Json(body) => return Ok(body),
                Reply::Fail(msg) => return Err(anyhow!("GET {}: {}", path, msg)),
                Reply::After(wait, next) => {
                    tokio::time::sleep(wait).await;
                    reply = *next;
                }
                Reply::Stall => return std::future::pending().await,
            }
        }
    }
}

#[async_trait::async_trait]
impl Gateway for ScriptedGateway {
    async fn years(&self) -> Result<Vec<Year>> {
        wire::parse_years(self.answer("/years", Vec::new()).await?)
    }

    async fn hotspots(&self, query: &HotspotQuery) -> Result<Vec<RawPoint>> {
        wire::parse_hotspots(self.answer("/hotspots", query.params()).await?)
    }

    async fn details(&self, at: LatLng) -> Result<AccidentDetail> {
        AccidentDetail::from_json(&self.answer("/details", location_params(at)).await?)
    }

    async fn predict(&self, query: &PredictQuery) -> Result<PredictionOutcome> {
        PredictionOutcome::from_json(&self.answer("/predict", query.params()).await?)
    }
}
