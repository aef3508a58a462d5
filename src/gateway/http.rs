use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::config::Config;
use crate::gateway::wire::{self, AccidentDetail, PredictionOutcome, RawPoint, Year};
use crate::gateway::{location_params, Gateway, HotspotQuery, PredictQuery};
use crate::logging::{log_request, RequestTimer};
use crate::map::LatLng;

pub struct HttpGateway {
    client: Client,
    base: Url,
}

impl HttpGateway {
    pub fn new(cfg: &Config) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = cfg.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base: Url::parse(&cfg.gateway_base)
                .with_context(|| format!("invalid GATEWAY_BASE {:?}", cfg.gateway_base))?,
        })
    }

    /// Appends `path` to the base path so a prefixed base (`/api`) survives.
    pub fn endpoint(&self, path: &str, params: &[(&'static str, String)]) -> Url {
        let mut url = self.base.clone();
        let joined = format!("{}{}", self.base.path().trim_end_matches('/'), path);
        url.set_path(&joined);
        url.set_query(None);
        if !params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        url
    }

    async fn get_json(&self, path: &'static str, params: &[(&'static str, String)]) -> Result<Value> {
        let url = self.endpoint(path, params);
        log_request(path, url.query().unwrap_or(""));
        let timer = RequestTimer::start(path);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {}", path))?;
        let body: Value = resp
            .json()
            .await
            .with_context(|| format!("GET {}: response is not JSON", path))?;
        timer.succeed();
        Ok(body)
    }
}

#[async_trait::async_trait]
impl Gateway for HttpGateway {
    async fn years(&self) -> Result<Vec<Year>> {
        let body = self.get_json("/years", &[]).await?;
        wire::parse_years(body).context("GET /years")
    }

    async fn hotspots(&self, query: &HotspotQuery) -> Result<Vec<RawPoint>> {
        let body = self.get_json("/hotspots", &query.params()).await?;
        wire::parse_hotspots(body).context("GET /hotspots")
    }

    async fn details(&self, at: LatLng) -> Result<AccidentDetail> {
        let body = self.get_json("/details", &location_params(at)).await?;
        AccidentDetail::from_json(&body).context("GET /details")
    }

    async fn predict(&self, query: &PredictQuery) -> Result<PredictionOutcome> {
        let body = self.get_json("/predict", &query.params()).await?;
        PredictionOutcome::from_json(&body).context("GET /predict")
    }
}
