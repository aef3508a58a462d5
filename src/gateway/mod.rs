use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::js;
use crate::map::LatLng;

mod http;
mod scripted;
pub mod wire;

pub use http::HttpGateway;
pub use scripted::{Reply, ScriptedGateway, SeenRequest};
pub use wire::{AccidentDetail, Conditions, PredictionOutcome, RawPoint, Year};

/// Filter values as read from the selectors; empty means unfiltered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HotspotQuery {
    pub year: String,
    pub weather_code: String,
    pub road_class_code: String,
}

impl HotspotQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("year", self.year.clone()),
            ("weather_code", self.weather_code.clone()),
            ("road_class_code", self.road_class_code.clone()),
        ]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PredictQuery {
    pub at: LatLng,
    pub weather_code: String,
    pub road_class_code: String,
    /// Local wall-clock hour, 0-23.
    pub hour: u32,
}

impl PredictQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = location_params(self.at);
        params.push(("weather_code", self.weather_code.clone()));
        params.push(("road_class_code", self.road_class_code.clone()));
        params.push(("hour", self.hour.to_string()));
        params
    }
}

pub fn location_params(at: LatLng) -> Vec<(&'static str, String)> {
    vec![
        ("lat", js::number_to_string(at.lat)),
        ("lng", js::number_to_string(at.lng)),
    ]
}

/// The analytics backend. HTTP status codes are not inspected: any body
/// that parses as JSON is treated as the endpoint's answer.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn years(&self) -> Result<Vec<Year>>;
    async fn hotspots(&self, query: &HotspotQuery) -> Result<Vec<RawPoint>>;
    async fn details(&self, at: LatLng) -> Result<AccidentDetail>;
    async fn predict(&self, query: &PredictQuery) -> Result<PredictionOutcome>;
}

#[async_trait]
impl<G: Gateway + ?Sized> Gateway for Arc<G> {
    async fn years(&self) -> Result<Vec<Year>> {
        (**self).years().await
    }

    async fn hotspots(&self, query: &HotspotQuery) -> Result<Vec<RawPoint>> {
        (**self).hotspots(query).await
    }

    async fn details(&self, at: LatLng) -> Result<AccidentDetail> {
        (**self).details(at).await
    }

    async fn predict(&self, query: &PredictQuery) -> Result<PredictionOutcome> {
        (**self).predict(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_filters_are_sent_as_empty_strings() {
        let params = HotspotQuery::default().params();
        assert_eq!(
            params,
            vec![
                ("year", String::new()),
                ("weather_code", String::new()),
                ("road_class_code", String::new()),
            ]
        );
    }

    #[test]
    fn test_predict_params_order() {
        let q = PredictQuery {
            at: LatLng { lat: 53.72, lng: -1.86 },
            weather_code: "5".to_string(),
            road_class_code: String::new(),
            hour: 7,
        };
        let keys: Vec<&str> = q.params().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["lat", "lng", "weather_code", "road_class_code", "hour"]);
        assert_eq!(q.params()[0].1, "53.72");
        assert_eq!(q.params()[4].1, "7");
    }
}
