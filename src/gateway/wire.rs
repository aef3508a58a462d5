//! Response shapes of the gateway endpoints.
//!
//! Bodies are decoded through `serde_json::Value` first: the browser client
//! these endpoints serve reads fields loosely, and the panels must print
//! exactly what that client would have printed.

use anyhow::{anyhow, bail, Result};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::js;
use crate::map::LatLng;

/// One entry of `/years`, numeric or string on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "Value")]
pub struct Year(pub String);

impl From<Value> for Year {
    fn from(v: Value) -> Self {
        Year(js::display(Some(&v)))
    }
}

impl Year {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One element of `/hotspots`. Extra fields are ignored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawPoint {
    pub lat: Option<Value>,
    pub lng: Option<Value>,
}

impl RawPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat: serde_json::Number::from_f64(lat).map(Value::Number),
            lng: serde_json::Number::from_f64(lng).map(Value::Number),
        }
    }

    /// Both coordinates truthy. A zero coordinate counts as missing.
    pub fn has_coordinates(&self) -> bool {
        js::is_truthy(self.lat.as_ref()) && js::is_truthy(self.lng.as_ref())
    }

    pub fn position(&self) -> Option<LatLng> {
        if !self.has_coordinates() {
            return None;
        }
        Some(LatLng {
            lat: coordinate(self.lat.as_ref()?)?,
            lng: coordinate(self.lng.as_ref()?)?,
        })
    }
}

fn coordinate(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn parse_years(body: Value) -> Result<Vec<Year>> {
    Ok(serde_json::from_value(body)?)
}

/// Elements that are not objects have no coordinates and are kept so the
/// filter drops them; a `null` element fails the whole response.
pub fn parse_hotspots(body: Value) -> Result<Vec<RawPoint>> {
    let items: Vec<Value> = serde_json::from_value(body)?;
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Null => bail!("hotspot {} is null", i),
            Value::Object(fields) => Ok(RawPoint {
                lat: fields.get("lat").cloned(),
                lng: fields.get("lng").cloned(),
            }),
            _ => Ok(RawPoint::default()),
        })
        .collect()
}

/// Aggregates around one location, label order as the browser sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct AccidentDetail {
    pub total_accidents: String,
    pub casualty_by_severity: Vec<(String, f64)>,
    pub road_surface: Vec<(String, f64)>,
}

impl AccidentDetail {
    pub fn from_json(body: &Value) -> Result<Self> {
        Ok(Self {
            total_accidents: js::display(body.get("total_accidents")),
            casualty_by_severity: series(body, "casualty_by_severity")?,
            road_surface: series(body, "road_surface")?,
        })
    }
}

fn series(body: &Value, field: &str) -> Result<Vec<(String, f64)>> {
    let map: &Map<String, Value> = match body.get(field) {
        Some(Value::Object(m)) => m,
        Some(Value::Null) | None => bail!("missing `{}` in details response", field),
        Some(_) => return Ok(Vec::new()),
    };
    Ok(js::ordered_entries(map)
        .into_iter()
        .map(|(k, v)| (k.clone(), count(v)))
        .collect())
}

fn count(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Conditions echoed back by `/predict`, already rendered as text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conditions {
    pub weather: String,
    pub road_class: String,
    pub road_surface: String,
    pub lighting: String,
    pub hour: String,
}

impl Conditions {
    pub fn summary(&self) -> String {
        format!(
            "Weather: {} \u{b7} Road: {} \u{b7} Surface: {} \u{b7} Lighting: {} \u{b7} Hour: {}",
            self.weather, self.road_class, self.road_surface, self.lighting, self.hour
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PredictionOutcome {
    /// Backend reported an error; carries its message for logs only.
    Error(String),
    Ready { label: String, conditions: Conditions },
}

impl PredictionOutcome {
    pub fn from_json(body: &Value) -> Result<Self> {
        if js::is_truthy(body.get("error")) {
            return Ok(PredictionOutcome::Error(js::display(body.get("error"))));
        }
        let c = match body.get("conditions") {
            Some(Value::Null) | None => return Err(anyhow!("prediction response has no conditions")),
            Some(c) => c,
        };
        Ok(PredictionOutcome::Ready {
            label: js::display(body.get("prediction")),
            conditions: Conditions {
                weather: js::display(c.get("weather")),
                road_class: js::display(c.get("road_class")),
                road_surface: js::display(c.get("road_surface")),
                lighting: js::display(c.get("lighting")),
                hour: js::display(c.get("hour")),
            },
        })
    }
}
