//! Map widget port and the marker bookkeeping built on top of it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Smallest box covering every extended point; empty until the first one.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LatLngBounds {
    corners: Option<(LatLng, LatLng)>,
}

impl LatLngBounds {
    pub fn extend(&mut self, p: LatLng) {
        self.corners = Some(match self.corners {
            None => (p, p),
            Some((sw, ne)) => (
                LatLng { lat: sw.lat.min(p.lat), lng: sw.lng.min(p.lng) },
                LatLng { lat: ne.lat.max(p.lat), lng: ne.lng.max(p.lng) },
            ),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.corners.is_none()
    }

    pub fn south_west(&self) -> Option<LatLng> {
        self.corners.map(|(sw, _)| sw)
    }

    pub fn north_east(&self) -> Option<LatLng> {
        self.corners.map(|(_, ne)| ne)
    }

    pub fn center(&self) -> Option<LatLng> {
        self.corners.map(|(sw, ne)| LatLng {
            lat: (sw.lat + ne.lat) / 2.0,
            lng: (sw.lng + ne.lng) / 2.0,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MarkerStyle {
    pub scale: f64,
    pub fill_color: &'static str,
    pub fill_opacity: f64,
    pub stroke_weight: f64,
}

impl MarkerStyle {
    /// Small filled red circle used for every hotspot.
    pub fn hotspot() -> Self {
        Self {
            scale: 6.0,
            fill_color: "red",
            fill_opacity: 0.7,
            stroke_weight: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Viewport {
    Centered { center: LatLng, zoom: u8 },
    Fitted(LatLngBounds),
}

/// What the dashboard needs from a mapping library.
pub trait MapWidget {
    /// Called once, when the hosting library is ready.
    fn create(center: LatLng, zoom: u8) -> Self
    where
        Self: Sized;
    fn add_marker(&mut self, at: LatLng, style: &MarkerStyle) -> MarkerId;
    fn remove_marker(&mut self, id: MarkerId);
    fn fit_bounds(&mut self, bounds: &LatLngBounds);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedMarker {
    pub id: MarkerId,
    pub at: LatLng,
}

/// Markers currently on the map. At most one set is live; `clear` always
/// runs before a new set is placed.
#[derive(Debug, Default)]
pub struct MarkerSet {
    live: Vec<PlacedMarker>,
}

impl MarkerSet {
    pub fn clear<M: MapWidget>(&mut self, map: &mut M) {
        for m in self.live.drain(..) {
            map.remove_marker(m.id);
        }
    }

    pub fn place<M: MapWidget>(&mut self, map: &mut M, at: LatLng, style: &MarkerStyle) -> MarkerId {
        let id = map.add_marker(at, style);
        self.live.push(PlacedMarker { id, at });
        id
    }

    /// Coordinates bound to a marker's click handler.
    pub fn position_of(&self, id: MarkerId) -> Option<LatLng> {
        self.live.iter().find(|m| m.id == id).map(|m| m.at)
    }

    pub fn get(&self, index: usize) -> Option<&PlacedMarker> {
        self.live.get(index)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlacedMarker> {
        self.live.iter()
    }
}

/// Headless map: keeps markers and viewport in memory.
#[derive(Clone, Debug)]
pub struct CanvasMap {
    markers: BTreeMap<MarkerId, (LatLng, MarkerStyle)>,
    next_id: u64,
    viewport: Viewport,
    /// Markers ever added, including removed ones.
    pub added_total: u64,
}

impl CanvasMap {
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn marker(&self, id: MarkerId) -> Option<&(LatLng, MarkerStyle)> {
        self.markers.get(&id)
    }
}

impl MapWidget for CanvasMap {
    fn create(center: LatLng, zoom: u8) -> Self {
        Self {
            markers: BTreeMap::new(),
            next_id: 0,
            viewport: Viewport::Centered { center, zoom },
            added_total: 0,
        }
    }

    fn add_marker(&mut self, at: LatLng, style: &MarkerStyle) -> MarkerId {
        self.next_id += 1;
        self.added_total += 1;
        let id = MarkerId(self.next_id);
        self.markers.insert(id, (at, style.clone()));
        id
    }

    fn remove_marker(&mut self, id: MarkerId) {
        self.markers.remove(&id);
    }

    fn fit_bounds(&mut self, bounds: &LatLngBounds) {
        self.viewport = Viewport::Fitted(*bounds);
    }
}
