use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use super::loader::ColumnNames;
use super::model::{Column, Record, Table};

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Inclusive latitude/longitude window a point must fall in to be shown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeoBounds {
    /// Every valid coordinate on Earth.
    pub const WORLD: GeoBounds = GeoBounds {
        min_lat: -90.0,
        max_lat: 90.0,
        min_lon: -180.0,
        max_lon: 180.0,
    };

    /// Mainland Colombia.
    pub const COLOMBIA: GeoBounds = GeoBounds {
        min_lat: -4.2,
        max_lat: 12.5,
        min_lon: -79.0,
        max_lon: -66.0,
    };

    /// Whether the point is finite and inside the window.
    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude.is_finite()
            && longitude.is_finite()
            && (self.min_lat..=self.max_lat).contains(&latitude)
            && (self.min_lon..=self.max_lon).contains(&longitude)
    }

    /// Intersection with [`GeoBounds::WORLD`]. An inverted window contains
    /// nothing, which is the right answer for nonsense configuration.
    pub fn within_world(self) -> GeoBounds {
        GeoBounds {
            min_lat: self.min_lat.max(Self::WORLD.min_lat),
            max_lat: self.max_lat.min(Self::WORLD.max_lat),
            min_lon: self.min_lon.max(Self::WORLD.min_lon),
            max_lon: self.max_lon.min(Self::WORLD.max_lon),
        }
    }
}

impl Default for GeoBounds {
    fn default() -> Self {
        Self::WORLD
    }
}

// ---------------------------------------------------------------------------
// Points
// ---------------------------------------------------------------------------

/// A validated location with the labels shown in its tooltip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Header name → display text. Missing cells are omitted.
    pub label_fields: BTreeMap<String, String>,
}

/// The points of a projection plus how many rows were left off the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoProjection {
    pub points: Vec<GeoPoint>,
    pub skipped: usize,
}

/// Turns table rows into map points.
#[derive(Debug, Clone, Default)]
pub struct GeoProjector {
    bounds: GeoBounds,
    names: ColumnNames,
}

impl GeoProjector {
    pub fn new(bounds: GeoBounds, names: ColumnNames) -> Self {
        GeoProjector {
            bounds: bounds.within_world(),
            names,
        }
    }

    pub fn bounds(&self) -> GeoBounds {
        self.bounds
    }

    /// Project every eligible row. Rows without a region, with a missing or
    /// non-finite coordinate, or outside the bounds are skipped.
    pub fn project(&self, table: &Table) -> GeoProjection {
        let points: Vec<GeoPoint> = table.iter().filter_map(|r| self.point(r)).collect();
        let skipped = table.len() - points.len();
        debug!("projected {} points, skipped {skipped}", points.len());
        GeoProjection { points, skipped }
    }

    fn point(&self, record: &Record) -> Option<GeoPoint> {
        if record.region.is_none() {
            return None;
        }
        let (latitude, longitude) = (record.latitude?, record.longitude?);
        if !self.bounds.contains(latitude, longitude) {
            return None;
        }

        let label_fields = [Column::Region, Column::Gender, Column::Age]
            .into_iter()
            .filter_map(|c| {
                let value = record.get(c);
                (!value.is_null()).then(|| (self.names.header(c).to_string(), value.to_string()))
            })
            .collect();

        Some(GeoPoint {
            latitude,
            longitude,
            label_fields,
        })
    }
}

/// Map points for every valid row, using world bounds and default headers.
pub fn project(table: &Table) -> Vec<GeoPoint> {
    GeoProjector::default().project(table).points
}

/// Map points restricted to `bounds`.
pub fn project_within(table: &Table, bounds: GeoBounds) -> Vec<GeoPoint> {
    GeoProjector::new(bounds, ColumnNames::default())
        .project(table)
        .points
}

/// Mean location of `points`, for centring a map.
pub fn centroid(points: &[GeoPoint]) -> Option<(f64, f64)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let lat = points.iter().map(|p| p.latitude).sum::<f64>() / n;
    let lon = points.iter().map(|p| p.longitude).sum::<f64>() / n;
    Some((lat, lon))
}
