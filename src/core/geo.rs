use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::core::constants::{MAX_LATITUDE, MICRODEGREES};

/// A WGS84 coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds a coordinate from the microdegree integers used in map file headers
    pub fn from_microdegrees(lat: i32, lng: i32) -> Self {
        Self::new(lat as f64 / MICRODEGREES, lng as f64 / MICRODEGREES)
    }

    /// Converts back to microdegrees, rounding to the nearest unit
    pub fn to_microdegrees(&self) -> (i32, i32) {
        (
            (self.lat * MICRODEGREES).round() as i32,
            (self.lng * MICRODEGREES).round() as i32,
        )
    }

    /// Validates that the coordinates are within valid ranges
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }

    /// Clamps latitude to the range representable in Web Mercator
    pub fn clamp_lat(lat: f64) -> f64 {
        lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Axis-aligned geographic bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Creates bounds from `(min_lat, min_lng, max_lat, max_lng)`
    pub fn from_coords(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self::new(LatLng::new(south, west), LatLng::new(north, east))
    }

    pub fn min_lat(&self) -> f64 {
        self.south_west.lat
    }

    pub fn min_lng(&self) -> f64 {
        self.south_west.lng
    }

    pub fn max_lat(&self) -> f64 {
        self.north_east.lat
    }

    pub fn max_lng(&self) -> f64 {
        self.north_east.lng
    }

    /// True when both corners are valid coordinates and the box is not inverted
    pub fn is_valid(&self) -> bool {
        self.south_west.is_valid()
            && self.north_east.is_valid()
            && self.south_west.lat <= self.north_east.lat
            && self.south_west.lng <= self.north_east.lng
    }

    pub fn contains(&self, point: &LatLng) -> bool {
        point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
    }

    /// Edges touching counts as intersecting
    pub fn intersects(&self, other: &LatLngBounds) -> bool {
        !(other.north_east.lat < self.south_west.lat
            || other.south_west.lat > self.north_east.lat
            || other.north_east.lng < self.south_west.lng
            || other.south_west.lng > self.north_east.lng)
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }

    /// Area in square degrees; only meaningful for ordering boxes by size
    pub fn area(&self) -> f64 {
        if !self.is_valid() {
            return 0.0;
        }
        (self.north_east.lat - self.south_west.lat) * (self.north_east.lng - self.south_west.lng)
    }

    pub fn union(&self, other: &LatLngBounds) -> LatLngBounds {
        LatLngBounds::from_coords(
            self.south_west.lat.min(other.south_west.lat),
            self.south_west.lng.min(other.south_west.lng),
            self.north_east.lat.max(other.north_east.lat),
            self.north_east.lng.max(other.north_east.lng),
        )
    }

    /// Union of every box in `bounds`, `None` for an empty iterator
    pub fn union_all<'a>(bounds: impl IntoIterator<Item = &'a LatLngBounds>) -> Option<Self> {
        bounds
            .into_iter()
            .fold(None, |acc: Option<LatLngBounds>, b| match acc {
                Some(acc) => Some(acc.union(b)),
                None => Some(*b),
            })
    }
}

/// Slippy-map tile address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: u32,
    pub y: u32,
    pub z: u8,
}

impl TileCoord {
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// The tile containing `lat_lng` at `zoom`
    pub fn from_lat_lng(lat_lng: &LatLng, zoom: u8) -> Self {
        let lat_rad = LatLng::clamp_lat(lat_lng.lat).to_radians();
        let n = 2_f64.powi(zoom as i32);
        let max_index = (n as u32).saturating_sub(1);

        let x = ((lat_lng.lng + 180.0) / 360.0 * n).floor() as u32;
        let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n).floor() as u32;

        Self::new(x.min(max_index), y.min(max_index), zoom)
    }

    /// North-west corner of the tile
    pub fn to_lat_lng(&self) -> LatLng {
        tile_corner(self.x as f64, self.y as f64, self.z)
    }

    pub fn bounds(&self) -> LatLngBounds {
        let nw = self.to_lat_lng();
        let se = tile_corner(self.x as f64 + 1.0, self.y as f64 + 1.0, self.z);
        LatLngBounds::from_coords(se.lat, nw.lng, nw.lat, se.lng)
    }

    pub fn is_valid(&self) -> bool {
        match 1_u64.checked_shl(self.z as u32) {
            Some(tiles_per_axis) => {
                (self.x as u64) < tiles_per_axis && (self.y as u64) < tiles_per_axis
            }
            None => false,
        }
    }
}

/// Web Mercator tile grid position to coordinate
fn tile_corner(x: f64, y: f64, zoom: u8) -> LatLng {
    let n = 2_f64.powi(zoom as i32);
    let lng = x / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees();
    LatLng::new(lat, lng)
}
