use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Half the circumference of the earth in web-mercator meters.
const MERCATOR_HALF_WORLD: f64 = 20_037_508.342_789_244;
/// Latitudes beyond this are clipped by web-mercator.
const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Geographic position, longitude first.
///
/// An unresolved position is `Option::<Coordinate>::None`, never `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Project onto the spherical (web) mercator plane used by the map.
    pub fn to_mercator(self) -> MercatorPoint {
        let lat = self.lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT);
        let x = self.lon * MERCATOR_HALF_WORLD / 180.0;
        let y = ((90.0 + lat) * PI / 360.0).tan().ln() / (PI / 180.0);

        MercatorPoint { x, y: y * MERCATOR_HALF_WORLD / 180.0 }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.lon, self.lat)
    }
}

/// A point in web-mercator meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MercatorPoint {
    pub x: f64,
    pub y: f64,
}

/// Axis-aligned box in web-mercator meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Build a box from two opposite corners in any order.
    pub fn new(a: MercatorPoint, b: MercatorPoint) -> Self {
        Self {
            min_x: a.x.min(b.x),
            min_y: a.y.min(b.y),
            max_x: a.x.max(b.x),
            max_y: a.y.max(b.y),
        }
    }

    pub fn contains(&self, p: MercatorPoint) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    pub fn center(&self) -> MercatorPoint {
        MercatorPoint {
            x: (self.min_x + self.max_x) / 2.0,
            y: (self.min_y + self.max_y) / 2.0,
        }
    }
}

/// One of the two house slots the user fills in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HouseSlot {
    Origin,
    Destination,
}

impl HouseSlot {
    pub fn as_str(&self) -> &'static str {
        match self {
            HouseSlot::Origin => "origin",
            HouseSlot::Destination => "destination",
        }
    }

    /// Wording used in user-facing messages ("old house" / "new house").
    pub fn house_label(&self) -> &'static str {
        match self {
            HouseSlot::Origin => "old",
            HouseSlot::Destination => "new",
        }
    }

    pub const fn all() -> &'static [HouseSlot] {
        &[HouseSlot::Origin, HouseSlot::Destination]
    }
}

impl std::fmt::Display for HouseSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeCandidate {
    pub coordinate: Coordinate,
    pub importance: f64,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCandidate {
    pub polyline: Vec<Coordinate>,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// One hourly (or three-hourly) entry of a weather forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSlot {
    pub timestamp: DateTime<Utc>,
    pub condition_id: i64,
    pub condition_main: String,
    pub condition_description: String,
    pub temperature_c: f64,
}

/// Everything a successful advisory run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryResult {
    pub route_geometry: Vec<Coordinate>,
    pub duration_seconds: f64,
    pub distance_meters: f64,
    pub best_slot: ForecastSlot,
}

impl AdvisoryResult {
    /// Human-readable advice: travel duration followed by the recommended moving time.
    pub fn advice_text(&self) -> String {
        format!(
            "{}{}",
            duration_sentence(self.duration_seconds),
            forecast_sentence(&self.best_slot)
        )
    }
}

/// Split a duration into whole hours, minutes and seconds.
///
/// Fractional seconds are floored away; negative or NaN input counts as zero.
pub fn split_duration(total_seconds: f64) -> (u64, u64, u64) {
    let total = total_seconds.max(0.0).floor() as u64;
    (total / 3600, (total % 3600) / 60, total % 60)
}

pub fn duration_sentence(total_seconds: f64) -> String {
    let (hours, minutes, seconds) = split_duration(total_seconds);
    format!("Expected moving duration - {hours} hours, {minutes} minutes, {seconds} seconds. ")
}

pub fn forecast_sentence(slot: &ForecastSlot) -> String {
    format!(
        "Best time to move within 5 days - {} because then weather will be {}, {} to be exact; \
         expected temperature - {} degrees Celsius. ",
        slot.timestamp.format("%A, %d %B %Y %H:%M"),
        slot.condition_main.to_lowercase(),
        slot.condition_description.to_lowercase(),
        slot.temperature_c.floor(),
    )
}
