use anyhow::Context;
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use crate::{
    config::{RouteRequestMode, RoutingConfig},
    error::ProviderError,
    http::HttpClient,
    model::{Coordinate, RouteCandidate},
};

use super::Router;

pub const DEFAULT_ENDPOINT: &str = "https://api.openrouteservice.org/directions";
pub const DEFAULT_V2_BASE: &str = "https://api.openrouteservice.org/v2/directions";

#[derive(Debug, Clone)]
pub struct OpenRouteServiceRouter {
    endpoint: Url,
    api_key: String,
    profile: String,
    mode: RouteRequestMode,
    http: HttpClient,
}

impl OpenRouteServiceRouter {
    /// `endpoint` overrides the public URL for the configured request mode.
    pub fn new(
        endpoint: Option<&str>,
        api_key: String,
        routing: &RoutingConfig,
        http: HttpClient,
    ) -> anyhow::Result<Self> {
        let endpoint = match (endpoint, routing.mode) {
            (Some(endpoint), _) => endpoint.to_string(),
            (None, RouteRequestMode::Get) => DEFAULT_ENDPOINT.to_string(),
            (None, RouteRequestMode::Post) => {
                format!("{DEFAULT_V2_BASE}/{}/json", routing.profile)
            }
        };

        let endpoint = Url::parse(&endpoint)
            .with_context(|| format!("Invalid openrouteservice endpoint '{endpoint}'"))?;

        Ok(Self {
            endpoint,
            api_key,
            profile: routing.profile.clone(),
            mode: routing.mode,
            http,
        })
    }

    fn directions_url(&self, from: Coordinate, to: Coordinate) -> Url {
        let coordinates = format!("{},{}|{},{}", from.lon, from.lat, to.lon, to.lat);

        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("api_key", &self.api_key)
            .append_pair("coordinates", &coordinates)
            .append_pair("profile", &self.profile)
            .append_pair("preference", "recommended")
            .append_pair("format", "json")
            .append_pair("geometry_format", "polyline")
            .append_pair("instructions", "false")
            .append_pair("optimized", "false");
        url
    }

    async fn fetch(&self, from: Coordinate, to: Coordinate) -> Result<String, ProviderError> {
        match self.mode {
            RouteRequestMode::Get => {
                Ok(self.http.get(self.directions_url(from, to).as_str()).await?)
            }
            RouteRequestMode::Post => {
                let body = serde_json::json!({
                    "coordinates": [[from.lon, from.lat], [to.lon, to.lat]],
                    "instructions": "false",
                    "preference": "recommended",
                })
                .to_string();
                let headers = [("Authorization".to_string(), self.api_key.clone())];

                Ok(self
                    .http
                    .post(self.endpoint.as_str(), Some(&body), "application/json", &headers)
                    .await?)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrsSummary {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    duration: f64,
}

/// The legacy API returns `[[lon, lat], ...]`; v2 returns an encoded polyline.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OrsGeometry {
    Points(Vec<Vec<f64>>),
    Encoded(String),
}

#[derive(Debug, Deserialize)]
struct OrsRoute {
    summary: OrsSummary,
    geometry: Option<OrsGeometry>,
}

#[derive(Debug, Deserialize)]
struct OrsResponse {
    #[serde(default)]
    routes: Vec<OrsRoute>,
}

impl OrsRoute {
    fn into_candidate(self) -> Result<RouteCandidate, ProviderError> {
        let polyline = match self.geometry {
            None => Vec::new(),
            Some(OrsGeometry::Points(points)) => points
                .into_iter()
                .filter_map(|p| match p.as_slice() {
                    [lon, lat, ..] => Some(Coordinate::new(*lon, *lat)),
                    _ => None,
                })
                .collect(),
            Some(OrsGeometry::Encoded(encoded)) => decode_polyline(&encoded).ok_or_else(|| {
                ProviderError::ParseFailure("malformed encoded polyline".to_string())
            })?,
        };

        Ok(RouteCandidate {
            polyline,
            distance_meters: self.summary.distance,
            duration_seconds: self.summary.duration,
        })
    }
}

#[async_trait]
impl Router for OpenRouteServiceRouter {
    async fn routes(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<Vec<RouteCandidate>, ProviderError> {
        let body = self.fetch(from, to).await?;

        let parsed: OrsResponse = serde_json::from_str(&body)?;

        tracing::debug!(count = parsed.routes.len(), "openrouteservice returned routes");

        parsed.routes.into_iter().map(OrsRoute::into_candidate).collect()
    }
}

/// Decode a precision-5 encoded polyline into `(lon, lat)` coordinates.
pub fn decode_polyline(encoded: &str) -> Option<Vec<Coordinate>> {
    let bytes = encoded.as_bytes();
    let mut idx = 0;
    let (mut lat, mut lon) = (0i64, 0i64);
    let mut points = Vec::new();

    while idx < bytes.len() {
        lat = lat.checked_add(next_polyline_value(bytes, &mut idx)?)?;
        lon = lon.checked_add(next_polyline_value(bytes, &mut idx)?)?;
        points.push(Coordinate::new(lon as f64 / 1e5, lat as f64 / 1e5));
    }

    Some(points)
}

fn next_polyline_value(bytes: &[u8], idx: &mut usize) -> Option<i64> {
    let mut result = 0i64;
    let mut shift = 0;

    loop {
        let chunk = i64::from(*bytes.get(*idx)?) - 63;
        if !(0..64).contains(&chunk) || shift > 60 {
            return None;
        }
        *idx += 1;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }

    Some(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}
