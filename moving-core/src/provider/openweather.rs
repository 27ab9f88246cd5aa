use anyhow::Context;
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Url;
use serde::Deserialize;

use crate::{
    error::ProviderError,
    http::HttpClient,
    model::{Coordinate, ForecastSlot},
};

use super::Forecaster;

/// Free 5 day / 3 hour forecast.
pub const DEFAULT_ENDPOINT: &str = "https://api.openweathermap.org/data/2.5/forecast";

#[derive(Debug, Clone)]
pub struct OpenWeatherForecaster {
    endpoint: Url,
    api_key: String,
    http: HttpClient,
}

impl OpenWeatherForecaster {
    pub fn new(endpoint: &str, api_key: String, http: HttpClient) -> anyhow::Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid openweather endpoint '{endpoint}'"))?;

        Ok(Self { endpoint, api_key, http })
    }

    fn forecast_url(&self, at: Coordinate) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("lon", &at.lon.to_string())
            .append_pair("lat", &at.lat.to_string())
            .append_pair("units", "metric")
            .append_pair("appid", &self.api_key);
        url
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: i64,
    #[serde(default)]
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    #[serde(default)]
    list: Vec<OwForecastEntry>,
    city: Option<OwCity>,
}

impl OwForecastEntry {
    /// Entries without a condition or with an out-of-range timestamp are skipped.
    fn into_slot(self) -> Option<ForecastSlot> {
        let timestamp = DateTime::from_timestamp(self.dt, 0)?;
        let condition = self.weather.into_iter().next()?;

        Some(ForecastSlot {
            timestamp,
            condition_id: condition.id,
            condition_main: condition.main,
            condition_description: condition.description,
            temperature_c: self.main.temp,
        })
    }
}

#[async_trait]
impl Forecaster for OpenWeatherForecaster {
    async fn forecast(&self, at: Coordinate) -> Result<Vec<ForecastSlot>, ProviderError> {
        let body = self.http.get(self.forecast_url(at).as_str()).await?;

        let parsed: OwForecastResponse = serde_json::from_str(&body)?;

        tracing::debug!(
            entries = parsed.list.len(),
            city = parsed.city.as_ref().map(|c| c.name.as_str()).unwrap_or("?"),
            "openweather returned forecast"
        );

        Ok(parsed.list.into_iter().filter_map(OwForecastEntry::into_slot).collect())
    }
}
