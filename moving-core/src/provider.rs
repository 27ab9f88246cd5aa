use crate::{
    Config,
    error::ProviderError,
    http::HttpClient,
    model::{Coordinate, ForecastSlot, GeocodeCandidate, RouteCandidate},
    provider::{
        nominatim::NominatimGeocoder, openrouteservice::OpenRouteServiceRouter,
        openweather::OpenWeatherForecaster,
    },
};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

pub mod nominatim;
pub mod openrouteservice;
pub mod openweather;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Nominatim,
    OpenRouteService,
    OpenWeather,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Nominatim => "nominatim",
            ProviderId::OpenRouteService => "openrouteservice",
            ProviderId::OpenWeather => "openweather",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::Nominatim, ProviderId::OpenRouteService, ProviderId::OpenWeather]
    }

    /// Nominatim is free to use; the others refuse requests without a key.
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, ProviderId::Nominatim)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "nominatim" => Ok(ProviderId::Nominatim),
            "openrouteservice" | "ors" => Ok(ProviderId::OpenRouteService),
            "openweather" => Ok(ProviderId::OpenWeather),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: nominatim, openrouteservice, openweather."
            )),
        }
    }
}

/// Turns free text into ranked coordinate candidates.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    async fn candidates(&self, query: &str) -> Result<Vec<GeocodeCandidate>, ProviderError>;
}

/// Lists driving routes between two points.
#[async_trait]
pub trait Router: Send + Sync + Debug {
    async fn routes(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<Vec<RouteCandidate>, ProviderError>;
}

/// Fetches a multi-day forecast for a point.
#[async_trait]
pub trait Forecaster: Send + Sync + Debug {
    async fn forecast(&self, at: Coordinate) -> Result<Vec<ForecastSlot>, ProviderError>;
}

/// The three external collaborators the trip controller needs.
#[derive(Debug, Clone)]
pub struct Providers {
    pub geocoder: Arc<dyn Geocoder>,
    pub router: Arc<dyn Router>,
    pub forecaster: Arc<dyn Forecaster>,
}

impl Providers {
    /// Construct every provider from config, sharing one HTTP client.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = HttpClient::new(&config.http)?;

        let geocoder = NominatimGeocoder::new(
            config.provider_endpoint(ProviderId::Nominatim).unwrap_or(nominatim::DEFAULT_ENDPOINT),
            http.clone(),
        )?;

        let router = OpenRouteServiceRouter::new(
            config.provider_endpoint(ProviderId::OpenRouteService),
            required_api_key(config, ProviderId::OpenRouteService)?,
            &config.routing,
            http.clone(),
        )?;

        let forecaster = OpenWeatherForecaster::new(
            config
                .provider_endpoint(ProviderId::OpenWeather)
                .unwrap_or(openweather::DEFAULT_ENDPOINT),
            required_api_key(config, ProviderId::OpenWeather)?,
            http,
        )?;

        Ok(Self {
            geocoder: Arc::new(geocoder),
            router: Arc::new(router),
            forecaster: Arc::new(forecaster),
        })
    }
}

fn required_api_key(config: &Config, id: ProviderId) -> anyhow::Result<String> {
    config.provider_api_key(id).map(str::to_owned).ok_or_else(|| {
        anyhow::anyhow!(
            "No API key configured for provider '{id}'.\n\
                 Hint: run `moving configure {id}` and enter your API key."
        )
    })
}

/// Accepts a JSON number or a numeric string; Nominatim sends coordinates as strings.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let s = id.as_str();
            let parsed = ProviderId::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("doesnotexist").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn providers_from_config_errors_when_missing_api_key() {
        let cfg = Config::default();
        let err = Providers::from_config(&cfg).unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("No API key configured for provider 'openrouteservice'"));
        assert!(msg.contains("Hint: run `moving configure"));
    }

    #[test]
    fn providers_from_config_works_when_keys_are_set() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenRouteService, "ORS".to_string());
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OW".to_string());

        assert!(Providers::from_config(&cfg).is_ok());
    }

    #[test]
    fn invalid_endpoint_override_is_rejected() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenRouteService, "ORS".to_string());
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "OW".to_string());
        cfg.set_provider_endpoint(ProviderId::Nominatim, Some("not a url".into()));

        let err = Providers::from_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("nominatim"));
    }

    #[test]
    fn lenient_f64_accepts_numbers_and_strings() {
        #[derive(Deserialize)]
        struct Probe {
            #[serde(deserialize_with = "lenient_f64")]
            v: f64,
        }

        let a: Probe = serde_json::from_str(r#"{"v": 1.5}"#).unwrap();
        let b: Probe = serde_json::from_str(r#"{"v": "-2.25"}"#).unwrap();
        let c = serde_json::from_str::<Probe>(r#"{"v": "north"}"#);

        assert_eq!(a.v, 1.5);
        assert_eq!(b.v, -2.25);
        assert!(c.is_err());
    }
}
