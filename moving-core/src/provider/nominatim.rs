use anyhow::Context;
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use crate::{
    error::ProviderError,
    http::HttpClient,
    model::{Coordinate, GeocodeCandidate},
    provider::lenient_f64,
};

use super::Geocoder;

pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";

/// Forward geocoding through OpenStreetMap's Nominatim search API.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    endpoint: Url,
    http: HttpClient,
}

impl NominatimGeocoder {
    pub fn new(endpoint: &str, http: HttpClient) -> anyhow::Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid nominatim endpoint '{endpoint}'"))?;

        Ok(Self { endpoint, http })
    }

    fn search_url(&self, query: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("q", query).append_pair("format", "json");
        url
    }
}

#[derive(Debug, Deserialize)]
struct NominatimAnswer {
    #[serde(deserialize_with = "lenient_f64")]
    lat: f64,
    #[serde(deserialize_with = "lenient_f64")]
    lon: f64,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    importance: Option<f64>,
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn candidates(&self, query: &str) -> Result<Vec<GeocodeCandidate>, ProviderError> {
        let body = self.http.get(self.search_url(query).as_str()).await?;

        let answers: Vec<NominatimAnswer> = serde_json::from_str(&body)?;

        tracing::debug!(count = answers.len(), "nominatim returned candidates");

        Ok(answers
            .into_iter()
            .map(|a| GeocodeCandidate {
                coordinate: Coordinate::new(a.lon, a.lat),
                importance: a.importance.unwrap_or(0.0),
                display_name: a.display_name,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn geocoder(server: &MockServer) -> NominatimGeocoder {
        let http = HttpClient::new(&HttpConfig::default()).unwrap();
        NominatimGeocoder::new(&format!("{}/search", server.uri()), http).unwrap()
    }

    #[test]
    fn search_url_escapes_query() {
        let http = HttpClient::new(&HttpConfig::default()).unwrap();
        let geocoder = NominatimGeocoder::new(DEFAULT_ENDPOINT, http).unwrap();

        let url = geocoder.search_url("Unter den Linden 1, Berlin & more");

        assert_eq!(
            url.as_str(),
            "https://nominatim.openstreetmap.org/search?q=Unter+den+Linden+1%2C+Berlin+%26+more&format=json"
        );
    }

    #[tokio::test]
    async fn parses_string_coordinates() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "Berlin"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "lat": "52.5170365", "lon": "13.3888599", "display_name": "Berlin, Deutschland", "importance": 0.93 },
                { "lat": "40.0", "lon": "-100.0", "display_name": "Berlin, somewhere else", "importance": 0.4 }
            ])))
            .mount(&server)
            .await;

        let candidates = geocoder(&server).await.candidates("Berlin").await.unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].coordinate, Coordinate::new(13.3888599, 52.5170365));
        assert_eq!(candidates[0].importance, 0.93);
        assert_eq!(candidates[1].display_name, "Berlin, somewhere else");
    }

    #[tokio::test]
    async fn missing_importance_defaults_to_zero() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{ "lat": 1.0, "lon": 2.0 }])),
            )
            .mount(&server)
            .await;

        let candidates = geocoder(&server).await.candidates("x").await.unwrap();

        assert_eq!(candidates[0].importance, 0.0);
        assert_eq!(candidates[0].coordinate, Coordinate::new(2.0, 1.0));
    }

    #[tokio::test]
    async fn malformed_body_is_parse_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>blocked</html>"))
            .mount(&server)
            .await;

        let err = geocoder(&server).await.candidates("x").await.unwrap_err();
        assert!(matches!(err, ProviderError::ParseFailure(_)));
    }

    #[tokio::test]
    async fn server_error_is_provider_unavailable() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = geocoder(&server).await.candidates("x").await.unwrap_err();
        assert!(matches!(err, ProviderError::ProviderUnavailable(_)));
    }
}
