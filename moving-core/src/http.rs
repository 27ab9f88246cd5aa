//! Thin wrapper around `reqwest` shared by every provider.
//!
//! Requests carry a browser-like user agent and accept gzip/deflate bodies.
//! There is no retry here; callers decide what a failure means.

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use std::time::Duration;

use crate::config::HttpConfig;
use crate::error::{NetworkError, truncate_body};

/// Some providers reject default library agents, so pretend to be a browser.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:66.0) Gecko/20100101 Firefox/66.0";

#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, NetworkError> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.as_str())
            .gzip(true)
            .deflate(true);

        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self { http: builder.build().map_err(NetworkError::Client)? })
    }

    /// GET `url` and return the response body as text.
    pub async fn get(&self, url: &str) -> Result<String, NetworkError> {
        tracing::debug!(url = %redact(url), "GET");
        self.execute(url, self.http.get(url)).await
    }

    /// POST `body` to `url` with the given content type and header overrides.
    pub async fn post(
        &self,
        url: &str,
        body: Option<&str>,
        content_type: &str,
        headers: &[(String, String)],
    ) -> Result<String, NetworkError> {
        self.send_with_body(Method::POST, url, body, content_type, headers).await
    }

    /// Like [`HttpClient::post`] but with an arbitrary method (PUT, DELETE, ...).
    pub async fn send_with_body(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
        content_type: &str,
        headers: &[(String, String)],
    ) -> Result<String, NetworkError> {
        tracing::debug!(url = %redact(url), %method, "sending request with body");

        let mut header_map = HeaderMap::new();
        header_map.insert(
            CONTENT_TYPE,
            HeaderValue::from_str(content_type).map_err(|e| NetworkError::InvalidHeader {
                name: CONTENT_TYPE.to_string(),
                reason: e.to_string(),
            })?,
        );

        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                NetworkError::InvalidHeader { name: name.clone(), reason: e.to_string() }
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                NetworkError::InvalidHeader { name: name.clone(), reason: e.to_string() }
            })?;
            header_map.insert(header_name, header_value);
        }

        let mut request = self.http.request(method, url).headers(header_map);

        if let Some(body) = body {
            request = request.body(body.as_bytes().to_vec());
        }

        self.execute(url, request).await
    }

    async fn execute(&self, url: &str, request: RequestBuilder) -> Result<String, NetworkError> {
        let res = request.send().await.map_err(|e| transport_error(url, e))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| transport_error(url, e))?;

        if !status.is_success() {
            return Err(NetworkError::Status {
                url: redact(url).to_string(),
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        Ok(body)
    }
}

fn transport_error(url: &str, source: reqwest::Error) -> NetworkError {
    let url = redact(url).to_string();
    if source.is_timeout() {
        NetworkError::Timeout { url }
    } else {
        NetworkError::Transport { url, source: source.without_url() }
    }
}

/// Strip the query string so API keys never reach logs or error messages.
pub(crate) fn redact(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> HttpClient {
        HttpClient::new(&HttpConfig::default()).unwrap()
    }

    #[test]
    fn redact_drops_query() {
        assert_eq!(redact("https://x.test/forecast?appid=SECRET"), "https://x.test/forecast");
        assert_eq!(redact("https://x.test/plain"), "https://x.test/plain");
    }

    #[tokio::test]
    async fn get_sends_browser_user_agent() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let body = client().get(&format!("{}/search", server.uri())).await.unwrap();
        assert_eq!(body, "[]");
    }

    const GZIP_BODY: &[u8] = &[
        31, 139, 8, 0, 0, 0, 0, 0, 2, 3, 43, 200, 73, 204, 204, 83, 40, 73, 173, 40, 81, 72, 43,
        202, 207, 85, 72, 175, 202, 44, 0, 0, 39, 192, 149, 209, 20, 0, 0, 0,
    ];
    const DEFLATE_BODY: &[u8] = &[
        120, 156, 43, 200, 73, 204, 204, 83, 40, 73, 173, 40, 81, 72, 43, 202, 207, 85, 72, 73,
        77, 203, 73, 44, 73, 5, 0, 105, 23, 8, 195,
    ];

    #[tokio::test]
    async fn get_decompresses_gzip_and_deflate_bodies() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gzip"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-encoding", "gzip")
                    .set_body_bytes(GZIP_BODY),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/deflate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-encoding", "deflate")
                    .set_body_bytes(DEFLATE_BODY),
            )
            .mount(&server)
            .await;

        let http = client();
        let gzip = http.get(&format!("{}/gzip", server.uri())).await.unwrap();
        let deflate = http.get(&format!("{}/deflate", server.uri())).await.unwrap();

        assert_eq!(gzip, "plain text from gzip");
        assert_eq!(deflate, "plain text from deflate");
    }

    #[tokio::test]
    async fn get_fails_on_non_success_status() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = client().get(&format!("{}/search?key=SECRET", server.uri())).await.unwrap_err();

        match err {
            NetworkError::Status { url, status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
                assert!(!url.contains("SECRET"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn post_sends_body_content_type_and_headers() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/directions"))
            .and(header("content-type", "application/json"))
            .and(header("authorization", "KEY"))
            .and(body_string("{\"a\":\"ü\"}"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let headers = vec![("Authorization".to_string(), "KEY".to_string())];
        let body = client()
            .post(
                &format!("{}/v2/directions", server.uri()),
                Some("{\"a\":\"ü\"}"),
                "application/json",
                &headers,
            )
            .await
            .unwrap();

        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn header_overrides_replace_user_agent() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(header("user-agent", "custom/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("put"))
            .mount(&server)
            .await;

        let headers = vec![("User-Agent".to_string(), "custom/1.0".to_string())];
        let body = client()
            .send_with_body(Method::PUT, &server.uri(), None, "text/plain", &headers)
            .await
            .unwrap();

        assert_eq!(body, "put");
    }

    #[tokio::test]
    async fn invalid_header_name_is_rejected() {
        let headers = vec![("bad header".to_string(), "x".to_string())];
        let err = client()
            .post("http://127.0.0.1:9/", None, "text/plain", &headers)
            .await
            .unwrap_err();

        assert!(matches!(err, NetworkError::InvalidHeader { .. }));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        // Port 9 (discard) is essentially never listening locally.
        let err = client().get("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, NetworkError::Transport { .. } | NetworkError::Timeout { .. }));
    }
}
