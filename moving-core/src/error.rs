use thiserror::Error;

use crate::surface::Trigger;

/// Failure of a single HTTP exchange.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned status {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Why a provider lookup produced nothing usable.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no address given")]
    EmptyInput,

    #[error("provider unavailable: {0}")]
    ProviderUnavailable(#[from] NetworkError),

    #[error("provider returned no usable candidates")]
    NoMatch,

    #[error("failed to parse provider response: {0}")]
    ParseFailure(String),

    #[error("no forecast entry falls between 08:00 and 22:00")]
    NoEligibleForecast,

    #[error("route has fewer than two points")]
    RouteUnusable,
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::ParseFailure(err.to_string())
    }
}

/// Outcome of a user trigger on the trip controller that did not succeed.
#[derive(Debug, Error)]
pub enum TripError {
    #[error("{0} trigger is already running")]
    Busy(Trigger),

    #[error("both house coordinates must be resolved first")]
    PreconditionUnmet,

    #[error("failed to resolve address: {0}")]
    Resolve(#[source] ProviderError),

    #[error("failed to find a route: {0}")]
    Route(#[source] ProviderError),

    #[error("failed to pick a moving time: {0}")]
    Weather(#[source] ProviderError),

    #[error("worker failed: {0}")]
    Worker(String),
}

/// Trim a response body so it fits into an error message.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
