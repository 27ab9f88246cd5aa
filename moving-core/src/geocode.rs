//! Address to coordinate resolution on top of a [`Geocoder`].

use std::sync::Arc;

use crate::{
    error::ProviderError,
    model::{Coordinate, GeocodeCandidate},
    provider::Geocoder,
};

/// Pick the candidate with the highest importance; the first one wins ties.
pub fn best_candidate(candidates: &[GeocodeCandidate]) -> Option<&GeocodeCandidate> {
    candidates.iter().fold(None, |best, candidate| match best {
        Some(b) if candidate.importance <= b.importance => Some(b),
        _ => Some(candidate),
    })
}

#[derive(Debug, Clone)]
pub struct GeocodingResolver {
    provider: Arc<dyn Geocoder>,
}

impl GeocodingResolver {
    pub fn new(provider: Arc<dyn Geocoder>) -> Self {
        Self { provider }
    }

    /// Resolve `address`, keeping the reason when nothing comes back.
    pub async fn try_resolve(&self, address: &str) -> Result<Coordinate, ProviderError> {
        let query = address.trim();
        if query.is_empty() {
            return Err(ProviderError::EmptyInput);
        }

        let candidates = self.provider.candidates(query).await?;
        let best = best_candidate(&candidates).ok_or(ProviderError::NoMatch)?;

        tracing::debug!(
            name = %best.display_name,
            importance = best.importance,
            "picked geocoding candidate"
        );

        Ok(best.coordinate)
    }

    /// Like [`GeocodingResolver::try_resolve`] but every failure becomes `None`.
    pub async fn resolve(&self, address: &str) -> Option<Coordinate> {
        match self.try_resolve(address).await {
            Ok(coordinate) => Some(coordinate),
            Err(ProviderError::EmptyInput) => None,
            Err(err) => {
                tracing::warn!("geocoding failed: {err}");
                None
            }
        }
    }
}
