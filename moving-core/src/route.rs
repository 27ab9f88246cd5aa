use std::sync::Arc;

use crate::{
    error::ProviderError,
    model::{Coordinate, RouteCandidate},
    provider::Router,
};

/// Pick the quickest route; the first one wins ties.
pub fn fastest_route(routes: Vec<RouteCandidate>) -> Option<RouteCandidate> {
    routes.into_iter().fold(None, |best, route| match best {
        Some(b) if route.duration_seconds >= b.duration_seconds => Some(b),
        _ => Some(route),
    })
}

#[derive(Debug, Clone)]
pub struct RouteFinder {
    provider: Arc<dyn Router>,
}

impl RouteFinder {
    pub fn new(provider: Arc<dyn Router>) -> Self {
        Self { provider }
    }

    /// Both endpoints must already be resolved; there is no retry.
    pub async fn try_find_route(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<RouteCandidate, ProviderError> {
        let routes = self.provider.routes(from, to).await?;
        let best = fastest_route(routes).ok_or(ProviderError::NoMatch)?;

        tracing::debug!(
            duration_s = best.duration_seconds,
            distance_m = best.distance_meters,
            points = best.polyline.len(),
            "picked fastest route"
        );

        Ok(best)
    }

    pub async fn find_route(&self, from: Coordinate, to: Coordinate) -> Option<RouteCandidate> {
        self.try_find_route(from, to)
            .await
            .inspect_err(|err| tracing::warn!("routing failed: {err}"))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn route(duration: f64) -> RouteCandidate {
        RouteCandidate {
            polyline: vec![Coordinate::new(duration, 1.0), Coordinate::new(2.0, 2.0)],
            distance_meters: duration * 10.0,
            duration_seconds: duration,
        }
    }

    #[derive(Debug)]
    struct FixedRouter(Result<Vec<RouteCandidate>, ()>);

    #[async_trait]
    impl Router for FixedRouter {
        async fn routes(
            &self,
            _from: Coordinate,
            _to: Coordinate,
        ) -> Result<Vec<RouteCandidate>, ProviderError> {
            self.0.clone().map_err(|_| ProviderError::NoMatch)
        }
    }

    #[test]
    fn fastest_route_has_minimum_duration() {
        let routes = vec![route(300.0), route(120.0), route(200.0)];
        let best = fastest_route(routes.clone()).unwrap();

        assert!(routes.iter().all(|r| best.duration_seconds <= r.duration_seconds));
        assert_eq!(best.duration_seconds, 120.0);
    }

    #[test]
    fn fastest_route_keeps_first_on_tie() {
        let mut later = route(100.0);
        later.distance_meters = 1.0;

        let best = fastest_route(vec![route(100.0), later]).unwrap();
        assert_eq!(best.distance_meters, 1000.0);
    }

    #[tokio::test]
    async fn empty_route_list_is_absent() {
        let finder = RouteFinder::new(Arc::new(FixedRouter(Ok(vec![]))));
        let (a, b) = (Coordinate::new(1.0, 1.0), Coordinate::new(2.0, 2.0));

        assert!(matches!(finder.try_find_route(a, b).await, Err(ProviderError::NoMatch)));
        assert!(finder.find_route(a, b).await.is_none());
    }

    #[tokio::test]
    async fn find_route_returns_fastest() {
        let finder = RouteFinder::new(Arc::new(FixedRouter(Ok(vec![route(9.0), route(3.0)]))));

        let best = finder
            .find_route(Coordinate::new(1.0, 1.0), Coordinate::new(2.0, 2.0))
            .await
            .unwrap();

        assert_eq!(best.duration_seconds, 3.0);
    }
}
