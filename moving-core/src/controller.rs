//! Orchestrates geocoding, routing and weather for the two houses.
//!
//! Each trigger is one complete attempt with no retry. While a trigger runs, its
//! affordance stays disabled; a [`TriggerGuard`] re-enables it on every exit
//! path, including a panicking worker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;

use crate::{
    error::{ProviderError, TripError},
    geocode::GeocodingResolver,
    model::{AdvisoryResult, Coordinate, HouseSlot},
    provider::Providers,
    route::RouteFinder,
    state::SharedHouseSlots,
    surface::{Feature, Geometry, ROUTE_LAYER, SurfaceCommand, SurfaceHandle, Trigger},
    weather::WeatherAdvisor,
};

pub const MSG_PRECONDITION: &str = "Get address coordinates first!";
pub const MSG_NO_ROUTE: &str = "Failed to find a path!";
pub const MSG_NO_FORECAST: &str = "Failed to get the weather forecast!";
pub const MSG_NO_SLOT: &str =
    "Failed to find a suitable time to move within the forecast window!";
pub const MSG_ADVICE_ERROR: &str = "An error occurred during advice gathering!";

pub fn resolve_failure_message(slot: HouseSlot, err: &ProviderError) -> String {
    match err {
        ProviderError::EmptyInput => format!("Enter your {} house address!", slot.house_label()),
        _ => format!("Failed to find {} house coordinates!", slot.house_label()),
    }
}

pub fn advisory_failure_message(err: &TripError) -> &'static str {
    match err {
        TripError::PreconditionUnmet => MSG_PRECONDITION,
        TripError::Route(_) => MSG_NO_ROUTE,
        TripError::Weather(ProviderError::NoEligibleForecast) => MSG_NO_SLOT,
        TripError::Weather(_) => MSG_NO_FORECAST,
        TripError::Busy(_) | TripError::Resolve(_) | TripError::Worker(_) => MSG_ADVICE_ERROR,
    }
}

/// Holds a trigger disabled until dropped.
struct TriggerGuard<'a> {
    flag: &'a AtomicBool,
    trigger: Trigger,
    surface: &'a SurfaceHandle,
}

impl Drop for TriggerGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(true, Ordering::Release);
        self.surface
            .publish(SurfaceCommand::SetTriggerEnabled { trigger: self.trigger, enabled: true });
    }
}

#[derive(Debug)]
pub struct TripAdvisoryController {
    resolver: GeocodingResolver,
    routes: RouteFinder,
    weather: WeatherAdvisor,
    slots: SharedHouseSlots,
    surface: SurfaceHandle,
    focus_zoom: u8,
    origin_enabled: AtomicBool,
    destination_enabled: AtomicBool,
    advisory_enabled: AtomicBool,
}

impl TripAdvisoryController {
    pub fn new(
        providers: Providers,
        slots: SharedHouseSlots,
        surface: SurfaceHandle,
        focus_zoom: u8,
    ) -> Self {
        Self {
            resolver: GeocodingResolver::new(providers.geocoder),
            routes: RouteFinder::new(providers.router),
            weather: WeatherAdvisor::new(providers.forecaster),
            slots,
            surface,
            focus_zoom,
            origin_enabled: AtomicBool::new(true),
            destination_enabled: AtomicBool::new(true),
            advisory_enabled: AtomicBool::new(true),
        }
    }

    pub fn slots(&self) -> &SharedHouseSlots {
        &self.slots
    }

    pub fn is_enabled(&self, trigger: Trigger) -> bool {
        self.flag(trigger).load(Ordering::Acquire)
    }

    fn flag(&self, trigger: Trigger) -> &AtomicBool {
        match trigger {
            Trigger::Resolve(HouseSlot::Origin) => &self.origin_enabled,
            Trigger::Resolve(HouseSlot::Destination) => &self.destination_enabled,
            Trigger::Advisory => &self.advisory_enabled,
        }
    }

    fn acquire(&self, trigger: Trigger) -> Result<TriggerGuard<'_>, TripError> {
        let flag = self.flag(trigger);
        if flag.compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return Err(TripError::Busy(trigger));
        }

        self.surface.publish(SurfaceCommand::SetTriggerEnabled { trigger, enabled: false });
        Ok(TriggerGuard { flag, trigger, surface: &self.surface })
    }

    /// Geocode `address` into `slot`. The slot is cleared on any failure.
    pub async fn resolve_slot(
        &self,
        slot: HouseSlot,
        address: &str,
    ) -> Result<Coordinate, TripError> {
        let _guard = self.acquire(Trigger::Resolve(slot))?;

        match self.resolver.try_resolve(address).await {
            Ok(coordinate) => {
                self.slots.set(slot, Some(coordinate));
                tracing::info!(%slot, %coordinate, "house resolved");

                self.surface.publish(SurfaceCommand::SetSlotText {
                    slot,
                    text: coordinate.to_string(),
                });
                self.surface.publish(SurfaceCommand::SetAdvisoryText(String::new()));
                self.surface.publish(SurfaceCommand::NavigateTo {
                    center: coordinate.to_mercator(),
                    zoom: self.focus_zoom,
                });

                Ok(coordinate)
            }
            Err(err) => {
                if !matches!(err, ProviderError::EmptyInput) {
                    tracing::warn!(%slot, "geocoding failed: {err}");
                }
                self.reset_slot(slot, resolve_failure_message(slot, &err));
                Err(TripError::Resolve(err))
            }
        }
    }

    /// Route between both houses and pick a moving time at the old house.
    pub async fn compute_advisory(&self) -> Result<AdvisoryResult, TripError> {
        let _guard = self.acquire(Trigger::Advisory)?;

        let Some((origin, destination)) = self.slots.snapshot().both() else {
            tracing::info!("advisory requested before both houses were resolved");
            self.publish_reset(MSG_PRECONDITION);
            return Err(TripError::PreconditionUnmet);
        };

        match self.advise(origin, destination).await {
            Ok(result) => {
                self.publish_route(&result.route_geometry);
                self.surface.publish(SurfaceCommand::SetAdvisoryText(result.advice_text()));
                tracing::info!(
                    duration_s = result.duration_seconds,
                    distance_m = result.distance_meters,
                    best = %result.best_slot.timestamp,
                    "advisory published"
                );
                Ok(result)
            }
            Err(err) => {
                tracing::warn!("advisory failed: {err}");
                self.publish_reset(advisory_failure_message(&err));
                Err(err)
            }
        }
    }

    async fn advise(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<AdvisoryResult, TripError> {
        let route =
            self.routes.try_find_route(origin, destination).await.map_err(TripError::Route)?;

        if route.polyline.len() < 2 {
            return Err(TripError::Route(ProviderError::RouteUnusable));
        }

        let best_slot = self.weather.best_time(origin).await.map_err(TripError::Weather)?;

        Ok(AdvisoryResult {
            route_geometry: route.polyline,
            duration_seconds: route.duration_seconds,
            distance_meters: route.distance_meters,
            best_slot,
        })
    }

    /// Run [`Self::resolve_slot`] on a worker task.
    pub fn spawn_resolve(
        self: &Arc<Self>,
        slot: HouseSlot,
        address: String,
    ) -> JoinHandle<Result<Coordinate, TripError>> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let worker = {
                let this = Arc::clone(&this);
                tokio::spawn(async move { this.resolve_slot(slot, &address).await })
            };

            worker.await.unwrap_or_else(|join_err| {
                tracing::error!(%slot, "resolve worker failed: {join_err}");
                this.reset_slot(
                    slot,
                    format!(
                        "An error occurred during {} house coordinates search!",
                        slot.house_label()
                    ),
                );
                Err(TripError::Worker(join_err.to_string()))
            })
        })
    }

    /// Run [`Self::compute_advisory`] on a worker task.
    pub fn spawn_advisory(self: &Arc<Self>) -> JoinHandle<Result<AdvisoryResult, TripError>> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let worker = {
                let this = Arc::clone(&this);
                tokio::spawn(async move { this.compute_advisory().await })
            };

            worker.await.unwrap_or_else(|join_err| {
                tracing::error!("advisory worker failed: {join_err}");
                this.publish_reset(MSG_ADVICE_ERROR);
                Err(TripError::Worker(join_err.to_string()))
            })
        })
    }

    fn reset_slot(&self, slot: HouseSlot, message: String) {
        self.slots.set(slot, None);
        self.surface.publish(SurfaceCommand::SetSlotText { slot, text: String::new() });
        self.surface.publish(SurfaceCommand::SetAdvisoryText(message));
    }

    fn publish_route(&self, geometry: &[Coordinate]) {
        let line = geometry.iter().map(|c| c.to_mercator()).collect();
        let features = vec![Feature { id: "route".to_string(), geometry: Geometry::LineString(line) }];

        self.surface.publish(SurfaceCommand::ReplaceLayer { layer: ROUTE_LAYER, features });
    }

    /// Clear the route and show why.
    fn publish_reset(&self, message: &str) {
        self.surface.publish(SurfaceCommand::ReplaceLayer { layer: ROUTE_LAYER, features: vec![] });
        self.surface.publish(SurfaceCommand::SetAdvisoryText(message.to_string()));
    }
}
