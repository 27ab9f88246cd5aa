//! Picks the best moving time out of a forecast.
//!
//! Only daytime slots count: the hour of day (UTC) must be strictly between
//! 8 and 22. Among those, the highest condition id wins (OpenWeather ids grow
//! from thunderstorms towards clear sky), then the warmest temperature, then
//! the earliest slot in provider order.

use chrono::Timelike;
use std::sync::Arc;

use crate::{
    error::ProviderError,
    model::{Coordinate, ForecastSlot},
    provider::Forecaster,
};

const EARLIEST_HOUR_EXCLUSIVE: u32 = 8;
const LATEST_HOUR_EXCLUSIVE: u32 = 22;

pub fn is_eligible(slot: &ForecastSlot) -> bool {
    let hour = slot.timestamp.hour();
    hour > EARLIEST_HOUR_EXCLUSIVE && hour < LATEST_HOUR_EXCLUSIVE
}

pub fn best_slot(slots: &[ForecastSlot]) -> Option<&ForecastSlot> {
    slots.iter().filter(|s| is_eligible(s)).fold(None, |best, slot| match best {
        Some(b) if !is_better(slot, b) => Some(b),
        _ => Some(slot),
    })
}

fn is_better(candidate: &ForecastSlot, current: &ForecastSlot) -> bool {
    candidate.condition_id > current.condition_id
        || (candidate.condition_id == current.condition_id
            && candidate.temperature_c > current.temperature_c)
}

#[derive(Debug, Clone)]
pub struct WeatherAdvisor {
    provider: Arc<dyn Forecaster>,
}

impl WeatherAdvisor {
    pub fn new(provider: Arc<dyn Forecaster>) -> Self {
        Self { provider }
    }

    pub async fn best_time(&self, at: Coordinate) -> Result<ForecastSlot, ProviderError> {
        let slots = self.provider.forecast(at).await?;

        let best = best_slot(&slots).cloned().ok_or(ProviderError::NoEligibleForecast)?;

        tracing::debug!(
            at = %best.timestamp,
            condition = best.condition_id,
            temp = best.temperature_c,
            "picked moving slot out of {} entries",
            slots.len()
        );

        Ok(best)
    }
}
