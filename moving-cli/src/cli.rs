use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use moving_core::{
    AdvisoryResult, Config, HouseSlot, HouseSlots, LiveMarkerFeed, ProviderId, Providers,
    SurfaceRunner, TripAdvisoryController, TripError,
    geocode::GeocodingResolver,
    http::HttpClient,
    provider::nominatim::{self, NominatimGeocoder},
    surface,
};
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;

use crate::console::ConsoleSurface;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "moving", version, about = "Find a route and a good day to move house")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Configure credentials for a specific provider.
    Configure {
        /// Provider short name: "nominatim", "openrouteservice" (or "ors") or "openweather".
        provider: String,
    },

    /// Route from the old house to the new one and pick the best moving time.
    Advise {
        /// Address of the house you are moving out of.
        origin: String,

        /// Address of the house you are moving into.
        destination: String,
    },

    /// Print the coordinate an address resolves to.
    Geocode {
        address: String,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Advise { origin, destination } => advise(origin, destination).await,
            Command::Geocode { address } => geocode(&address).await,
        }
    }
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    if id.requires_api_key() {
        let api_key = Password::new(&format!("{id} API key:"))
            .without_confirmation()
            .with_display_mode(PasswordDisplayMode::Masked)
            .prompt()
            .context("Failed to read API key")?;
        config.upsert_provider_api_key(id, api_key.trim().to_string());
    }

    let endpoint = Text::new("Endpoint override (empty for the public service):")
        .with_default(config.provider_endpoint(id).unwrap_or_default())
        .prompt()
        .context("Failed to read endpoint")?;
    let endpoint = endpoint.trim();
    config.set_provider_endpoint(id, (!endpoint.is_empty()).then(|| endpoint.to_string()));

    config.save()?;
    println!("Saved {id} settings to {}", Config::config_file_path()?.display());

    Ok(())
}

async fn advise(origin: String, destination: String) -> anyhow::Result<()> {
    let config = load_config()?;
    let providers = Providers::from_config(&config)?;

    let slots = HouseSlots::new();
    let (handle, rx) = surface::channel();

    let feed = Arc::new(LiveMarkerFeed::new(slots.clone(), config.feed.seed));
    let period = Duration::from_millis(config.feed.period_ms.max(1));
    let feed_task = feed.clone().spawn(period, handle.clone());
    let runner =
        tokio::spawn(SurfaceRunner::new(ConsoleSurface::default(), rx).with_feed(feed).run());

    let controller =
        Arc::new(TripAdvisoryController::new(providers, slots, handle, config.map.focus_zoom));

    let (from, to) = tokio::join!(
        controller.spawn_resolve(HouseSlot::Origin, origin),
        controller.spawn_resolve(HouseSlot::Destination, destination),
    );
    for (slot, outcome) in [(HouseSlot::Origin, from?), (HouseSlot::Destination, to?)] {
        if let Err(err) = outcome {
            tracing::debug!(%slot, "resolve did not succeed: {err}");
        }
    }

    let advisory = controller.spawn_advisory().await?;

    stop_feed(feed_task).await;
    drop(controller);

    let console = runner.await.context("Rendering task failed")?;

    advisory_outcome(advisory, &console)
}

/// Abort the marker feed; returns false if it had died on its own.
async fn stop_feed(task: JoinHandle<()>) -> bool {
    task.abort();
    match task.await {
        Err(err) if !err.is_cancelled() => {
            tracing::warn!("marker feed stopped: {err}");
            false
        }
        _ => true,
    }
}

/// The console already printed the advice as it arrived; only failures surface here.
fn advisory_outcome(
    advisory: Result<AdvisoryResult, TripError>,
    console: &ConsoleSurface,
) -> anyhow::Result<()> {
    advisory
        .map(|_| ())
        .map_err(|err| anyhow::Error::new(err).context(console.advisory_text().to_string()))
}

async fn geocode(address: &str) -> anyhow::Result<()> {
    let config = load_config()?;
    let http = HttpClient::new(&config.http)?;
    let geocoder = NominatimGeocoder::new(
        config.provider_endpoint(ProviderId::Nominatim).unwrap_or(nominatim::DEFAULT_ENDPOINT),
        http,
    )?;

    let coordinate = GeocodingResolver::new(Arc::new(geocoder))
        .try_resolve(address)
        .await
        .with_context(|| format!("Failed to geocode '{address}'"))?;

    println!("{coordinate}");
    Ok(())
}

fn load_config() -> anyhow::Result<Config> {
    let mut config = Config::load()?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

fn env_var_name(id: ProviderId) -> String {
    format!("MOVING_{}_API_KEY", id.as_str().to_uppercase())
}

/// `MOVING_<PROVIDER>_API_KEY` wins over the key stored in the config file.
fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    for &id in ProviderId::all() {
        let var = env_var_name(id);
        if let Some(key) = lookup(&var).filter(|key| !key.trim().is_empty()) {
            tracing::debug!("using {var} for {id}");
            config.upsert_provider_api_key(id, key.trim().to_string());
        }
    }
}
