//! Core library for the `moving` CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Geocoding, routing and forecast providers behind async traits
//! - The trip advisory controller and the house slots it writes
//! - A single-writer command queue towards a rendering surface, plus the
//!   live marker feed drawn on it
//!
//! It is used by `moving-cli`, but a graphical front end can drive the same
//! controller by implementing [`RenderingSurface`].

pub mod config;
pub mod controller;
pub mod error;
pub mod feed;
pub mod geocode;
pub mod http;
pub mod model;
pub mod provider;
pub mod route;
pub mod state;
pub mod surface;
pub mod weather;

pub use config::{Config, ProviderConfig};
pub use controller::TripAdvisoryController;
pub use error::{NetworkError, ProviderError, TripError};
pub use feed::LiveMarkerFeed;
pub use model::{AdvisoryResult, Coordinate, ForecastSlot, HouseSlot, RouteCandidate};
pub use provider::{ProviderId, Providers};
pub use state::{HouseSlots, SharedHouseSlots};
pub use surface::{RenderingSurface, SurfaceCommand, SurfaceHandle, SurfaceRunner};
