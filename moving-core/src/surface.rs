//! The rendering surface contract and the single-writer command queue feeding it.
//!
//! Workers never touch the surface. They push [`SurfaceCommand`]s through a
//! [`SurfaceHandle`]; one [`SurfaceRunner`] drains the queue and applies them in
//! order, which keeps every surface write on one logical thread.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::feed::LiveMarkerFeed;
use crate::model::{BoundingBox, HouseSlot, MercatorPoint};

pub const ROUTE_LAYER: &str = "Route Layer";
pub const MARKER_LAYER: &str = "House Markers";

/// Width of the whole web-mercator world in meters.
const WORLD_WIDTH: f64 = 2.0 * 20_037_508.342_789_244;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Resolve(HouseSlot),
    Advisory,
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Resolve(slot) => write!(f, "resolve-{slot}"),
            Trigger::Advisory => f.write_str("advisory"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(MercatorPoint),
    LineString(Vec<MercatorPoint>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: String,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    /// Swap a layer's data wholesale and drop whatever it had cached.
    ReplaceLayer { layer: &'static str, features: Vec<Feature> },
    NavigateTo { center: MercatorPoint, zoom: u8 },
    SetSlotText { slot: HouseSlot, text: String },
    SetAdvisoryText(String),
    SetTriggerEnabled { trigger: Trigger, enabled: bool },
    /// Re-query the marker feed for the current view.
    RefreshMarkers,
}

/// Implemented by whatever draws the map and the form.
///
/// All methods are called from the single [`SurfaceRunner`] task.
pub trait RenderingSurface: Send {
    fn replace_layer(&mut self, layer: &str, features: Vec<Feature>);
    fn navigate_to(&mut self, center: MercatorPoint, zoom: u8);
    fn view_bounds(&self) -> BoundingBox;
    fn set_slot_text(&mut self, slot: HouseSlot, text: &str);
    fn set_advisory_text(&mut self, text: &str);
    fn set_trigger_enabled(&mut self, trigger: Trigger, enabled: bool);
}

/// The receiving side is gone; nobody is rendering anymore.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("rendering surface is closed")]
pub struct SurfaceClosed;

/// Cloneable sending side of the surface queue.
#[derive(Debug, Clone)]
pub struct SurfaceHandle {
    tx: mpsc::UnboundedSender<SurfaceCommand>,
}

pub fn channel() -> (SurfaceHandle, mpsc::UnboundedReceiver<SurfaceCommand>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SurfaceHandle { tx }, rx)
}

impl SurfaceHandle {
    pub fn send(&self, command: SurfaceCommand) -> Result<(), SurfaceClosed> {
        self.tx.send(command).map_err(|_| SurfaceClosed)
    }

    /// Fire-and-forget variant for callers that cannot do anything about a closed surface.
    pub(crate) fn publish(&self, command: SurfaceCommand) {
        if self.send(command).is_err() {
            tracing::debug!("surface closed, dropping command");
        }
    }
}

/// A camera over the mercator plane with a fixed pixel viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapView {
    pub center: MercatorPoint,
    pub zoom: u8,
    pub width_px: u32,
    pub height_px: u32,
}

impl Default for MapView {
    fn default() -> Self {
        Self { center: MercatorPoint { x: 0.0, y: 0.0 }, zoom: 2, width_px: 1024, height_px: 768 }
    }
}

impl MapView {
    /// Meters per pixel for 256 px tiles.
    pub fn resolution(&self) -> f64 {
        WORLD_WIDTH / 256.0 / 2f64.powi(i32::from(self.zoom))
    }

    pub fn bounds(&self) -> BoundingBox {
        let half_w = f64::from(self.width_px) * self.resolution() / 2.0;
        let half_h = f64::from(self.height_px) * self.resolution() / 2.0;

        BoundingBox::new(
            MercatorPoint { x: self.center.x - half_w, y: self.center.y - half_h },
            MercatorPoint { x: self.center.x + half_w, y: self.center.y + half_h },
        )
    }
}

/// Drains the command queue into a [`RenderingSurface`].
pub struct SurfaceRunner<S> {
    surface: S,
    feed: Option<Arc<LiveMarkerFeed>>,
    rx: mpsc::UnboundedReceiver<SurfaceCommand>,
}

impl<S: RenderingSurface> SurfaceRunner<S> {
    pub fn new(surface: S, rx: mpsc::UnboundedReceiver<SurfaceCommand>) -> Self {
        Self { surface, feed: None, rx }
    }

    pub fn with_feed(mut self, feed: Arc<LiveMarkerFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    /// Apply commands until every [`SurfaceHandle`] is dropped, then hand the surface back.
    pub async fn run(mut self) -> S {
        while let Some(command) = self.rx.recv().await {
            self.apply(command);
        }
        self.surface
    }

    pub fn apply(&mut self, command: SurfaceCommand) {
        match command {
            SurfaceCommand::ReplaceLayer { layer, features } => {
                self.surface.replace_layer(layer, features)
            }
            SurfaceCommand::NavigateTo { center, zoom } => self.surface.navigate_to(center, zoom),
            SurfaceCommand::SetSlotText { slot, text } => self.surface.set_slot_text(slot, &text),
            SurfaceCommand::SetAdvisoryText(text) => self.surface.set_advisory_text(&text),
            SurfaceCommand::SetTriggerEnabled { trigger, enabled } => {
                self.surface.set_trigger_enabled(trigger, enabled)
            }
            SurfaceCommand::RefreshMarkers => {
                if let Some(feed) = &self.feed {
                    let features = feed.features_in_view(&self.surface.view_bounds());
                    self.surface.replace_layer(MARKER_LAYER, features);
                }
            }
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}
