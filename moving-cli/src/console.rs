//! Terminal stand-in for the map and the form.

use moving_core::{
    HouseSlot, RenderingSurface,
    model::{BoundingBox, MercatorPoint},
    surface::{Feature, Geometry, MapView, ROUTE_LAYER, Trigger},
};

/// Prints form updates and keeps just enough state to answer view queries.
#[derive(Debug, Default)]
pub struct ConsoleSurface {
    view: MapView,
    advisory_text: String,
}

impl ConsoleSurface {
    pub fn advisory_text(&self) -> &str {
        &self.advisory_text
    }
}

fn point_count(features: &[Feature]) -> usize {
    features
        .iter()
        .map(|f| match &f.geometry {
            Geometry::Point(_) => 1,
            Geometry::LineString(points) => points.len(),
        })
        .sum()
}

impl RenderingSurface for ConsoleSurface {
    fn replace_layer(&mut self, layer: &str, features: Vec<Feature>) {
        if layer == ROUTE_LAYER {
            match point_count(&features) {
                0 => println!("[map] route cleared"),
                n => println!("[map] route drawn with {n} points"),
            }
        } else {
            tracing::debug!(layer, features = features.len(), "layer refreshed");
        }
    }

    fn navigate_to(&mut self, center: MercatorPoint, zoom: u8) {
        self.view.center = center;
        self.view.zoom = zoom;
        println!("[map] centered on ({:.0}, {:.0}) at zoom {zoom}", center.x, center.y);
    }

    fn view_bounds(&self) -> BoundingBox {
        self.view.bounds()
    }

    fn set_slot_text(&mut self, slot: HouseSlot, text: &str) {
        if text.is_empty() {
            println!("[{} house] cleared", slot.house_label());
        } else {
            println!("[{} house] {text}", slot.house_label());
        }
    }

    fn set_advisory_text(&mut self, text: &str) {
        if !text.is_empty() && text != self.advisory_text {
            println!("[advice] {text}");
        }
        self.advisory_text = text.to_string();
    }

    fn set_trigger_enabled(&mut self, trigger: Trigger, enabled: bool) {
        tracing::debug!(%trigger, enabled, "trigger toggled");
    }
}
