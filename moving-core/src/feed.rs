//! Timer-driven marker layer showing both houses.
//!
//! Every tick the feed draws a fresh padding seed from an RNG seeded once at
//! construction, then asks the surface to redraw. Redraws call
//! [`LiveMarkerFeed::features_in_view`], which is pure for a given tick: it
//! reads a slot snapshot and, when fewer than two houses are known, fills up
//! with seeded random points inside the visible bounds.

use parking_lot::Mutex;
use rand::{Rng, RngCore, SeedableRng, rngs::StdRng};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::model::{BoundingBox, MercatorPoint};
use crate::state::SharedHouseSlots;
use crate::surface::{Feature, Geometry, SurfaceCommand, SurfaceHandle};

const MARKER_COUNT: usize = 2;

#[derive(Debug)]
pub struct LiveMarkerFeed {
    slots: SharedHouseSlots,
    rng: Mutex<StdRng>,
    padding_seed: AtomicU64,
}

impl LiveMarkerFeed {
    pub fn new(slots: SharedHouseSlots, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let padding_seed = AtomicU64::new(rng.next_u64());

        Self { slots, rng: Mutex::new(rng), padding_seed }
    }

    /// Advance to the next padding layout.
    pub fn tick(&self) {
        let next = self.rng.lock().next_u64();
        self.padding_seed.store(next, Ordering::Relaxed);
    }

    pub fn features_in_view(&self, bounds: &BoundingBox) -> Vec<Feature> {
        let mut points: Vec<MercatorPoint> =
            self.slots.snapshot().resolved().map(|c| c.to_mercator()).collect();

        if points.len() < MARKER_COUNT {
            let mut rng = StdRng::seed_from_u64(self.padding_seed.load(Ordering::Relaxed));
            let missing = MARKER_COUNT - points.len();
            points.extend((0..missing).map(|_| random_point(bounds, &mut rng)));
        }

        points
            .into_iter()
            .enumerate()
            .map(|(i, p)| Feature { id: i.to_string(), geometry: Geometry::Point(p) })
            .collect()
    }

    /// Tick every `period`, starting immediately, until the surface goes away.
    pub fn spawn(self: Arc<Self>, period: Duration, surface: SurfaceHandle) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                self.tick();
                if surface.send(SurfaceCommand::RefreshMarkers).is_err() {
                    tracing::debug!("surface closed, stopping marker feed");
                    break;
                }
            }
        })
    }
}

fn random_point(bounds: &BoundingBox, rng: &mut StdRng) -> MercatorPoint {
    MercatorPoint {
        x: sample_axis(bounds.min_x, bounds.max_x, rng),
        y: sample_axis(bounds.min_y, bounds.max_y, rng),
    }
}

/// Uniform draw between `a` and `b` in either order. Ranges the sampler cannot
/// represent collapse to their midpoint, or to 0 when that is not finite either.
fn sample_axis(a: f64, b: f64, rng: &mut StdRng) -> f64 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if hi - lo <= f64::MAX / 2.0 {
        return rng.gen_range(lo..=hi);
    }

    let mid = lo / 2.0 + hi / 2.0;
    if mid.is_finite() { mid } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinate, HouseSlot};
    use crate::state::HouseSlots;
    use crate::surface;

    fn view() -> BoundingBox {
        BoundingBox::new(
            MercatorPoint { x: 1_000_000.0, y: 6_000_000.0 },
            MercatorPoint { x: 2_000_000.0, y: 7_000_000.0 },
        )
    }

    fn point(feature: &Feature) -> MercatorPoint {
        match &feature.geometry {
            Geometry::Point(p) => *p,
            other => panic!("expected point, got {other:?}"),
        }
    }

    #[test]
    fn only_origin_resolved_gives_one_real_and_one_padding_marker() {
        let slots = HouseSlots::new();
        let berlin = Coordinate::new(13.4, 52.5);
        slots.set(HouseSlot::Origin, Some(berlin));
        let feed = LiveMarkerFeed::new(slots, 0);

        let features = feed.features_in_view(&view());

        assert_eq!(features.len(), 2);
        assert_eq!(point(&features[0]), berlin.to_mercator());
        assert!(view().contains(point(&features[1])));
        assert_eq!(features[0].id, "0");
        assert_eq!(features[1].id, "1");
    }

    #[test]
    fn both_resolved_means_no_padding() {
        let slots = HouseSlots::new();
        slots.set(HouseSlot::Origin, Some(Coordinate::new(13.4, 52.5)));
        slots.set(HouseSlot::Destination, Some(Coordinate::new(11.6, 48.1)));
        let feed = LiveMarkerFeed::new(slots, 0);

        let features = feed.features_in_view(&view());

        assert_eq!(features.len(), 2);
        assert_eq!(point(&features[1]), Coordinate::new(11.6, 48.1).to_mercator());
    }

    #[test]
    fn nothing_resolved_pads_two_points_in_view() {
        let feed = LiveMarkerFeed::new(HouseSlots::new(), 3);

        let features = feed.features_in_view(&view());

        assert_eq!(features.len(), 2);
        assert!(features.iter().all(|f| view().contains(point(f))));
    }

    #[test]
    fn padding_is_stable_within_a_tick_and_reproducible_across_feeds() {
        let a = LiveMarkerFeed::new(HouseSlots::new(), 42);
        let b = LiveMarkerFeed::new(HouseSlots::new(), 42);

        assert_eq!(a.features_in_view(&view()), a.features_in_view(&view()));

        let first = a.features_in_view(&view());
        a.tick();
        b.tick();
        assert_ne!(first, a.features_in_view(&view()));
        assert_eq!(a.features_in_view(&view()), b.features_in_view(&view()));
    }

    #[test]
    fn degenerate_view_still_yields_points() {
        let spot = MercatorPoint { x: 5.0, y: 5.0 };
        let bounds = BoundingBox::new(spot, spot);
        let feed = LiveMarkerFeed::new(HouseSlots::new(), 1);

        let features = feed.features_in_view(&bounds);
        assert!(features.iter().all(|f| point(f) == spot));
    }

    #[test]
    fn inverted_view_is_normalised() {
        let inverted = BoundingBox {
            min_x: 2_000_000.0,
            min_y: 7_000_000.0,
            max_x: 1_000_000.0,
            max_y: 6_000_000.0,
        };
        let feed = LiveMarkerFeed::new(HouseSlots::new(), 5);

        let features = feed.features_in_view(&inverted);

        assert_eq!(features.len(), 2);
        assert!(features.iter().all(|f| view().contains(point(f))));
    }

    #[test]
    fn non_finite_view_does_not_panic() {
        let broken = BoundingBox {
            min_x: f64::NAN,
            min_y: f64::NEG_INFINITY,
            max_x: 10.0,
            max_y: f64::INFINITY,
        };
        let huge = BoundingBox { min_x: -f64::MAX, min_y: -f64::MAX, max_x: f64::MAX, max_y: 1.0 };
        let feed = LiveMarkerFeed::new(HouseSlots::new(), 5);

        for bounds in [broken, huge] {
            let features = feed.features_in_view(&bounds);
            assert_eq!(features.len(), 2);
            assert!(features.iter().all(|f| point(f).x.is_finite() && point(f).y.is_finite()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_feed_ticks_until_surface_closes() {
        let (handle, mut rx) = surface::channel();
        let feed = Arc::new(LiveMarkerFeed::new(HouseSlots::new(), 0));

        let task = feed.spawn(Duration::from_millis(1000), handle);

        // First tick fires immediately, the next ones once per period.
        assert_eq!(rx.recv().await, Some(SurfaceCommand::RefreshMarkers));
        tokio::time::advance(Duration::from_millis(1000)).await;
        assert_eq!(rx.recv().await, Some(SurfaceCommand::RefreshMarkers));

        drop(rx);
        tokio::time::advance(Duration::from_millis(1000)).await;
        task.await.unwrap();
    }
}
