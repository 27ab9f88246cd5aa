use parking_lot::RwLock;
use std::sync::Arc;

use crate::model::{Coordinate, HouseSlot};

/// The two house positions shared by the controller and the marker feed.
///
/// Each slot has its own lock, so writes to one never wait on the other and a
/// write is a single assignment. There is no cross-slot transaction.
#[derive(Debug, Default)]
pub struct HouseSlots {
    origin: RwLock<Option<Coordinate>>,
    destination: RwLock<Option<Coordinate>>,
}

/// Shared handle to [`HouseSlots`].
pub type SharedHouseSlots = Arc<HouseSlots>;

/// Point-in-time copy of both slots.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SlotSnapshot {
    pub origin: Option<Coordinate>,
    pub destination: Option<Coordinate>,
}

impl SlotSnapshot {
    pub fn resolved(&self) -> impl Iterator<Item = Coordinate> {
        self.origin.into_iter().chain(self.destination)
    }

    pub fn both(&self) -> Option<(Coordinate, Coordinate)> {
        Some((self.origin?, self.destination?))
    }
}

impl HouseSlots {
    pub fn new() -> SharedHouseSlots {
        Arc::new(Self::default())
    }

    fn slot(&self, slot: HouseSlot) -> &RwLock<Option<Coordinate>> {
        match slot {
            HouseSlot::Origin => &self.origin,
            HouseSlot::Destination => &self.destination,
        }
    }

    pub fn get(&self, slot: HouseSlot) -> Option<Coordinate> {
        *self.slot(slot).read()
    }

    pub fn set(&self, slot: HouseSlot, value: Option<Coordinate>) {
        *self.slot(slot).write() = value;
    }

    /// Reads the slots one after the other; a concurrent write may land in between.
    pub fn snapshot(&self) -> SlotSnapshot {
        SlotSnapshot { origin: self.get(HouseSlot::Origin), destination: self.get(HouseSlot::Destination) }
    }
}
