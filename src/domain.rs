//! Core types shared across the engine: orders, storage areas, temperature
//! classes, residencies and ledger entries.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An order's ideal temperature class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Temp {
    Hot,
    Cold,
    Room,
}

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Temp::Hot => "hot",
            Temp::Cold => "cold",
            Temp::Room => "room",
        };
        write!(f, "{s}")
    }
}

/// One of the three bounded storage areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    Heater,
    Cooler,
    Shelf,
}

impl Area {
    pub const fn capacity(self) -> usize {
        match self {
            Area::Heater => HEATER_CAPACITY,
            Area::Cooler => COOLER_CAPACITY,
            Area::Shelf => SHELF_CAPACITY,
        }
    }

    /// The area that `temp` ideally resides in.
    pub const fn ideal_for(temp: Temp) -> Area {
        match temp {
            Temp::Hot => Area::Heater,
            Temp::Cold => Area::Cooler,
            Temp::Room => Area::Shelf,
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Area::Heater => "heater",
            Area::Cooler => "cooler",
            Area::Shelf => "shelf",
        };
        write!(f, "{s}")
    }
}

pub const HEATER_CAPACITY: usize = 6;
pub const COOLER_CAPACITY: usize = 6;
pub const SHELF_CAPACITY: usize = 12;

/// Immutable order record, as delivered by the challenge server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub name: String,
    pub temp: Temp,
    #[serde(default)]
    pub price: f64,
    /// Freshness budget, in whole seconds. Always strictly positive.
    pub freshness: u64,
}

impl Order {
    pub fn ideal_area(&self) -> Area {
        Area::ideal_for(self.temp)
    }
}

/// (order, area, entered-at) while an order lives inside the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Residency {
    pub order: Order,
    pub area: Area,
    /// Unix time in microseconds at which this residency began.
    pub entered_at_micros: u64,
}

impl Residency {
    pub fn is_ideal(&self) -> bool {
        self.order.ideal_area() == self.area
    }
}

/// One of the four actions recorded on the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Place,
    Move,
    Pickup,
    Discard,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::Place => "place",
            ActionKind::Move => "move",
            ActionKind::Pickup => "pickup",
            ActionKind::Discard => "discard",
        };
        write!(f, "{s}")
    }
}

/// A single append-only ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: u64,
    pub id: String,
    pub action: ActionKind,
    pub target: Area,
}

impl LedgerEntry {
    pub fn new(timestamp: u64, id: impl Into<String>, action: ActionKind, target: Area) -> Self {
        Self {
            timestamp,
            id: id.into(),
            action,
            target,
        }
    }
}
