//! Drives the timeline: places orders at the configured cadence, schedules
//! each order's pickup at a random delay, and returns the ledger sorted by
//! timestamp.

use crate::domain::{LedgerEntry, Order};
use crate::engine::StorageEngine;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Timing parameters for a run, all in microseconds except `seed`.
#[derive(Debug, Clone, Copy)]
pub struct RunParams {
    pub rate_micros: u64,
    pub min_pickup_micros: u64,
    pub max_pickup_micros: u64,
    pub seed: Option<u64>,
}

/// How long to wait, beyond the last scheduled pickup, before giving up on
/// outstanding pickups.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(60);

/// The ledger's own mutex is independent of the engine's lock so that
/// ledger appends never serialize against engine work beyond their own
/// brief critical section.
#[derive(Default)]
struct Ledger {
    entries: Mutex<Vec<LedgerEntry>>,
}

impl Ledger {
    fn append(&self, new_entries: impl IntoIterator<Item = LedgerEntry>) {
        let mut entries = self.entries.lock().unwrap();
        entries.extend(new_entries);
    }

    /// Sorted by timestamp ascending; ties broken by append order (stable
    /// sort over the append-ordered vector).
    fn into_sorted(self) -> Vec<LedgerEntry> {
        let mut entries = self.entries.into_inner().unwrap();
        entries.sort_by_key(|e| e.timestamp);
        entries
    }
}

fn to_micros(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}

fn sleep_until(target: SystemTime) {
    let now = SystemTime::now();
    if let Ok(wait) = target.duration_since(now) {
        thread::sleep(wait);
    }
}

/// Run the full placement + pickup timeline for `orders` and return the
/// ledger sorted by timestamp.
pub fn run(engine: Arc<StorageEngine>, orders: Vec<Order>, params: RunParams) -> Vec<LedgerEntry> {
    run_with_grace(engine, orders, params, DEFAULT_GRACE_PERIOD)
}

pub fn run_with_grace(
    engine: Arc<StorageEngine>,
    orders: Vec<Order>,
    params: RunParams,
    grace: Duration,
) -> Vec<LedgerEntry> {
    let ledger = Ledger::default();
    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let origin = SystemTime::now();
    let (tx, rx) = mpsc::channel::<Option<LedgerEntry>>();
    let mut pickup_handles = Vec::with_capacity(orders.len());
    let mut latest_pickup = origin;

    for (idx, order) in orders.into_iter().enumerate() {
        let placement_time = origin + Duration::from_micros(params.rate_micros) * idx as u32;
        sleep_until(placement_time);

        let placement_timestamp_micros = to_micros(placement_time);
        match engine.place(order.clone(), placement_timestamp_micros) {
            Ok(entries) => {
                debug!(order_id = %order.id, entries = entries.len(), "placed order");
                ledger.append(entries);
            }
            Err(err) => {
                panic!("engine invariant violation while placing {}: {err}", order.id);
            }
        }

        let delay_range = params.min_pickup_micros..params.max_pickup_micros.max(params.min_pickup_micros + 1);
        let delay_micros = rng.random_range(delay_range);
        let pickup_time = placement_time + Duration::from_micros(delay_micros);
        latest_pickup = latest_pickup.max(pickup_time);
        let pickup_timestamp_micros = to_micros(pickup_time);

        let engine = engine.clone();
        let tx = tx.clone();
        let order_id = order.id.clone();
        let handle = thread::spawn(move || {
            sleep_until(pickup_time);
            let entry = engine.pickup(&order_id, pickup_timestamp_micros);
            if entry.is_none() {
                warn!(order_id = %order_id, "pickup fired for an order no longer resident");
            }
            let _ = tx.send(entry);
        });
        pickup_handles.push(handle);
    }
    drop(tx);

    let deadline = latest_pickup + grace;
    let mut received = 0;
    while received < pickup_handles.len() {
        let now = SystemTime::now();
        let remaining = deadline.duration_since(now).unwrap_or(Duration::ZERO);
        match rx.recv_timeout(remaining) {
            Ok(Some(entry)) => {
                ledger.append(std::iter::once(entry));
                received += 1;
            }
            Ok(None) => {
                received += 1;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!(
                    outstanding = pickup_handles.len() - received,
                    "grace period elapsed with outstanding pickups; abandoning them"
                );
                break;
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    // Any pickup threads still running at this point are abandoned: we drop
    // their handles without joining so a stalled thread can't block the
    // caller past the grace period.
    drop(pickup_handles);

    ledger.into_sorted()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActionKind, Area, Temp};

    fn order(id: &str, temp: Temp, freshness: u64) -> Order {
        Order {
            id: id.to_string(),
            name: id.to_string(),
            temp,
            price: 1.0,
            freshness,
        }
    }

    #[test]
    fn ledger_is_sorted_by_timestamp() {
        let ledger = Ledger::default();
        ledger.append(vec![LedgerEntry::new(5, "b", ActionKind::Place, Area::Shelf)]);
        ledger.append(vec![LedgerEntry::new(1, "a", ActionKind::Place, Area::Shelf)]);
        let sorted = ledger.into_sorted();
        assert_eq!(sorted[0].id, "a");
        assert_eq!(sorted[1].id, "b");
    }

    #[test]
    fn equal_timestamps_preserve_append_order() {
        let ledger = Ledger::default();
        ledger.append(vec![
            LedgerEntry::new(10, "discard-me", ActionKind::Discard, Area::Shelf),
            LedgerEntry::new(10, "place-me", ActionKind::Place, Area::Shelf),
        ]);
        let sorted = ledger.into_sorted();
        assert_eq!(sorted[0].action, ActionKind::Discard);
        assert_eq!(sorted[1].action, ActionKind::Place);
    }

    #[test]
    fn small_run_produces_one_place_and_one_terminal_action_per_order() {
        let engine = Arc::new(StorageEngine::new());
        let orders = vec![
            order("h1", Temp::Hot, 120),
            order("c1", Temp::Cold, 120),
            order("r1", Temp::Room, 120),
        ];
        let params = RunParams {
            rate_micros: 1_000,
            min_pickup_micros: 2_000,
            max_pickup_micros: 3_000,
            seed: Some(42),
        };
        let ledger = run_with_grace(engine, orders, params, Duration::from_secs(5));

        let places = ledger.iter().filter(|e| e.action == ActionKind::Place).count();
        let terminal = ledger
            .iter()
            .filter(|e| matches!(e.action, ActionKind::Pickup | ActionKind::Discard))
            .count();
        assert_eq!(places, 3);
        assert_eq!(terminal, 3);

        let timestamps: Vec<u64> = ledger.iter().map(|e| e.timestamp).collect();
        let mut sorted = timestamps.clone();
        sorted.sort();
        assert_eq!(timestamps, sorted);
    }
}
