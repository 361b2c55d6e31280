//! Snapshot storage with atomic whole-table replacement.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use xrate_common::{Clock, Timestamp};

use crate::table::RateTable;

/// Where a snapshot's rates came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotOrigin {
    /// The compiled-in fallback table.
    Embedded,
    /// A successful refresh from the named source.
    Remote { source: String },
}

/// A trusted rate table and the time it was installed.
///
/// Handed out behind an `Arc` and never mutated after construction.
#[derive(Debug, Clone, Serialize)]
pub struct RateSnapshot {
    pub rates: RateTable,
    pub last_updated: Timestamp,
    pub origin: SnapshotOrigin,
}

impl RateSnapshot {
    /// Whether this snapshot came from a remote source.
    pub fn is_live(&self) -> bool {
        matches!(self.origin, SnapshotOrigin::Remote { .. })
    }
}

/// Holds exactly one snapshot.
///
/// Readers clone the current `Arc` under a short read lock, so they never
/// wait on a network call and never see a partially replaced table.
#[derive(Debug)]
pub struct RateStore {
    current: RwLock<Arc<RateSnapshot>>,
    clock: Arc<dyn Clock>,
}

impl RateStore {
    /// Create a store seeded with `rates`, stamped with the current time.
    pub fn new(rates: RateTable, origin: SnapshotOrigin, clock: Arc<dyn Clock>) -> Self {
        let snapshot = RateSnapshot {
            rates,
            last_updated: clock.now(),
            origin,
        };
        Self {
            current: RwLock::new(Arc::new(snapshot)),
            clock,
        }
    }

    /// The current snapshot.
    pub fn get(&self) -> Arc<RateSnapshot> {
        self.current.read().clone()
    }

    /// Swap in a new table stamped with the current time.
    pub(crate) fn replace(&self, rates: RateTable, origin: SnapshotOrigin) -> Arc<RateSnapshot> {
        let snapshot = Arc::new(RateSnapshot {
            rates,
            last_updated: self.clock.now(),
            origin,
        });
        *self.current.write() = Arc::clone(&snapshot);
        snapshot
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use xrate_common::{CurrencyCode, ManualClock};

    fn store_with_clock() -> (RateStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let store = RateStore::new(RateTable::embedded(), SnapshotOrigin::Embedded, clock.clone());
        (store, clock)
    }

    #[test]
    fn test_replace_swaps_whole_table() {
        let (store, clock) = store_with_clock();
        let before = store.get();

        clock.advance(Duration::minutes(5));
        let table = RateTable::from_pairs(CurrencyCode::usd(), vec![("EUR", 0.85)]).unwrap();
        store.replace(
            table,
            SnapshotOrigin::Remote {
                source: "test".into(),
            },
        );

        let after = store.get();
        assert_eq!(after.rates.len(), 2);
        assert!(!after.rates.contains("JPY"));
        assert_eq!(after.last_updated - before.last_updated, Duration::minutes(5));
        assert!(after.is_live());
    }

    #[test]
    fn test_held_snapshot_unaffected_by_replace() {
        let (store, _clock) = store_with_clock();
        let held = store.get();

        let table = RateTable::from_pairs(CurrencyCode::usd(), vec![("EUR", 0.5)]).unwrap();
        store.replace(table, SnapshotOrigin::Embedded);

        assert_eq!(held.rates.rate("EUR"), Some(0.92));
        assert_eq!(store.get().rates.rate("EUR"), Some(0.5));
    }

    #[test]
    fn test_concurrent_readers_see_whole_tables() {
        let (store, _clock) = store_with_clock();
        let store = Arc::new(store);
        let a = RateTable::from_pairs(CurrencyCode::usd(), vec![("EUR", 0.5), ("GBP", 0.5)]).unwrap();
        let b = RateTable::from_pairs(CurrencyCode::usd(), vec![("EUR", 0.7), ("GBP", 0.7)]).unwrap();

        let writer = {
            let store = store.clone();
            std::thread::spawn(move || {
                for i in 0..500 {
                    let table = if i % 2 == 0 { a.clone() } else { b.clone() };
                    store.replace(table, SnapshotOrigin::Embedded);
                }
            })
        };

        for _ in 0..500 {
            let snapshot = store.get();
            if snapshot.rates.len() == 3 {
                assert_eq!(snapshot.rates.rate("EUR"), snapshot.rates.rate("GBP"));
            }
        }

        writer.join().unwrap();
    }
}
