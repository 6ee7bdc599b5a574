//! Connection identifiers and the per-connection state store.
//!
//! `ConnectionStore` maps a [`ConnectionId`] to whatever in-progress state
//! the owning connection needs to keep between receive events. Entries are
//! created on first use and removed once the request cycle finishes. The
//! map is sharded, so distinct connections never contend beyond a bucket
//! lock; callers mutate entries through closures so no guard outlives a
//! single synchronous step.
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::{DashMap, mapref::entry::Entry};

/// Identifier assigned to a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

/// Source of process-unique identifiers handed to accepted connections.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl From<u64> for ConnectionId {
    fn from(value: u64) -> Self { Self(value) }
}

impl ConnectionId {
    /// Create a new [`ConnectionId`] with the provided value.
    #[must_use]
    pub fn new(id: u64) -> Self { Self(id) }

    /// Allocate the next unused identifier.
    ///
    /// Identifiers are never reused within a process, which keeps spooled
    /// body files of concurrent connections apart.
    #[must_use]
    pub fn next() -> Self { Self(NEXT_ID.fetch_add(1, Ordering::Relaxed)) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub fn as_u64(&self) -> u64 { self.0 }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConnectionId({})", self.0)
    }
}

/// Concurrent store of per-connection state keyed by [`ConnectionId`].
///
/// At most one entry exists per identifier. Removing an entry and creating
/// it again starts a fresh cycle.
#[derive(Debug)]
pub struct ConnectionStore<S>(DashMap<ConnectionId, S>);

impl<S> Default for ConnectionStore<S> {
    fn default() -> Self { Self(DashMap::new()) }
}

impl<S> ConnectionStore<S> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Insert a fresh entry built by `init` unless one already exists.
    ///
    /// Returns `true` when a new entry was created.
    pub fn create_if_absent(&self, id: ConnectionId, init: impl FnOnce() -> S) -> bool {
        match self.0.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(init());
                true
            }
        }
    }

    /// Read from the entry for `id`, if present.
    pub fn read<R>(&self, id: &ConnectionId, f: impl FnOnce(&S) -> R) -> Option<R> {
        self.0.get(id).map(|entry| f(entry.value()))
    }

    /// Mutate the entry for `id` in place, if present.
    pub fn update<R>(&self, id: &ConnectionId, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        self.0.get_mut(id).map(|mut entry| f(entry.value_mut()))
    }

    /// Remove and return the entry for `id`.
    pub fn remove(&self, id: &ConnectionId) -> Option<S> { self.0.remove(id).map(|(_, s)| s) }

    /// Whether an entry exists for `id`.
    #[must_use]
    pub fn contains(&self, id: &ConnectionId) -> bool { self.0.contains_key(id) }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Whether the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Identifiers of every live entry, in no particular order.
    #[must_use]
    pub fn ids(&self) -> Vec<ConnectionId> { self.0.iter().map(|entry| *entry.key()).collect() }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn store() -> ConnectionStore<Vec<u8>> { ConnectionStore::new() }

    #[rstest]
    fn create_if_absent_keeps_existing_entry(store: ConnectionStore<Vec<u8>>) {
        let id = ConnectionId::new(7);
        assert!(store.create_if_absent(id, || vec![1]));
        assert!(!store.create_if_absent(id, || vec![2]));
        assert_eq!(store.read(&id, Clone::clone), Some(vec![1]));
    }

    #[rstest]
    fn update_and_remove_round_trip(store: ConnectionStore<Vec<u8>>) {
        let id = ConnectionId::new(1);
        store.create_if_absent(id, Vec::new);
        store.update(&id, |bytes| bytes.extend_from_slice(b"abc"));
        assert_eq!(store.remove(&id), Some(b"abc".to_vec()));
        assert!(!store.contains(&id));
        assert!(store.update(&id, |bytes| bytes.push(0)).is_none());
    }

    #[rstest]
    fn recreation_after_removal_starts_fresh(store: ConnectionStore<Vec<u8>>) {
        let id = ConnectionId::new(3);
        store.create_if_absent(id, || vec![9]);
        store.remove(&id);
        assert!(store.create_if_absent(id, Vec::new));
        assert_eq!(store.read(&id, Vec::len), Some(0));
    }

    #[test]
    fn next_ids_are_unique() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn distinct_keys_mutate_in_parallel() {
        let store = Arc::new(ConnectionStore::<u64>::new());
        let handles: Vec<_> = (0..8_u64)
            .map(|n| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let id = ConnectionId::new(n);
                    store.create_if_absent(id, || 0);
                    for _ in 0..1000 {
                        store.update(&id, |count| *count += 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker thread panicked");
        }
        assert_eq!(store.len(), 8);
        for n in 0..8 {
            assert_eq!(store.read(&ConnectionId::new(n), |c| *c), Some(1000));
        }
    }
}
