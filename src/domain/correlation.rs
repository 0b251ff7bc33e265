//! Correlation table linking request identifiers to delivery targets.
//!
//! Entries expire after a time-to-live so correlation identifiers that were
//! never consumed (fire-and-forget pushes, abandoned flows) do not
//! accumulate. Expiry runs opportunistically every Nth `store` rather than
//! on a timer, keeping the core free of background scheduling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use super::Identity;

/// Default entry time-to-live.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// A sweep runs inline on every Nth store.
const SWEEP_EVERY: u64 = 64;

#[derive(Debug)]
struct CorrelationEntry {
    target: Identity,
    created_at: Instant,
}

/// Maps correlation identifiers to the identity expected to answer them.
///
/// All mutating operations are mutually exclusive; an identifier maps to at
/// most one entry, last write wins on reuse.
#[derive(Debug)]
pub struct CorrelationTable {
    entries: Mutex<HashMap<String, CorrelationEntry>>,
    ttl: Duration,
    stores: AtomicU64,
}

impl CorrelationTable {
    /// Creates a table whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            stores: AtomicU64::new(0),
        }
    }

    /// Records `correlation_id` → `target` with the current time.
    ///
    /// Reusing an identifier silently overwrites the previous entry. Every
    /// [`SWEEP_EVERY`]th store also sweeps expired entries.
    pub async fn store(&self, correlation_id: impl Into<String>, target: Identity) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            correlation_id.into(),
            CorrelationEntry {
                target,
                created_at: Instant::now(),
            },
        );

        let stores = self.stores.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        if stores % SWEEP_EVERY == 0 {
            let removed = Self::sweep_locked(&mut entries, self.ttl);
            if removed > 0 {
                tracing::debug!(removed, "correlation sweep (amortized)");
            }
        }
    }

    /// Returns the delivery target recorded for `correlation_id`, if the
    /// entry exists and has not been swept.
    pub async fn lookup(&self, correlation_id: &str) -> Option<Identity> {
        self.entries
            .lock()
            .await
            .get(correlation_id)
            .map(|entry| entry.target.clone())
    }

    /// Removes an entry after consumption. Idempotent.
    pub async fn remove(&self, correlation_id: &str) {
        self.entries.lock().await.remove(correlation_id);
    }

    /// Removes all entries older than the TTL, returning how many were
    /// dropped.
    pub async fn sweep_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        Self::sweep_locked(&mut entries, self.ttl)
    }

    /// Returns the current number of entries, expired or not.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns `true` if the table holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    fn sweep_locked(entries: &mut HashMap<String, CorrelationEntry>, ttl: Duration) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| entry.created_at.elapsed() <= ttl);
        before.saturating_sub(entries.len())
    }
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_then_lookup_returns_target() {
        let table = CorrelationTable::default();
        table.store("corr_1", Identity::from("user1")).await;
        assert_eq!(table.lookup("corr_1").await, Some(Identity::from("user1")));
    }

    #[tokio::test]
    async fn lookup_of_unknown_id_is_none() {
        let table = CorrelationTable::default();
        assert_eq!(table.lookup("missing").await, None);
    }

    #[tokio::test]
    async fn reuse_overwrites_silently() {
        let table = CorrelationTable::default();
        table.store("corr_1", Identity::from("user1")).await;
        table.store("corr_1", Identity::from("user2")).await;
        assert_eq!(table.lookup("corr_1").await, Some(Identity::from("user2")));
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let table = CorrelationTable::default();
        table.store("corr_1", Identity::from("user1")).await;
        table.remove("corr_1").await;
        table.remove("corr_1").await;
        assert_eq!(table.lookup("corr_1").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_removes_entries_older_than_ttl() {
        let table = CorrelationTable::default();
        table.store("old", Identity::from("user1")).await;

        tokio::time::advance(Duration::from_secs(301)).await;
        table.store("fresh", Identity::from("user2")).await;

        let removed = table.sweep_expired().await;
        assert_eq!(removed, 1);
        assert_eq!(table.lookup("old").await, None);
        assert_eq!(table.lookup("fresh").await, Some(Identity::from("user2")));
    }

    #[tokio::test(start_paused = true)]
    async fn entries_within_ttl_survive_sweep() {
        let table = CorrelationTable::default();
        table.store("corr_1", Identity::from("user1")).await;

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(table.sweep_expired().await, 0);
        assert!(table.lookup("corr_1").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn nth_store_triggers_amortized_sweep() {
        let table = CorrelationTable::new(Duration::from_secs(10));
        table.store("stale", Identity::from("user1")).await;
        tokio::time::advance(Duration::from_secs(11)).await;

        // Stores 2..=64; the 64th store sweeps the expired entry inline.
        for i in 2..=64 {
            table.store(format!("corr_{i}"), Identity::from("user2")).await;
        }
        assert_eq!(table.lookup("stale").await, None);
    }
}
