//! Credential pool and workload balancer.
//!
//! Every remote-store call goes through one [`Credential`]. The pool hands
//! out the least-loaded credential per streaming session and tracks how many
//! sessions each one is serving.
//!
//! # Balance
//!
//! [`CredentialPool::acquire`] scans all loads and increments the minimum.
//! The scan and the increment are separate atomic operations, so two
//! concurrent acquisitions can both pick the same credential. The resulting
//! imbalance is bounded by the number of racing acquisitions and is
//! accepted; the counters themselves stay exact.

mod lease;

pub use lease::CredentialLease;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use reelgate_common::{Error, Result};

use crate::store::StoreClient;

/// One independent access identity to the remote store.
pub struct Credential {
    id: usize,
    label: String,
    client: Arc<dyn StoreClient>,
    load: AtomicUsize,
}

impl Credential {
    /// Stable id, assigned in registration order.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Live session handle used for remote calls.
    pub fn client(&self) -> &Arc<dyn StoreClient> {
        &self.client
    }

    /// Number of open streaming sessions attributed to this credential.
    pub fn load(&self) -> usize {
        self.load.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("load", &self.load())
            .finish()
    }
}

/// Thread-safe pool of credentials and their load counters.
///
/// Cloning is cheap; clones share the same credentials.
#[derive(Clone, Default)]
pub struct CredentialPool {
    credentials: Arc<RwLock<Vec<Arc<Credential>>>>,
}

impl CredentialPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a credential with zero load.
    pub fn register(
        &self,
        label: impl Into<String>,
        client: Arc<dyn StoreClient>,
    ) -> Arc<Credential> {
        let mut credentials = self.credentials.write();
        let credential = Arc::new(Credential {
            id: credentials.len(),
            label: label.into(),
            client,
            load: AtomicUsize::new(0),
        });
        credentials.push(credential.clone());
        tracing::info!(
            credential = %credential.label,
            id = credential.id,
            "Registered credential"
        );
        credential
    }

    /// Take the least-loaded credential, lowest id on ties.
    ///
    /// The returned lease releases the credential when dropped.
    pub fn acquire(&self) -> Result<CredentialLease> {
        let credential = {
            let credentials = self.credentials.read();
            credentials
                .iter()
                .min_by_key(|c| (c.load(), c.id))
                .cloned()
                .ok_or(Error::PoolExhausted)?
        };

        let load = credential.load.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(credential = %credential.label, load, "Acquired credential");

        Ok(CredentialLease::new(self.clone(), credential))
    }

    /// Decrement a credential's load, clamping at zero.
    ///
    /// Each successful [`acquire`](Self::acquire) must be matched by exactly
    /// one release; [`CredentialLease`] does this on drop. A surplus release
    /// is logged and ignored.
    pub fn release(&self, credential: &Credential) {
        match credential
            .load
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |l| l.checked_sub(1))
        {
            Ok(previous) => {
                tracing::debug!(
                    credential = %credential.label,
                    load = previous - 1,
                    "Released credential"
                );
            }
            Err(_) => {
                tracing::warn!(
                    credential = %credential.label,
                    "Release without matching acquire; load already zero"
                );
            }
        }
    }

    /// Label and load of every credential, busiest first.
    pub fn snapshot(&self) -> Vec<(String, usize)> {
        let credentials = self.credentials.read();
        let mut entries: Vec<(usize, String, usize)> = credentials
            .iter()
            .map(|c| (c.id, c.label.clone(), c.load()))
            .collect();
        entries.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));
        entries
            .into_iter()
            .map(|(_, label, load)| (label, load))
            .collect()
    }

    /// Sum of all loads, equal to the number of open sessions.
    pub fn total_load(&self) -> usize {
        self.credentials.read().iter().map(|c| c.load()).sum()
    }

    pub fn len(&self) -> usize {
        self.credentials.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use assert_matches::assert_matches;

    fn pool_of(n: usize) -> CredentialPool {
        let pool = CredentialPool::new();
        let store = Arc::new(MemoryStore::new());
        for i in 0..n {
            pool.register(format!("bot-{i}"), store.clone());
        }
        pool
    }

    #[test]
    fn empty_pool_is_exhausted() {
        let pool = CredentialPool::new();
        assert_matches!(pool.acquire(), Err(Error::PoolExhausted));
    }

    #[test]
    fn acquire_picks_lowest_load_then_lowest_id() {
        let pool = pool_of(3);

        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        let c = pool.acquire().unwrap();
        assert_eq!((a.id(), b.id(), c.id()), (0, 1, 2));

        // All at load 1: the tie goes to id 0 again.
        let d = pool.acquire().unwrap();
        assert_eq!(d.id(), 0);

        // Freeing id 1 makes it the unique minimum.
        drop(b);
        let e = pool.acquire().unwrap();
        assert_eq!(e.id(), 1);

        assert_eq!(pool.total_load(), 4);
        drop((a, c, d, e));
        assert_eq!(pool.total_load(), 0);
    }

    #[test]
    fn release_clamps_at_zero() {
        let pool = pool_of(1);
        let lease = pool.acquire().unwrap();
        let credential = lease.credential().clone();
        drop(lease);
        assert_eq!(credential.load(), 0);

        // Surplus release is ignored.
        pool.release(&credential);
        assert_eq!(credential.load(), 0);
    }

    #[test]
    fn explicit_release_happens_once() {
        let pool = pool_of(1);
        let lease = pool.acquire().unwrap();
        let credential = lease.credential().clone();
        assert_eq!(credential.load(), 1);
        lease.release();
        assert_eq!(credential.load(), 0);
    }

    #[test]
    fn snapshot_sorted_by_load_descending() {
        let pool = pool_of(3);
        let _a = pool.acquire().unwrap(); // bot-0
        let _b = pool.acquire().unwrap(); // bot-1
        let _c = pool.acquire().unwrap(); // bot-2
        let _d = pool.acquire().unwrap(); // bot-0
        let _e = pool.acquire().unwrap(); // bot-1
        let _f = pool.acquire().unwrap(); // bot-2
        drop(_c);

        let snapshot = pool.snapshot();
        assert_eq!(
            snapshot,
            vec![
                ("bot-0".to_string(), 2),
                ("bot-1".to_string(), 2),
                ("bot-2".to_string(), 1),
            ]
        );
    }

    #[test]
    fn interleaved_acquire_release_keeps_sum_equal_to_open_leases() {
        let pool = pool_of(4);
        let mut open = Vec::new();
        for step in 0..200usize {
            if step % 3 == 2 {
                open.swap_remove(step % open.len());
            } else {
                open.push(pool.acquire().unwrap());
            }
            assert_eq!(pool.total_load(), open.len());
            assert!(pool.snapshot().iter().all(|(_, load)| *load <= open.len()));
        }
        open.clear();
        assert_eq!(pool.total_load(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sessions_balance_approximately() {
        let pool = pool_of(4);
        let mut handles = Vec::new();
        for _ in 0..64 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move { pool.acquire().unwrap() }));
        }
        let mut leases = Vec::new();
        for h in handles {
            leases.push(h.await.unwrap());
        }

        assert_eq!(pool.total_load(), 64);
        for (_, load) in pool.snapshot() {
            // Exact balance would be 16 each; racing scans may skew it a bit.
            assert!(load >= 8 && load <= 24, "load {load} out of bounds");
        }

        drop(leases);
        assert_eq!(pool.total_load(), 0);
    }
}
