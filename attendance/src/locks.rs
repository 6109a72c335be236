//! Identity-scoped mutual exclusion.
//!
//! The history check and the following write for one identity must not
//! interleave with another submission for the same identity. Different
//! identities never wait on each other.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct IdentityLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl IdentityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `identity`. Released when the guard drops.
    pub async fn lock(&self, identity: &str) -> IdentityGuard<'_> {
        let mutex = Arc::clone(
            self.locks
                .entry(identity.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        IdentityGuard {
            locks: &self.locks,
            identity: identity.to_string(),
            guard: Some(mutex.lock_owned().await),
        }
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive access to one identity. The map entry is dropped with the last holder.
#[derive(Debug)]
pub struct IdentityGuard<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    identity: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for IdentityGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Waiters clone the Arc under the shard lock, so a count of 1 means nobody else needs it.
        self.locks
            .remove_if(&self.identity, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
