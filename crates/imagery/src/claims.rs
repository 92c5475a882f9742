//! At-most-one-in-flight pipeline per artifact name.
//!
//! A claim is an async mutex keyed by artifact name. The first invocation
//! takes it without waiting; later ones for the same name queue on it and,
//! once the holder finishes, find the artifact in the cache. Entries hold
//! only weak references, so a name's mutex disappears with its last guard.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use imagery_common::ArtifactName;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::metrics;

/// Process-wide claim registry.
#[derive(Default)]
pub struct ClaimTable {
    entries: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
    total: AtomicU64,
    contended: AtomicU64,
}

/// Counters for monitoring claim contention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClaimStats {
    pub total: u64,
    /// Claims that had to wait for another holder (lost the race)
    pub contended: u64,
}

/// Exclusive right to produce one artifact. Released on drop.
#[derive(Debug)]
pub struct ClaimGuard {
    name: String,
    contended: bool,
    _guard: OwnedMutexGuard<()>,
}

impl ClaimGuard {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this claim waited for another invocation first.
    pub fn was_contended(&self) -> bool {
        self.contended
    }
}

impl ClaimTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name`, waiting while another invocation holds it.
    pub async fn claim(&self, name: &ArtifactName) -> ClaimGuard {
        let lock = self.entry(name.as_str());
        self.total.fetch_add(1, Ordering::Relaxed);

        match lock.clone().try_lock_owned() {
            Ok(guard) => {
                debug!(artifact = %name, "Claimed artifact");
                ClaimGuard {
                    name: name.to_string(),
                    contended: false,
                    _guard: guard,
                }
            }
            Err(_) => {
                self.contended.fetch_add(1, Ordering::Relaxed);
                metrics::record_contended_claim();
                info!(artifact = %name, "Cache race lost, waiting for in-flight run");
                let guard = lock.lock_owned().await;
                ClaimGuard {
                    name: name.to_string(),
                    contended: true,
                    _guard: guard,
                }
            }
        }
    }

    /// Names with at least one live claim or waiter.
    pub fn in_flight(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.values().filter(|w| w.strong_count() > 0).count()
    }

    pub fn stats(&self) -> ClaimStats {
        ClaimStats {
            total: self.total.load(Ordering::Relaxed),
            contended: self.contended.load(Ordering::Relaxed),
        }
    }

    fn entry(&self, name: &str) -> Arc<AsyncMutex<()>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, w| w.strong_count() > 0);

        if let Some(lock) = entries.get(name).and_then(Weak::upgrade) {
            return lock;
        }
        let lock = Arc::new(AsyncMutex::new(()));
        entries.insert(name.to_string(), Arc::downgrade(&lock));
        lock
    }
}
