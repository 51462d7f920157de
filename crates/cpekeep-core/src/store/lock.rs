use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-serial mutual exclusion.
///
/// Two observations of the same device must not race to replace its
/// active snapshot or to restore it twice; different devices never wait
/// on each other.
#[derive(Debug, Default)]
pub struct SerialLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SerialLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `serial`.
    pub async fn lock(&self, serial: &str) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the DashMap shard is released before awaiting.
        let mutex = self
            .locks
            .entry(serial.to_owned())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }
}
