//! Per-destination deploy locks
//!
//! Concurrent deploys to the same destination path are serialized: a deploy
//! holds the lock for its resolved destination from fetch/clone through
//! restart, and a second request to the same target queues behind it.
//! Deploys to different destinations run independently.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// In-memory mutex registry keyed by resolved destination path
#[derive(Debug, Default)]
pub struct DeployLocks {
    inner: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl DeployLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a destination path, waiting if a deploy to the
    /// same destination is in flight.
    pub async fn acquire(&self, destination: &Path) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(destination.to_path_buf())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
