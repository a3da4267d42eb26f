//! Per-check write serialisation.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Keyed async mutex: at most one writer per check id at a time. Entries
/// nobody holds are pruned on the next acquisition.
#[derive(Debug, Default)]
pub(crate) struct CheckLocks {
  inner: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl CheckLocks {
  pub(crate) async fn lock(&self, check_id: Uuid) -> OwnedMutexGuard<()> {
    let slot = {
      let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
      map.retain(|id, m| *id == check_id || Arc::strong_count(m) > 1);
      Arc::clone(map.entry(check_id).or_default())
    };
    slot.lock_owned().await
  }
}
