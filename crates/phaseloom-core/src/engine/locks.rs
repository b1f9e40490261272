use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-phase mutual exclusion.
///
/// Every pipeline operation holds its phase's async mutex across the
/// external provider calls and the commit transaction, so operations on
/// one phase serialize while different phases proceed concurrently.
#[derive(Default)]
pub struct PhaseLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl PhaseLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, phase_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap();
            map.entry(phase_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
