//! In-process step lock for tests and single-node embedding.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::{LockResult, StepLock};

/// DashMap-backed [`StepLock`]. Entries store the lease expiry; the shard lock
/// taken by the entry API makes claim checks atomic.
#[derive(Debug, Default)]
pub struct InMemoryStepLock {
    leases: DashMap<(Uuid, u32), Instant>,
}

impl InMemoryStepLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when a live lease exists for this step.
    pub fn is_held(&self, operation_id: Uuid, step_index: u32) -> bool {
        self.leases
            .get(&(operation_id, step_index))
            .map(|expiry| *expiry > Instant::now())
            .unwrap_or(false)
    }

    /// Drop every expired lease. The claim path already treats expired leases
    /// as free; this only reclaims memory on long-lived processes.
    pub fn sweep_expired(&self) {
        let now = Instant::now();
        self.leases.retain(|_, expiry| *expiry > now);
    }
}

#[async_trait]
impl StepLock for InMemoryStepLock {
    async fn try_claim(
        &self,
        operation_id: Uuid,
        step_index: u32,
        ttl: Duration,
    ) -> LockResult<bool> {
        let now = Instant::now();
        match self.leases.entry((operation_id, step_index)) {
            Entry::Occupied(mut entry) => {
                if *entry.get() <= now {
                    entry.insert(now + ttl);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now + ttl);
                Ok(true)
            }
        }
    }

    async fn release(&self, operation_id: Uuid, step_index: u32) -> LockResult<()> {
        self.leases.remove(&(operation_id, step_index));
        Ok(())
    }
}
