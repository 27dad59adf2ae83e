use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tokio::time::Instant;

use crate::models::execution::{ExecutionId, StatusRecord};

/// Point-in-time copy of one registry entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub record: StatusRecord,
    /// Bumped on every write; two writes of an identical record still
    /// produce two distinct revisions.
    pub revision: u64,
}

struct Entry {
    record: StatusRecord,
    revision: u64,
    touched_at: Instant,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<ExecutionId, Entry>,
    next_revision: u64,
}

impl Inner {
    fn write(&mut self, id: ExecutionId, record: StatusRecord) {
        self.next_revision += 1;
        self.entries.insert(
            id,
            Entry {
                record,
                revision: self.next_revision,
                touched_at: Instant::now(),
            },
        );
    }
}

/// In-memory map from execution id to the latest known status.
///
/// Shared by the submission, notification, and stream handlers. This is
/// the only mutable state in the service; it lives for the lifetime of
/// the process and is not shared across instances.
#[derive(Default)]
pub struct ExecutionRegistry {
    inner: RwLock<Inner>,
}

impl ExecutionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mint a fresh execution id and store its initial record.
    ///
    /// Generation is retried until an unused id is found, so concurrent
    /// submissions never share an id.
    pub fn register(&self, record: StatusRecord) -> ExecutionId {
        let mut inner = self.lock();
        loop {
            let id = ExecutionId::generate();
            if !inner.entries.contains_key(&id) {
                inner.write(id.clone(), record);
                return id;
            }
        }
    }

    /// Insert or fully overwrite the entry for `id`.
    pub fn put(&self, id: &ExecutionId, record: StatusRecord) {
        self.lock().write(id.clone(), record);
    }

    /// Overwrite the entry for `id` only if it already exists.
    pub fn replace(&self, id: &ExecutionId, record: StatusRecord) -> Result<(), RegistryError> {
        let mut inner = self.lock();
        if !inner.entries.contains_key(id) {
            return Err(RegistryError::UnknownExecution(id.clone()));
        }
        inner.write(id.clone(), record);
        Ok(())
    }

    pub fn get(&self, id: &ExecutionId) -> Option<Snapshot> {
        self.read().entries.get(id).map(|entry| Snapshot {
            record: entry.record.clone(),
            revision: entry.revision,
        })
    }

    /// Remove the entry for `id`. Returns whether anything was removed.
    pub fn evict(&self, id: &ExecutionId) -> bool {
        self.lock().entries.remove(id).is_some()
    }

    /// Evict every entry not written within `ttl` and return their ids.
    pub fn evict_stale(&self, ttl: Duration) -> Vec<ExecutionId> {
        let now = Instant::now();
        let mut inner = self.lock();
        let stale: Vec<ExecutionId> = inner
            .entries
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.touched_at) >= ttl)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            inner.entries.remove(id);
        }
        stale
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RegistryError {
    #[error("Unknown execution: {0}")]
    UnknownExecution(ExecutionId),
}
