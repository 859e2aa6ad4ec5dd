//! Background persistence for the in-memory stores
//!
//! Stores mutate their collection synchronously and hand a serialized
//! snapshot to a per-store writer task. The writer applies snapshots to
//! storage one at a time, in the order they were issued.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use super::storage::{KeyValueStore, StorageKey};
use crate::error::{StorageError, StorageResult};

/// Completion signal of one asynchronous write.
///
/// Dropping the ticket does not cancel the write.
#[derive(Debug)]
#[must_use = "drop the ticket explicitly for fire-and-forget writes"]
pub struct PersistTicket {
    done: oneshot::Receiver<StorageResult<()>>,
}

impl PersistTicket {
    fn ready(result: StorageResult<()>) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(result);
        Self { done: rx }
    }

    /// Wait until the snapshot has reached storage
    pub async fn wait(self) -> StorageResult<()> {
        self.done.await.map_err(|_| StorageError::Closed)?
    }
}

struct WriteRequest {
    json: String,
    done: oneshot::Sender<StorageResult<()>>,
}

/// Serial writer for one storage key
pub(crate) struct Persister {
    key: StorageKey,
    requests: mpsc::UnboundedSender<WriteRequest>,
}

impl Persister {
    pub(crate) fn spawn(handle: &Handle, storage: Arc<dyn KeyValueStore>, key: StorageKey) -> Self {
        let (requests, mut queue) = mpsc::unbounded_channel::<WriteRequest>();
        let task_key = key.clone();

        handle.spawn(async move {
            while let Some(WriteRequest { json, done }) = queue.recv().await {
                let storage = Arc::clone(&storage);
                let key = task_key.clone();
                let result = tokio::task::spawn_blocking(move || storage.set(&key, &json))
                    .await
                    .map_err(StorageError::from)
                    .and_then(|written| written);

                if let Err(err) = &result {
                    tracing::error!(key = %task_key, error = %err, "failed to persist");
                }
                let _ = done.send(result);
            }
            tracing::debug!(key = %task_key, "writer stopped");
        });

        Self { key, requests }
    }

    /// Queue `value` for writing; never blocks
    pub(crate) fn write<T: Serialize + ?Sized>(&self, value: &T) -> PersistTicket {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(err) => return PersistTicket::ready(Err(err.into())),
        };

        let (done, rx) = oneshot::channel();
        if self.requests.send(WriteRequest { json, done }).is_err() {
            tracing::warn!(key = %self.key, "writer gone, snapshot dropped");
            return PersistTicket::ready(Err(StorageError::Closed));
        }
        PersistTicket { done: rx }
    }
}

/// Read a JSON array stored at `key`.
///
/// Absent keys give an empty collection. A value that fails to parse is
/// deleted and also gives an empty collection; nothing is surfaced.
pub(crate) async fn load_collection<T>(storage: Arc<dyn KeyValueStore>, key: StorageKey) -> Vec<T>
where
    T: DeserializeOwned + Send + 'static,
{
    let task_key = key.clone();
    let loaded = tokio::task::spawn_blocking(move || {
        let raw = match storage.get(&task_key) {
            Ok(Some(raw)) if !raw.is_empty() => raw,
            Ok(_) => return Vec::new(),
            Err(err) => {
                tracing::warn!(key = %task_key, error = %err, "failed to read, starting empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!(key = %task_key, error = %err, "corrupt stored value, clearing");
                if let Err(err) = storage.delete(&task_key) {
                    tracing::error!(key = %task_key, error = %err, "failed to clear corrupt value");
                }
                Vec::new()
            }
        }
    })
    .await;

    match loaded {
        Ok(items) => items,
        Err(err) => {
            tracing::warn!(key = %key, error = %err, "load task failed, starting empty");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::storage::MemoryStorage;

    #[tokio::test]
    async fn test_writes_land_in_issue_order() {
        let memory = Arc::new(MemoryStorage::new());
        let storage: Arc<dyn KeyValueStore> = memory.clone();
        let key = StorageKey::photos();
        let persister = Persister::spawn(&Handle::current(), storage, key.clone());

        let tickets: Vec<_> = (0..20).map(|n| persister.write(&vec![n])).collect();
        for ticket in tickets {
            ticket.wait().await.unwrap();
        }

        assert_eq!(memory.get(&key).unwrap().as_deref(), Some("[19]"));
    }

    #[tokio::test]
    async fn test_load_missing_key_is_empty() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStorage::new());
        let items: Vec<u32> = load_collection(storage, StorageKey::photos()).await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_value_clears_key() {
        let key = StorageKey::markers("p1");
        let memory = Arc::new(MemoryStorage::new().with_entry(&key, "{not json"));
        let storage: Arc<dyn KeyValueStore> = memory.clone();

        let items: Vec<u32> = load_collection(storage, key.clone()).await;

        assert!(items.is_empty());
        assert!(!memory.contains(&key));
    }
}
