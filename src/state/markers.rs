use std::sync::Arc;
use tokio::runtime::Handle;

use super::data::Marker;
use super::persist::{load_collection, PersistTicket, Persister};
use super::storage::{KeyValueStore, StorageKey};

/// The markers of one photo.
///
/// The in-memory collection is the source of truth. Every mutation
/// dispatches a snapshot of the confirmed markers to storage; pending
/// markers are never written, so a crash while labeling loses only the
/// unlabeled pin.
pub struct MarkerStore {
    photo_id: String,
    markers: Vec<Marker>,
    persister: Persister,
}

impl MarkerStore {
    /// Load the confirmed markers of `photo_id`.
    ///
    /// Must run inside a tokio runtime; the store's writer task is spawned on it.
    pub async fn load(storage: Arc<dyn KeyValueStore>, photo_id: impl Into<String>) -> Self {
        let photo_id = photo_id.into();
        let key = StorageKey::markers(&photo_id);
        let markers: Vec<Marker> = load_collection(Arc::clone(&storage), key.clone()).await;
        tracing::debug!(photo = %photo_id, count = markers.len(), "markers loaded");

        Self {
            persister: Persister::spawn(&Handle::current(), storage, key),
            photo_id,
            markers,
        }
    }

    pub fn photo_id(&self) -> &str {
        &self.photo_id
    }

    /// All markers, in placement order
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn get(&self, id: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.id == id)
    }

    /// The marker awaiting a label, if any
    pub fn pending(&self) -> Option<&Marker> {
        self.markers.iter().find(|m| m.pending)
    }

    /// What storage holds after the last write lands
    pub fn persisted_snapshot(&self) -> Vec<Marker> {
        self.markers.iter().filter(|m| !m.pending).cloned().collect()
    }

    /// Append an unlabeled marker.
    ///
    /// Returns `None` (and changes nothing) when the id is already taken or
    /// when a pending marker is requested while another one is pending.
    pub fn add(&mut self, id: impl Into<String>, x: f64, y: f64, pending: bool) -> Option<PersistTicket> {
        let id = id.into();
        if self.get(&id).is_some() {
            tracing::warn!(photo = %self.photo_id, marker = %id, "duplicate marker id");
            return None;
        }
        if pending && self.pending().is_some() {
            tracing::debug!(photo = %self.photo_id, "a marker is already pending");
            return None;
        }

        self.markers.push(Marker::new(id, x, y, pending));
        Some(self.persist())
    }

    /// Label a marker and clear its pending flag.
    ///
    /// The label is trimmed; a blank label is rejected with `None`.
    pub fn confirm(&mut self, id: &str, label: &str) -> Option<PersistTicket> {
        let label = label.trim();
        if label.is_empty() {
            return None;
        }

        let marker = self.markers.iter_mut().find(|m| m.id == id)?;
        marker.label = label.to_string();
        marker.pending = false;
        tracing::info!(photo = %self.photo_id, marker = %id, label, "marker confirmed");
        Some(self.persist())
    }

    /// Drop a marker (pending or not)
    pub fn remove(&mut self, id: &str) -> PersistTicket {
        self.markers.retain(|m| m.id != id);
        self.persist()
    }

    fn persist(&self) -> PersistTicket {
        self.persister.write(&self.persisted_snapshot())
    }
}

impl std::fmt::Debug for MarkerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerStore")
            .field("photo_id", &self.photo_id)
            .field("markers", &self.markers)
            .finish()
    }
}
