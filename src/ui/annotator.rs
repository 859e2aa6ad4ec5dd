use std::sync::Arc;

use crate::error::StorageResult;
use crate::gesture::{screen_to_image, TransformState};
use crate::state::{IdGenerator, ImageSize, Marker, MarkerStore, PersistTicket};

/// Where the pending marker lifecycle stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationState {
    Idle,
    /// A marker with this id waits for its label
    Pending(String),
}

/// Turns a long-press into a pending marker and closes it with confirm or
/// cancel. One controller per open photo.
pub struct AnnotationController {
    store: MarkerStore,
    ids: Arc<dyn IdGenerator>,
    bounds: Option<ImageSize>,
    pending_id: Option<String>,
    last_write: Option<PersistTicket>,
}

impl AnnotationController {
    pub fn new(store: MarkerStore, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            store,
            ids,
            bounds: None,
            pending_id: None,
            last_write: None,
        }
    }

    /// Image dimensions, needed before markers can be placed
    pub fn set_image_size(&mut self, size: ImageSize) {
        if size.is_valid() {
            self.bounds = Some(size);
        }
    }

    pub fn image_size(&self) -> Option<ImageSize> {
        self.bounds
    }

    pub fn state(&self) -> AnnotationState {
        match &self.pending_id {
            Some(id) => AnnotationState::Pending(id.clone()),
            None => AnnotationState::Idle,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending_id.is_some()
    }

    pub fn pending_marker(&self) -> Option<&Marker> {
        self.pending_id.as_deref().and_then(|id| self.store.get(id))
    }

    pub fn markers(&self) -> &[Marker] {
        self.store.markers()
    }

    pub fn store(&self) -> &MarkerStore {
        &self.store
    }

    /// Whether `label` would be accepted by [`Self::confirm`]
    pub fn can_confirm(&self, label: &str) -> bool {
        self.is_pending() && !label.trim().is_empty()
    }

    /// Long-press at a screen point: place a pending marker.
    ///
    /// Ignored while another marker is pending or before the image size is
    /// known. `transform` should be a consistent snapshot of the live values.
    pub fn begin(&mut self, screen_x: f64, screen_y: f64, transform: &TransformState) -> Option<&Marker> {
        if self.pending_id.is_some() {
            tracing::debug!("long press ignored, a marker is already pending");
            return None;
        }
        let Some(bounds) = self.bounds else {
            tracing::debug!("long press ignored, image size unknown");
            return None;
        };

        let (x, y) = screen_to_image(screen_x, screen_y, transform, bounds);
        let id = self.fresh_id()?;
        let ticket = self.store.add(id.clone(), x, y, true)?;
        self.last_write = Some(ticket);

        tracing::debug!(marker = %id, x, y, "marker pending");
        self.pending_id = Some(id);
        self.pending_marker()
    }

    /// Next id not held by a loaded marker. Stored ids may be ahead of a
    /// time-based generator, so taken ones are skipped; a generator that never
    /// repeats finds a free id within `markers().len() + 1` draws.
    fn fresh_id(&self) -> Option<String> {
        for _ in 0..=self.store.markers().len() {
            let id = self.ids.next_id();
            if self.store.get(&id).is_none() {
                return Some(id);
            }
            tracing::debug!(marker = %id, "id already taken, drawing another");
        }
        tracing::warn!(photo = %self.store.photo_id(), "no free marker id, long press dropped");
        None
    }

    /// Label the pending marker. Rejected (returns false) when idle or when
    /// the label is blank; the marker then stays pending.
    pub fn confirm(&mut self, label: &str) -> bool {
        let Some(id) = self.pending_id.as_deref() else {
            return false;
        };
        let Some(ticket) = self.store.confirm(id, label) else {
            return false;
        };
        self.last_write = Some(ticket);
        self.pending_id = None;
        true
    }

    /// Discard the pending marker; it leaves no trace
    pub fn cancel(&mut self) {
        if let Some(id) = self.pending_id.take() {
            tracing::debug!(marker = %id, "marker cancelled");
            self.last_write = Some(self.store.remove(&id));
        }
    }

    /// Delete a confirmed marker. Pending markers go through [`Self::cancel`].
    pub fn remove(&mut self, id: &str) -> bool {
        let confirmed = self.store.get(id).is_some_and(|marker| !marker.pending);
        if !confirmed {
            return false;
        }
        self.last_write = Some(self.store.remove(id));
        tracing::info!(marker = %id, "marker removed");
        true
    }

    /// Wait until everything written so far has reached storage
    pub async fn flush(&mut self) -> StorageResult<()> {
        match self.last_write.take() {
            Some(ticket) => ticket.wait().await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for AnnotationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotationController")
            .field("photo_id", &self.store.photo_id())
            .field("bounds", &self.bounds)
            .field("pending_id", &self.pending_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{KeyValueStore, MemoryStorage, MonotonicIds, StorageKey};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingIds(AtomicU32);

    impl IdGenerator for CountingIds {
        fn next_id(&self) -> String {
            format!("m{}", self.0.fetch_add(1, Ordering::Relaxed))
        }
    }

    async fn controller(memory: &Arc<MemoryStorage>) -> AnnotationController {
        let storage: Arc<dyn KeyValueStore> = memory.clone();
        let store = MarkerStore::load(storage, "p1").await;
        let mut controller = AnnotationController::new(store, Arc::new(CountingIds(AtomicU32::new(1))));
        controller.set_image_size(ImageSize::new(1000.0, 800.0));
        controller
    }

    fn stored(memory: &MemoryStorage) -> String {
        memory.get(&StorageKey::markers("p1")).unwrap().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_long_press_places_pending_marker_in_image_space() {
        let memory = Arc::new(MemoryStorage::new());
        let mut controller = controller(&memory).await;
        let transform = TransformState::new(20.0, 10.0, 0.5);

        let marker = controller.begin(80.0, 50.0, &transform).unwrap().clone();

        assert_eq!((marker.x, marker.y), (120.0, 80.0));
        assert!(marker.pending);
        assert_eq!(controller.state(), AnnotationState::Pending("m1".to_string()));
        controller.flush().await.unwrap();
        assert_eq!(stored(&memory), "[]");
    }

    #[tokio::test]
    async fn test_long_press_outside_image_is_clamped() {
        let memory = Arc::new(MemoryStorage::new());
        let mut controller = controller(&memory).await;
        let marker = controller
            .begin(-50.0, 9000.0, &TransformState::at_scale(0.4))
            .unwrap();
        assert_eq!((marker.x, marker.y), (0.0, 800.0));
    }

    #[tokio::test]
    async fn test_second_long_press_is_ignored_while_pending() {
        let memory = Arc::new(MemoryStorage::new());
        let mut controller = controller(&memory).await;
        let transform = TransformState::at_scale(0.5);

        assert!(controller.begin(10.0, 10.0, &transform).is_some());
        assert!(controller.begin(20.0, 20.0, &transform).is_none());
        assert_eq!(controller.markers().len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_trims_and_persists() {
        let memory = Arc::new(MemoryStorage::new());
        let mut controller = controller(&memory).await;
        controller.begin(60.0, 40.0, &TransformState::at_scale(0.5));

        assert!(controller.confirm(" Door "));
        controller.flush().await.unwrap();

        assert_eq!(controller.state(), AnnotationState::Idle);
        assert_eq!(controller.markers()[0].label, "Door");
        assert!(!controller.markers()[0].pending);
        assert_eq!(stored(&memory), r#"[{"id":"m1","x":120.0,"y":80.0,"label":"Door"}]"#);
    }

    #[tokio::test]
    async fn test_blank_confirm_keeps_pending() {
        let memory = Arc::new(MemoryStorage::new());
        let mut controller = controller(&memory).await;
        controller.begin(60.0, 40.0, &TransformState::at_scale(0.5));
        controller.flush().await.unwrap();
        let before = stored(&memory);

        assert!(!controller.can_confirm("  "));
        assert!(!controller.confirm("  "));

        assert!(controller.is_pending());
        assert!(controller.pending_marker().unwrap().pending);
        controller.flush().await.unwrap();
        assert_eq!(stored(&memory), before);
    }

    #[tokio::test]
    async fn test_cancel_removes_pending_marker() {
        let memory = Arc::new(MemoryStorage::new());
        let mut controller = controller(&memory).await;
        controller.begin(60.0, 40.0, &TransformState::at_scale(0.5));

        controller.cancel();

        assert_eq!(controller.state(), AnnotationState::Idle);
        assert!(controller.markers().is_empty());
        // idle cancel is a no-op
        controller.cancel();
        controller.flush().await.unwrap();
        assert_eq!(stored(&memory), "[]");
    }

    #[tokio::test]
    async fn test_remove_only_confirmed_markers() {
        let memory = Arc::new(MemoryStorage::new());
        let mut controller = controller(&memory).await;
        let transform = TransformState::at_scale(0.5);
        controller.begin(10.0, 10.0, &transform);
        controller.confirm("Lamp");
        controller.begin(30.0, 30.0, &transform);

        assert!(!controller.remove("m2"));
        assert!(controller.remove("m1"));
        assert!(!controller.remove("missing"));

        assert_eq!(controller.markers().len(), 1);
        assert!(controller.is_pending());
    }

    #[tokio::test]
    async fn test_long_press_skips_ids_of_stored_markers() {
        let now = chrono::Utc::now().timestamp_millis();
        let stored_markers: Vec<Marker> = (0..50)
            .map(|n| {
                let mut marker = Marker::new((now + n).to_string(), 1.0, 1.0, false);
                marker.label = format!("Pin {n}");
                marker
            })
            .collect();
        let memory = Arc::new(MemoryStorage::new().with_entry(
            &StorageKey::markers("p1"),
            &serde_json::to_string(&stored_markers).unwrap(),
        ));
        let storage: Arc<dyn KeyValueStore> = memory.clone();
        let store = MarkerStore::load(storage, "p1").await;
        assert_eq!(store.markers().len(), 50);

        let mut controller = AnnotationController::new(store, Arc::new(MonotonicIds::new()));
        controller.set_image_size(ImageSize::new(1000.0, 800.0));

        let placed = controller
            .begin(10.0, 10.0, &TransformState::at_scale(0.5))
            .map(|marker| marker.id.clone());

        let id = placed.expect("long press should place a marker");
        assert!(!stored_markers.iter().any(|m| m.id == id));
        assert_eq!(controller.markers().len(), 51);
        assert!(controller.is_pending());
    }

    #[tokio::test]
    async fn test_nothing_placed_before_image_size() {
        let memory = Arc::new(MemoryStorage::new());
        let storage: Arc<dyn KeyValueStore> = memory.clone();
        let store = MarkerStore::load(storage, "p1").await;
        let mut controller = AnnotationController::new(store, Arc::new(CountingIds(AtomicU32::new(1))));

        assert!(controller.begin(10.0, 10.0, &TransformState::default()).is_none());
        assert!(!controller.is_pending());
    }
}
