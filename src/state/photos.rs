use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tokio::runtime::Handle;

use super::data::Photo;
use super::ids::{IdGenerator, MonotonicIds, UuidIds};
use super::persist::{load_collection, PersistTicket, Persister};
use super::storage::{KeyValueStore, StorageKey};

/// The photo library: every photo the user has added, newest first
pub struct PhotoStore {
    photos: Vec<Photo>,
    ids: Arc<dyn IdGenerator>,
    persister: Persister,
}

impl PhotoStore {
    /// Load the library with time-derived photo ids
    pub async fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        Self::load_with_ids(storage, Arc::new(MonotonicIds::new())).await
    }

    pub async fn load_with_ids(storage: Arc<dyn KeyValueStore>, ids: Arc<dyn IdGenerator>) -> Self {
        let key = StorageKey::photos();
        let photos: Vec<Photo> = load_collection(Arc::clone(&storage), key.clone()).await;
        tracing::debug!(count = photos.len(), "photos loaded");

        Self {
            photos,
            ids,
            persister: Persister::spawn(&Handle::current(), storage, key),
        }
    }

    /// Stored photos, newest first
    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn get(&self, id: &str) -> Option<&Photo> {
        self.photos.iter().find(|p| p.id == id)
    }

    /// The list shown to the user: the sample photo, then the library
    pub fn gallery(&self, sample: &Photo) -> Vec<Photo> {
        std::iter::once(sample.clone())
            .chain(self.photos.iter().cloned())
            .collect()
    }

    /// Add a photo taken now
    pub fn add_photo(&mut self, uri: impl Into<String>) -> (Photo, PersistTicket) {
        self.add_photo_at(uri, Utc::now().timestamp_millis())
    }

    /// Add a photo with an explicit creation time (epoch millis).
    ///
    /// The record is returned right away so the caller can open it by id.
    pub fn add_photo_at(&mut self, uri: impl Into<String>, added_at: i64) -> (Photo, PersistTicket) {
        let photo = Photo {
            id: self.fresh_id(),
            uri: uri.into(),
            added_at,
        };
        tracing::info!(photo = %photo.id, uri = %photo.uri, "photo added");

        self.photos.insert(0, photo.clone());
        let ticket = self.persister.write(&self.photos);
        (photo, ticket)
    }

    /// Stored ids may be ahead of a time-based generator; skip taken ones
    fn fresh_id(&self) -> String {
        for _ in 0..=self.photos.len() {
            let id = self.ids.next_id();
            if self.get(&id).is_none() {
                return id;
            }
        }
        tracing::warn!("photo id generator keeps repeating, using a random id");
        UuidIds.next_id()
    }

    /// Remove a photo from the library. The sample photo is ignored.
    ///
    /// The photo's markers are left in storage.
    pub fn remove_photo(&mut self, id: &str) -> Option<PersistTicket> {
        if id == super::data::SAMPLE_PHOTO_ID {
            return None;
        }
        self.photos.retain(|p| p.id != id);
        tracing::info!(photo = %id, "photo removed");
        Some(self.persister.write(&self.photos))
    }
}

impl std::fmt::Debug for PhotoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoStore")
            .field("photos", &self.photos)
            .finish()
    }
}

/// Human-readable creation time relative to `now`:
/// "Today, 14:05", "Yesterday, 09:30" or "Mar 3, 2026"
pub fn describe_added_at<Tz: TimeZone>(added_at: i64, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let Some(added) = DateTime::from_timestamp_millis(added_at) else {
        return String::new();
    };
    let added = added.with_timezone(&now.timezone());
    let days_ago = (now.date_naive() - added.date_naive()).num_days();
    let time = added.format("%H:%M");

    match days_ago {
        0 => format!("Today, {time}"),
        1 => format!("Yesterday, {time}"),
        _ => added.format("%b %-d, %Y").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::storage::MemoryStorage;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingIds(AtomicU32);

    impl IdGenerator for CountingIds {
        fn next_id(&self) -> String {
            format!("p{}", self.0.fetch_add(1, Ordering::Relaxed))
        }
    }

    async fn store_with(memory: &Arc<MemoryStorage>) -> PhotoStore {
        let storage: Arc<dyn KeyValueStore> = memory.clone();
        PhotoStore::load_with_ids(storage, Arc::new(CountingIds(AtomicU32::new(1)))).await
    }

    #[tokio::test]
    async fn test_add_prepends_and_persists() {
        let memory = Arc::new(MemoryStorage::new());
        let mut store = store_with(&memory).await;

        let (first, _) = store.add_photo_at("file:///a.jpg", 100);
        let (second, ticket) = store.add_photo_at("file:///b.jpg", 200);
        ticket.wait().await.unwrap();

        assert_eq!(first.id, "p1");
        assert_eq!(store.photos()[0], second);
        assert_eq!(store.photos()[1], first);

        let raw = memory.get(&StorageKey::photos()).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["uri"], "file:///b.jpg");
        assert_eq!(value[0]["addedAt"], 200);
        assert_eq!(value[1]["id"], "p1");
    }

    #[tokio::test]
    async fn test_new_photo_skips_stored_ids() {
        let now = Utc::now().timestamp_millis();
        let stored: Vec<Photo> = (0..20)
            .map(|n| Photo {
                id: (now + n).to_string(),
                uri: format!("file:///{n}.jpg"),
                added_at: now,
            })
            .collect();
        let memory = Arc::new(
            MemoryStorage::new().with_entry(&StorageKey::photos(), &serde_json::to_string(&stored).unwrap()),
        );
        let storage: Arc<dyn KeyValueStore> = memory.clone();
        let mut store = PhotoStore::load(storage).await;

        let (photo, _) = store.add_photo("file:///new.jpg");

        assert!(!stored.iter().any(|p| p.id == photo.id));
        assert_eq!(store.photos().len(), 21);
    }

    #[tokio::test]
    async fn test_remove_photo() {
        let memory = Arc::new(MemoryStorage::new());
        let mut store = store_with(&memory).await;
        let (photo, _) = store.add_photo_at("file:///a.jpg", 1);

        store.remove_photo(&photo.id).unwrap().wait().await.unwrap();

        assert!(store.photos().is_empty());
        assert_eq!(memory.get(&StorageKey::photos()).unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_sample_photo_is_never_removed_or_stored() {
        let memory = Arc::new(MemoryStorage::new());
        let mut store = store_with(&memory).await;
        let sample = Photo::sample("asset://bg.jpg");

        assert!(store.remove_photo(&sample.id).is_none());
        store.add_photo_at("file:///a.jpg", 5).1.wait().await.unwrap();

        let gallery = store.gallery(&sample);
        assert!(gallery[0].is_sample());
        assert_eq!(gallery.len(), 2);
        let raw = memory.get(&StorageKey::photos()).unwrap().unwrap();
        assert!(!raw.contains("__sample__"));
    }

    #[tokio::test]
    async fn test_reload_keeps_order() {
        let memory = Arc::new(MemoryStorage::new());
        {
            let mut store = store_with(&memory).await;
            let _ = store.add_photo_at("a", 1);
            store.add_photo_at("b", 2).1.wait().await.unwrap();
        }
        let storage: Arc<dyn KeyValueStore> = memory.clone();
        let reloaded = PhotoStore::load(storage).await;
        let uris: Vec<&str> = reloaded.photos().iter().map(|p| p.uri.as_str()).collect();
        assert_eq!(uris, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_corrupt_photos_start_empty() {
        let memory = Arc::new(MemoryStorage::new().with_entry(&StorageKey::photos(), "{not json"));
        let store = store_with(&memory).await;

        assert!(store.photos().is_empty());
        assert!(!memory.contains(&StorageKey::photos()));
    }

    #[test]
    fn test_describe_added_at() {
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 18, 0, 0).unwrap();
        let today = Utc.with_ymd_and_hms(2026, 3, 10, 9, 5, 0).unwrap();
        let yesterday = Utc.with_ymd_and_hms(2026, 3, 9, 23, 59, 0).unwrap();
        let older = Utc.with_ymd_and_hms(2026, 3, 3, 12, 0, 0).unwrap();

        assert_eq!(describe_added_at(today.timestamp_millis(), &now), "Today, 09:05");
        assert_eq!(describe_added_at(yesterday.timestamp_millis(), &now), "Yesterday, 23:59");
        assert_eq!(describe_added_at(older.timestamp_millis(), &now), "Mar 3, 2026");
    }
}
