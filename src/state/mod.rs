//! State management module
//!
//! This module handles all persisted application state, including:
//! - Shared data structures (data.rs)
//! - Key-value storage backends (storage.rs)
//! - Background persistence (persist.rs)
//! - Per-photo markers (markers.rs)
//! - The photo library (photos.rs)
//! - Id generation (ids.rs)

pub mod data;
pub mod ids;
pub mod markers;
mod persist;
pub mod photos;
pub mod storage;

pub use data::{ImageSize, Marker, Photo, SAMPLE_PHOTO_ID};
pub use ids::{IdGenerator, MonotonicIds, UuidIds};
pub use markers::MarkerStore;
pub use persist::PersistTicket;
pub use photos::{describe_added_at, PhotoStore};
pub use storage::{KeyValueStore, MemoryStorage, SqliteStorage, StorageKey};
