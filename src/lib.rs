//! Pan and zoom a photo, long-press to pin labeled markers on it, and keep
//! the confirmed markers per photo.
//!
//! - [`gesture`] runs on the animation thread: pointer events, pan / pinch /
//!   double-tap reset, and the live transform shared with the UI thread.
//! - [`ui`] runs on the UI thread: the pending marker lifecycle and the
//!   read-only snapshots a renderer needs.
//! - [`state`] holds the marker and photo stores and their storage backends.

pub mod config;
pub mod error;
pub mod gesture;
pub mod logging;
pub mod state;
pub mod ui;

pub use config::AnnotatorConfig;
pub use error::{StorageError, StorageResult};
pub use gesture::{GestureDriver, GestureEvent, PointerEvent, PointerPhase, TransformState};
pub use state::{ImageSize, KeyValueStore, Marker, MarkerStore, Photo, PhotoStore};
pub use ui::{AnnotationController, AnnotatorCanvas, Pin};
