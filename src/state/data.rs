//! Shared data structures for the application state
//!
//! These structs represent the data model that flows between
//! the storage layer and the presentation layer.

use serde::{Deserialize, Serialize};

/// Reserved id of the bundled sample photo.
///
/// The sample is shown in the photo list but never persisted, and store
/// mutations ignore it.
pub const SAMPLE_PHOTO_ID: &str = "__sample__";

/// A labeled pin on a photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Unique, opaque id
    pub id: String,
    /// Image-space x in pixels, within [0, width]
    pub x: f64,
    /// Image-space y in pixels, within [0, height]
    pub y: f64,
    /// Empty while pending, trimmed and non-empty once confirmed
    pub label: String,
    /// Placed but not yet labeled. Never written to storage.
    #[serde(skip)]
    pub pending: bool,
}

impl Marker {
    /// Create an unlabeled marker
    pub fn new(id: impl Into<String>, x: f64, y: f64, pending: bool) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            label: String::new(),
            pending,
        }
    }
}

/// Represents a single photo in the library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    /// Unique id, time-derived
    pub id: String,
    /// Opaque reference to the image bytes (owned by the host)
    pub uri: String,
    /// Creation timestamp in epoch milliseconds
    pub added_at: i64,
}

impl Photo {
    /// The presentation-only sample photo for the given asset uri
    pub fn sample(uri: impl Into<String>) -> Self {
        Self {
            id: SAMPLE_PHOTO_ID.to_string(),
            uri: uri.into(),
            added_at: 0,
        }
    }

    pub fn is_sample(&self) -> bool {
        self.id == SAMPLE_PHOTO_ID
    }
}

/// Pixel dimensions of an image, resolved by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSize {
    pub width: f64,
    pub height: f64,
}

impl ImageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both dimensions are positive and finite
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}
