//! Per-photo annotation surface
//!
//! - Pending marker lifecycle (annotator.rs)
//! - UI-thread wiring of markers, transform snapshots and pins (canvas.rs)

pub mod annotator;
pub mod canvas;

pub use annotator::{AnnotationController, AnnotationState};
pub use canvas::{AnnotatorCanvas, Pin};
