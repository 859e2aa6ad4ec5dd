//! Gesture handling and the live image transform
//!
//! This module runs on the animation thread:
//! - Coordinate conversion (coords.rs)
//! - Values shared with the UI thread (shared.rs)
//! - Pan / pinch / reset transform engine (transform.rs)
//! - Pointer event classification (recognizer.rs)

pub mod coords;
pub mod recognizer;
pub mod shared;
pub mod transform;

pub use coords::{image_to_screen, screen_to_image, TransformState};
pub use recognizer::{GestureEvent, GestureRecognizer, PointerEvent, PointerPhase};
pub use shared::{TransformCommand, TransformReader, TransformScheduler};
pub use transform::TransformEngine;

use std::time::Instant;

use crate::config::AnnotatorConfig;
use crate::state::ImageSize;

/// Recognizer and transform engine for one open photo.
///
/// Feed it pointer events and call [`GestureDriver::tick`] every frame.
/// Pan, pinch and double-tap are applied to the transform here; the returned
/// events let the UI thread react to long-presses.
#[derive(Debug)]
pub struct GestureDriver {
    recognizer: GestureRecognizer,
    engine: TransformEngine,
}

impl GestureDriver {
    pub fn new(config: AnnotatorConfig, viewport_width: f64) -> Self {
        Self {
            recognizer: GestureRecognizer::new(config.clone()),
            engine: TransformEngine::new(config, viewport_width),
        }
    }

    pub fn engine(&self) -> &TransformEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut TransformEngine {
        &mut self.engine
    }

    pub fn set_image_size(&mut self, size: ImageSize) {
        self.engine.set_image_size(size);
    }

    pub fn handle(&mut self, event: PointerEvent) -> Vec<GestureEvent> {
        let gestures = self.recognizer.handle(event);
        self.apply(&gestures, event.time);
        gestures
    }

    /// Fire due long-presses and advance animations
    pub fn tick(&mut self, now: Instant) -> Vec<GestureEvent> {
        let gestures = self.recognizer.poll(now);
        self.apply(&gestures, now);
        self.engine.tick(now);
        gestures
    }

    fn apply(&mut self, gestures: &[GestureEvent], now: Instant) {
        for gesture in gestures {
            match *gesture {
                GestureEvent::PanStart => self.engine.pan_start(),
                GestureEvent::PanUpdate {
                    translation_x,
                    translation_y,
                } => self.engine.pan_update(translation_x, translation_y),
                GestureEvent::PinchStart { focal_x, focal_y } => {
                    self.engine.pinch_start(focal_x, focal_y)
                }
                GestureEvent::PinchUpdate { scale, .. } => self.engine.pinch_update(scale),
                GestureEvent::DoubleTap { .. } => self.engine.double_tap(now),
                GestureEvent::PanEnd | GestureEvent::PinchEnd | GestureEvent::LongPress { .. } => {}
            }
        }
    }
}
