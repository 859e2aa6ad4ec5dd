//! Screen space <-> image space conversion.
//!
//! Image space is the original pixel grid of the photo; screen space is what
//! touch events report. The live [`TransformState`] is the only thing needed
//! to go from one to the other.

use cgmath::Vector2;

use crate::state::ImageSize;

/// Live pan/zoom of the image: screen = image * scale + translate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformState {
    pub translate_x: f64,
    pub translate_y: f64,
    /// Screen pixels per image pixel
    pub scale: f64,
}

impl TransformState {
    pub fn new(translate_x: f64, translate_y: f64, scale: f64) -> Self {
        Self {
            translate_x,
            translate_y,
            scale,
        }
    }

    /// No translation at the given scale
    pub fn at_scale(scale: f64) -> Self {
        Self::new(0.0, 0.0, scale)
    }

    pub fn translate(&self) -> Vector2<f64> {
        Vector2::new(self.translate_x, self.translate_y)
    }

    pub fn with_translate(self, translate: Vector2<f64>) -> Self {
        Self {
            translate_x: translate.x,
            translate_y: translate.y,
            ..self
        }
    }
}

impl Default for TransformState {
    fn default() -> Self {
        Self::at_scale(1.0)
    }
}

/// Convert a touch point to image pixels, clamped to the image bounds
pub fn screen_to_image(
    screen_x: f64,
    screen_y: f64,
    state: &TransformState,
    bounds: ImageSize,
) -> (f64, f64) {
    let image_x = (screen_x - state.translate_x) / state.scale;
    let image_y = (screen_y - state.translate_y) / state.scale;
    (
        image_x.clamp(0.0, bounds.width),
        image_y.clamp(0.0, bounds.height),
    )
}

/// Convert image pixels to a screen point. Not clamped: pins outside the
/// viewport are valid, just not visible.
pub fn image_to_screen(image_x: f64, image_y: f64, state: &TransformState) -> (f64, f64) {
    (
        image_x * state.scale + state.translate_x,
        image_y * state.scale + state.translate_y,
    )
}
