//! Pan, pinch and double-tap reset of the live image transform.
//!
//! The engine runs on the animation thread. Every change is published
//! through a [`TransformWriter`] so the UI thread can read the current
//! transform at any time.

use cgmath::Vector2;
use std::time::{Duration, Instant};

use super::coords::TransformState;
use super::shared::{
    command_channel, shared_transform, Animation, CommandQueue, TransformCommand, TransformReader,
    TransformScheduler, TransformWriter,
};
use crate::config::AnnotatorConfig;
use crate::state::ImageSize;

pub struct TransformEngine {
    config: AnnotatorConfig,
    state: TransformState,
    /// Fit-to-width transform, target of the double-tap reset
    home: TransformState,
    saved_translate: Vector2<f64>,
    saved_scale: f64,
    focal: Vector2<f64>,
    image: Option<ImageSize>,
    viewport_width: f64,
    animation: Option<Animation>,
    writer: TransformWriter,
    scheduler: TransformScheduler,
    commands: CommandQueue,
}

impl TransformEngine {
    /// An inconsistent `config` is replaced by the defaults
    pub fn new(config: AnnotatorConfig, viewport_width: f64) -> Self {
        let config = config.validated();
        let initial = TransformState::default();
        let (writer, _) = shared_transform(initial);
        let (scheduler, commands) = command_channel();
        Self {
            config,
            state: initial,
            home: initial,
            saved_translate: initial.translate(),
            saved_scale: initial.scale,
            focal: Vector2::new(0.0, 0.0),
            image: None,
            viewport_width,
            animation: None,
            writer,
            scheduler,
            commands,
        }
    }

    /// Current transform as seen by this thread
    pub fn state(&self) -> TransformState {
        self.state
    }

    pub fn home(&self) -> TransformState {
        self.home
    }

    pub fn image_size(&self) -> Option<ImageSize> {
        self.image
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    /// Read handle for other threads
    pub fn reader(&self) -> TransformReader {
        self.writer.reader()
    }

    /// Command handle for other threads
    pub fn scheduler(&self) -> TransformScheduler {
        self.scheduler.clone()
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Image dimensions resolved (or changed): jump to fit-to-width
    pub fn set_image_size(&mut self, size: ImageSize) {
        if !size.is_valid() {
            tracing::warn!(?size, "ignoring invalid image size");
            return;
        }
        self.image = Some(size);
        self.fit_to_width();
    }

    /// Viewport resized: recompute fit-to-width once the image is known
    pub fn set_viewport_width(&mut self, width: f64) {
        if !(width.is_finite() && width > 0.0) {
            tracing::warn!(width, "ignoring invalid viewport width");
            return;
        }
        self.viewport_width = width;
        if self.image.is_some() {
            self.fit_to_width();
        }
    }

    fn fit_to_width(&mut self) {
        let Some(image) = self.image else {
            return;
        };
        let home = TransformState::at_scale(self.viewport_width / image.width);
        tracing::debug!(scale = home.scale, "fit to width");

        self.animation = None;
        self.home = home;
        self.saved_translate = home.translate();
        self.saved_scale = home.scale;
        self.apply(home);
    }

    pub fn pan_start(&mut self) {
        self.animation = None;
        self.saved_translate = self.state.translate();
    }

    /// `dx`/`dy` are the cumulative drag since [`Self::pan_start`]
    pub fn pan_update(&mut self, dx: f64, dy: f64) {
        let translate = self.saved_translate + Vector2::new(dx, dy);
        self.apply(self.state.with_translate(translate));
    }

    /// Start a pinch around the screen point (`focal_x`, `focal_y`)
    pub fn pinch_start(&mut self, focal_x: f64, focal_y: f64) {
        self.animation = None;
        self.saved_scale = self.state.scale;
        self.saved_translate = self.state.translate();
        self.focal = Vector2::new(focal_x, focal_y);
    }

    /// `ratio` is the finger distance relative to the start of the pinch.
    ///
    /// The image point under the focal point stays put, also when the scale
    /// gets clamped: the translation follows the applied scale change, not
    /// the raw ratio.
    pub fn pinch_update(&mut self, ratio: f64) {
        if !(ratio.is_finite() && ratio > 0.0) || self.saved_scale <= 0.0 {
            return;
        }
        let next_scale = self.config.clamp_scale(self.saved_scale * ratio);
        let scale_change = next_scale / self.saved_scale;
        let translate = self.focal - (self.focal - self.saved_translate) * scale_change;

        self.apply(TransformState {
            scale: next_scale,
            ..self.state.with_translate(translate)
        });
    }

    /// Animate back to the fit-to-width home transform
    pub fn double_tap(&mut self, now: Instant) {
        let duration = self.config.reset_duration();
        self.animate_to(self.home, duration, now);
    }

    fn animate_to(&mut self, target: TransformState, duration: Duration, now: Instant) {
        tracing::debug!(?target, ?duration, "animating transform");
        self.animation = Some(Animation::new(self.state, target, now, duration));
        self.advance(now);
    }

    /// Apply queued commands and advance a running animation.
    ///
    /// Call once per frame. Returns true while an animation is running.
    pub fn tick(&mut self, now: Instant) -> bool {
        while let Some(command) = self.commands.try_next() {
            match command {
                TransformCommand::SetImageSize(size) => self.set_image_size(size),
                TransformCommand::SetViewportWidth(width) => self.set_viewport_width(width),
                TransformCommand::Reset => self.double_tap(now),
            }
        }
        self.advance(now);
        self.animation.is_some()
    }

    fn advance(&mut self, now: Instant) {
        let Some(animation) = self.animation else {
            return;
        };
        self.apply(animation.value_at(now));
        if animation.is_finished(now) {
            self.animation = None;
        }
    }

    fn apply(&mut self, state: TransformState) {
        self.state = state;
        self.writer.write(state);
    }
}

impl std::fmt::Debug for TransformEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformEngine")
            .field("state", &self.state)
            .field("home", &self.home)
            .field("image", &self.image)
            .field("viewport_width", &self.viewport_width)
            .field("animating", &self.animation.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MAX_SCALE, MIN_SCALE};
    use crate::gesture::coords::{image_to_screen, screen_to_image};

    const EPS: f64 = 1e-6;

    fn engine() -> TransformEngine {
        let mut engine = TransformEngine::new(AnnotatorConfig::default(), 400.0);
        engine.set_image_size(ImageSize::new(1000.0, 1500.0));
        engine
    }

    #[test]
    fn test_fit_to_width() {
        let engine = engine();
        assert_eq!(engine.state(), TransformState::at_scale(0.4));
        assert_eq!(engine.home(), engine.state());
        assert_eq!(engine.reader().snapshot(), engine.state());
    }

    #[test]
    fn test_viewport_change_refits() {
        let mut engine = engine();
        engine.pan_start();
        engine.pan_update(30.0, 30.0);
        engine.set_viewport_width(600.0);
        assert_eq!(engine.state(), TransformState::at_scale(0.6));
    }

    #[test]
    fn test_pan_is_relative_to_gesture_start() {
        let mut engine = engine();
        engine.pan_start();
        engine.pan_update(10.0, 5.0);
        engine.pan_update(50.0, 30.0);
        assert_eq!(engine.state(), TransformState::new(50.0, 30.0, 0.4));

        engine.pan_start();
        engine.pan_update(-20.0, 0.0);
        assert_eq!(engine.state(), TransformState::new(30.0, 30.0, 0.4));
    }

    #[test]
    fn test_pan_is_unbounded() {
        let mut engine = engine();
        engine.pan_start();
        engine.pan_update(-10_000.0, 10_000.0);
        assert_eq!(engine.state().translate_x, -10_000.0);
    }

    #[test]
    fn test_pinch_scale_stays_in_bounds() {
        let mut engine = engine();
        engine.pinch_start(200.0, 300.0);
        for ratio in [0.1, 0.5, 0.9, 1.0, 1.3, 1.8, 2.5, 10.0, 0.01] {
            engine.pinch_update(ratio);
            let scale = engine.state().scale;
            assert!((MIN_SCALE..=MAX_SCALE).contains(&scale), "ratio {ratio} gave {scale}");
        }
    }

    #[test]
    fn test_pinch_keeps_focal_point_still() {
        let mut engine = engine();
        engine.pan_start();
        engine.pan_update(-35.0, 12.0);

        let (fx, fy) = (180.0, 260.0);
        let bounds = ImageSize::new(1000.0, 1500.0);
        let under_fingers = screen_to_image(fx, fy, &engine.state(), bounds);

        engine.pinch_start(fx, fy);
        // crosses the upper clamp, then the lower one
        for ratio in [1.2, 1.6, 2.4, 1.1, 0.7, 0.4, 0.2] {
            engine.pinch_update(ratio);
            let (sx, sy) = image_to_screen(under_fingers.0, under_fingers.1, &engine.state());
            assert!((sx - fx).abs() < EPS && (sy - fy).abs() < EPS, "drift at ratio {ratio}");
        }
    }

    #[test]
    fn test_invalid_pinch_ratio_is_ignored() {
        let mut engine = engine();
        engine.pinch_start(0.0, 0.0);
        engine.pinch_update(f64::NAN);
        engine.pinch_update(0.0);
        assert_eq!(engine.state(), engine.home());
    }

    #[test]
    fn test_double_tap_resets_after_pan_and_pinch() {
        let mut engine = engine();
        engine.pan_start();
        engine.pan_update(50.0, 30.0);
        engine.pinch_start(100.0, 100.0);
        engine.pinch_update(2.0);
        assert_ne!(engine.state(), engine.home());

        let start = Instant::now();
        engine.double_tap(start);
        assert!(engine.tick(start + Duration::from_millis(100)));
        let midway = engine.state();
        assert_ne!(midway, engine.home());

        assert!(!engine.tick(start + Duration::from_millis(400)));
        assert_eq!(engine.state(), TransformState::at_scale(0.4));
        assert_eq!(engine.reader().snapshot(), TransformState::at_scale(0.4));
    }

    #[test]
    fn test_reset_command_from_other_thread() {
        let mut engine = engine();
        engine.pan_start();
        engine.pan_update(80.0, -40.0);

        let scheduler = engine.scheduler();
        std::thread::spawn(move || scheduler.request_reset())
            .join()
            .unwrap();

        let now = Instant::now();
        engine.tick(now);
        engine.tick(now + Duration::from_secs(1));
        assert_eq!(engine.state(), engine.home());
    }

    #[test]
    fn test_gesture_interrupts_reset() {
        let mut engine = engine();
        engine.pan_start();
        engine.pan_update(100.0, 0.0);
        let start = Instant::now();
        engine.double_tap(start);
        engine.tick(start + Duration::from_millis(150));
        let interrupted = engine.state();

        engine.pan_start();
        assert!(!engine.is_animating());
        engine.pan_update(10.0, 0.0);
        engine.tick(start + Duration::from_secs(1));
        assert_eq!(engine.state().translate_x, interrupted.translate_x + 10.0);
    }

    #[test]
    fn test_inverted_scale_bounds_fall_back_to_defaults() {
        let config = AnnotatorConfig {
            min_scale: 0.8,
            max_scale: 0.5,
            ..AnnotatorConfig::default()
        };
        let mut engine = TransformEngine::new(config, 400.0);
        assert_eq!(engine.config(), &AnnotatorConfig::default());

        engine.set_image_size(ImageSize::new(1000.0, 1500.0));
        engine.pinch_start(200.0, 200.0);
        engine.pinch_update(1.5);
        assert!((engine.state().scale - 0.6).abs() < EPS);
    }

    #[test]
    fn test_invalid_image_size_keeps_state() {
        let mut engine = TransformEngine::new(AnnotatorConfig::default(), 400.0);
        engine.set_image_size(ImageSize::new(0.0, 100.0));
        assert!(engine.image_size().is_none());
        assert_eq!(engine.state(), TransformState::default());
    }
}
