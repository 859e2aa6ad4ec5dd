use std::sync::Arc;

use crate::config::AnnotatorConfig;
use crate::error::StorageResult;
use crate::gesture::{
    image_to_screen, GestureDriver, GestureEvent, TransformCommand, TransformReader,
    TransformScheduler, TransformState,
};
use crate::state::{IdGenerator, ImageSize, KeyValueStore, Marker, MarkerStore, MonotonicIds};

use super::annotator::AnnotationController;

/// A marker together with where it currently sits on screen
#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    pub marker: Marker,
    pub screen_x: f64,
    pub screen_y: f64,
}

/// UI-thread side of an open photo.
///
/// Owns the annotation lifecycle and reads the live transform published by
/// the paired [`GestureDriver`], which runs on the animation thread.
pub struct AnnotatorCanvas {
    controller: AnnotationController,
    transform: TransformReader,
    scheduler: TransformScheduler,
}

impl AnnotatorCanvas {
    /// Open `photo_id`: load its markers and create the gesture driver that
    /// goes with this canvas
    pub async fn open(
        storage: Arc<dyn KeyValueStore>,
        photo_id: &str,
        config: AnnotatorConfig,
        viewport_width: f64,
    ) -> (Self, GestureDriver) {
        Self::open_with_ids(storage, photo_id, config, viewport_width, Arc::new(MonotonicIds::new()))
            .await
    }

    pub async fn open_with_ids(
        storage: Arc<dyn KeyValueStore>,
        photo_id: &str,
        config: AnnotatorConfig,
        viewport_width: f64,
        ids: Arc<dyn IdGenerator>,
    ) -> (Self, GestureDriver) {
        let store = MarkerStore::load(storage, photo_id).await;
        let driver = GestureDriver::new(config, viewport_width);
        let canvas = Self {
            controller: AnnotationController::new(store, ids),
            transform: driver.engine().reader(),
            scheduler: driver.engine().scheduler(),
        };
        (canvas, driver)
    }

    /// Image dimensions resolved by the host.
    ///
    /// The driver refits to width on its next tick.
    pub fn set_image_size(&mut self, size: ImageSize) {
        self.controller.set_image_size(size);
        self.scheduler.send(TransformCommand::SetImageSize(size));
    }

    pub fn set_viewport_width(&self, width: f64) {
        self.scheduler.send(TransformCommand::SetViewportWidth(width));
    }

    /// Nothing should be drawn until this is true
    pub fn is_ready(&self) -> bool {
        self.controller.image_size().is_some()
    }

    pub fn image_size(&self) -> Option<ImageSize> {
        self.controller.image_size()
    }

    /// Current transform, for drawing the image
    pub fn transform(&self) -> TransformState {
        self.transform.snapshot()
    }

    pub fn markers(&self) -> &[Marker] {
        self.controller.markers()
    }

    /// Markers mapped to the current screen position
    pub fn pins(&self) -> Vec<Pin> {
        let transform = self.transform();
        self.controller
            .markers()
            .iter()
            .map(|marker| {
                let (screen_x, screen_y) = image_to_screen(marker.x, marker.y, &transform);
                Pin {
                    marker: marker.clone(),
                    screen_x,
                    screen_y,
                }
            })
            .collect()
    }

    /// React to a gesture forwarded from the driver; only long-presses matter here
    pub fn on_gesture(&mut self, gesture: &GestureEvent) -> bool {
        match *gesture {
            GestureEvent::LongPress { x, y } => self.long_press(x, y).is_some(),
            _ => false,
        }
    }

    /// Place a pending marker under the screen point, using one consistent
    /// snapshot of the live transform
    pub fn long_press(&mut self, screen_x: f64, screen_y: f64) -> Option<&Marker> {
        let transform = self.transform.snapshot();
        self.controller.begin(screen_x, screen_y, &transform)
    }

    pub fn is_pending(&self) -> bool {
        self.controller.is_pending()
    }

    /// Whether the confirm action should be enabled for `label`
    pub fn can_confirm(&self, label: &str) -> bool {
        self.controller.can_confirm(label)
    }

    pub fn confirm(&mut self, label: &str) -> bool {
        self.controller.confirm(label)
    }

    pub fn cancel(&mut self) {
        self.controller.cancel();
    }

    /// The label prompt was closed without confirming
    pub fn dismiss(&mut self) {
        self.controller.cancel();
    }

    pub fn remove_marker(&mut self, id: &str) -> bool {
        self.controller.remove(id)
    }

    /// Ask the driver to animate back to fit-to-width
    pub fn reset_view(&self) -> bool {
        self.scheduler.request_reset()
    }

    pub fn controller(&self) -> &AnnotationController {
        &self.controller
    }

    pub async fn flush(&mut self) -> StorageResult<()> {
        self.controller.flush().await
    }
}

impl std::fmt::Debug for AnnotatorCanvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnotatorCanvas")
            .field("controller", &self.controller)
            .field("transform", &self.transform.snapshot())
            .finish()
    }
}
