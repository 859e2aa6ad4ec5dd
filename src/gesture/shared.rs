//! Transform values shared between the animation thread and the UI thread.
//!
//! The animation thread is the only writer. It updates the values on every
//! touch move. The UI thread reads them (for instance to place a marker when a
//! long-press fires) and asks for animated changes by sending a
//! [`TransformCommand`] that the animation thread applies on its next tick.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

use super::coords::TransformState;
use crate::state::ImageSize;

/// An `f64` readable and writable from any thread without locking
#[derive(Debug)]
pub struct SharedValue(AtomicU64);

impl SharedValue {
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::SeqCst))
    }

    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::SeqCst);
    }
}

#[derive(Debug)]
struct Cells {
    /// Odd while a write is in progress
    sequence: AtomicU64,
    translate_x: SharedValue,
    translate_y: SharedValue,
    scale: SharedValue,
}

/// Create the single writer and a cloneable reader for a transform
pub fn shared_transform(initial: TransformState) -> (TransformWriter, TransformReader) {
    let cells = Arc::new(Cells {
        sequence: AtomicU64::new(0),
        translate_x: SharedValue::new(initial.translate_x),
        translate_y: SharedValue::new(initial.translate_y),
        scale: SharedValue::new(initial.scale),
    });
    (
        TransformWriter {
            cells: Arc::clone(&cells),
        },
        TransformReader { cells },
    )
}

/// Write side, owned by the animation thread
#[derive(Debug)]
pub struct TransformWriter {
    cells: Arc<Cells>,
}

impl TransformWriter {
    pub fn write(&self, state: TransformState) {
        let cells = &self.cells;
        cells.sequence.fetch_add(1, Ordering::SeqCst);
        cells.translate_x.set(state.translate_x);
        cells.translate_y.set(state.translate_y);
        cells.scale.set(state.scale);
        cells.sequence.fetch_add(1, Ordering::SeqCst);
    }

    pub fn reader(&self) -> TransformReader {
        TransformReader {
            cells: Arc::clone(&self.cells),
        }
    }
}

/// Read side; never blocks the writer
#[derive(Debug, Clone)]
pub struct TransformReader {
    cells: Arc<Cells>,
}

impl TransformReader {
    /// All three values from the same write
    pub fn snapshot(&self) -> TransformState {
        let cells = &self.cells;
        loop {
            let before = cells.sequence.load(Ordering::SeqCst);
            if before % 2 == 1 {
                std::hint::spin_loop();
                continue;
            }
            let state = TransformState::new(
                cells.translate_x.get(),
                cells.translate_y.get(),
                cells.scale.get(),
            );
            if cells.sequence.load(Ordering::SeqCst) == before {
                return state;
            }
        }
    }

    pub fn scale(&self) -> f64 {
        self.cells.scale.get()
    }
}

/// Quadratic ease in and out: linear progress in [0, 1] to eased progress
pub fn ease_in_out_quad(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// A running eased transition between two transforms
#[derive(Debug, Clone, Copy)]
pub struct Animation {
    from: TransformState,
    to: TransformState,
    started: Instant,
    duration: Duration,
}

impl Animation {
    pub fn new(from: TransformState, to: TransformState, started: Instant, duration: Duration) -> Self {
        Self {
            from,
            to,
            started,
            duration,
        }
    }

    pub fn target(&self) -> TransformState {
        self.to
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= self.duration
    }

    /// Interpolated transform at `now`
    pub fn value_at(&self, now: Instant) -> TransformState {
        if self.duration.is_zero() || self.is_finished(now) {
            return self.to;
        }
        let elapsed = now.saturating_duration_since(self.started).as_secs_f64();
        let t = ease_in_out_quad(elapsed / self.duration.as_secs_f64());
        let lerp = |a: f64, b: f64| a + (b - a) * t;
        TransformState::new(
            lerp(self.from.translate_x, self.to.translate_x),
            lerp(self.from.translate_y, self.to.translate_y),
            lerp(self.from.scale, self.to.scale),
        )
    }
}

/// Requests from the UI thread, applied by the animation thread
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformCommand {
    /// Image dimensions resolved; refit to width
    SetImageSize(ImageSize),
    SetViewportWidth(f64),
    /// Animate back to the fit-to-width home transform
    Reset,
}

/// UI-thread handle for sending transform commands
#[derive(Debug, Clone)]
pub struct TransformScheduler {
    commands: mpsc::UnboundedSender<TransformCommand>,
}

impl TransformScheduler {
    /// Queue a command; returns false if the animation side is gone
    pub fn send(&self, command: TransformCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn request_reset(&self) -> bool {
        self.send(TransformCommand::Reset)
    }
}

/// Command queue consumed by the animation thread
#[derive(Debug)]
pub struct CommandQueue {
    commands: mpsc::UnboundedReceiver<TransformCommand>,
}

impl CommandQueue {
    /// Next queued command, if any; never waits
    pub fn try_next(&mut self) -> Option<TransformCommand> {
        self.commands.try_recv().ok()
    }
}

pub fn command_channel() -> (TransformScheduler, CommandQueue) {
    let (commands, queue) = mpsc::unbounded_channel();
    (
        TransformScheduler { commands },
        CommandQueue { commands: queue },
    )
}
