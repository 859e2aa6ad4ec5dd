//! Pointer events in, gestures out.
//!
//! Long-press, pan and double-tap race on the primary pointer: whichever is
//! recognized first wins the touch sequence. Pinch runs alongside them on the
//! first two pointers; while it is active the pan is suspended and resumes
//! from the remaining finger when the pinch ends.

use cgmath::{InnerSpace, Vector2};
use std::time::Instant;

use crate::config::AnnotatorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// One raw touch sample in screen space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub id: u64,
    pub phase: PointerPhase,
    pub x: f64,
    pub y: f64,
    pub time: Instant,
}

impl PointerEvent {
    pub fn new(id: u64, phase: PointerPhase, x: f64, y: f64, time: Instant) -> Self {
        Self { id, phase, x, y, time }
    }

    fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
}

/// A recognized gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEvent {
    PanStart,
    /// Cumulative translation since the matching `PanStart`
    PanUpdate { translation_x: f64, translation_y: f64 },
    PanEnd,
    PinchStart { focal_x: f64, focal_y: f64 },
    /// Finger distance relative to the start of the pinch
    PinchUpdate { scale: f64, focal_x: f64, focal_y: f64 },
    PinchEnd,
    LongPress { x: f64, y: f64 },
    DoubleTap { x: f64, y: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Race {
    /// Nothing recognized yet
    Possible,
    Panning,
    LongPressed,
    /// Lost to a pinch or cancelled
    Failed,
}

#[derive(Debug, Clone, Copy)]
struct Primary {
    id: u64,
    down_at: Instant,
    start: Vector2<f64>,
    pan_origin: Vector2<f64>,
    race: Race,
}

#[derive(Debug, Clone, Copy)]
struct Pinch {
    ids: [u64; 2],
    start_distance: f64,
}

#[derive(Debug)]
pub struct GestureRecognizer {
    config: AnnotatorConfig,
    pointers: Vec<(u64, Vector2<f64>)>,
    primary: Option<Primary>,
    pinch: Option<Pinch>,
    last_tap: Option<(Vector2<f64>, Instant)>,
}

impl GestureRecognizer {
    pub fn new(config: AnnotatorConfig) -> Self {
        Self {
            config: config.validated(),
            pointers: Vec::new(),
            primary: None,
            pinch: None,
            last_tap: None,
        }
    }

    /// Whether any finger is down
    pub fn is_active(&self) -> bool {
        !self.pointers.is_empty()
    }

    /// Feed one pointer sample
    pub fn handle(&mut self, event: PointerEvent) -> Vec<GestureEvent> {
        let mut out = self.poll(event.time);
        match event.phase {
            PointerPhase::Down => self.on_down(event, &mut out),
            PointerPhase::Move => self.on_move(event, &mut out),
            PointerPhase::Up | PointerPhase::Cancel => self.on_up(event, &mut out),
        }
        out
    }

    /// Fire time-based gestures (long-press) that are due at `now`.
    ///
    /// Call this every frame while a finger is down.
    pub fn poll(&mut self, now: Instant) -> Vec<GestureEvent> {
        let min_duration = self.config.long_press_min_duration();
        let Some(primary) = self.primary.as_mut() else {
            return Vec::new();
        };
        if primary.race != Race::Possible
            || self.pinch.is_some()
            || now.saturating_duration_since(primary.down_at) < min_duration
        {
            return Vec::new();
        }

        primary.race = Race::LongPressed;
        let (id, start) = (primary.id, primary.start);
        self.last_tap = None;
        let at = self.pointer(id).unwrap_or(start);
        tracing::debug!(x = at.x, y = at.y, "long press");
        vec![GestureEvent::LongPress { x: at.x, y: at.y }]
    }

    fn pointer(&self, id: u64) -> Option<Vector2<f64>> {
        self.pointers.iter().find(|(p, _)| *p == id).map(|(_, pos)| *pos)
    }

    fn on_down(&mut self, event: PointerEvent, out: &mut Vec<GestureEvent>) {
        if self.pointer(event.id).is_some() {
            return;
        }
        self.pointers.push((event.id, event.position()));

        match self.pointers.len() {
            1 => {
                self.primary = Some(Primary {
                    id: event.id,
                    down_at: event.time,
                    start: event.position(),
                    pan_origin: event.position(),
                    race: Race::Possible,
                });
            }
            2 => {
                if let Some(primary) = self.primary.as_mut() {
                    match primary.race {
                        Race::Possible => primary.race = Race::Failed,
                        Race::Panning => out.push(GestureEvent::PanEnd),
                        Race::LongPressed | Race::Failed => {}
                    }
                }
                self.last_tap = None;
                self.start_pinch(out);
            }
            _ => {}
        }
    }

    fn start_pinch(&mut self, out: &mut Vec<GestureEvent>) {
        let (a, pa) = self.pointers[0];
        let (b, pb) = self.pointers[1];
        let focal = (pa + pb) * 0.5;
        self.pinch = Some(Pinch {
            ids: [a, b],
            start_distance: (pb - pa).magnitude(),
        });
        out.push(GestureEvent::PinchStart {
            focal_x: focal.x,
            focal_y: focal.y,
        });
    }

    fn on_move(&mut self, event: PointerEvent, out: &mut Vec<GestureEvent>) {
        let Some(slot) = self.pointers.iter_mut().find(|(p, _)| *p == event.id) else {
            return;
        };
        slot.1 = event.position();

        if let Some(pinch) = self.pinch {
            if pinch.ids.contains(&event.id) {
                if let (Some(pa), Some(pb)) = (self.pointer(pinch.ids[0]), self.pointer(pinch.ids[1])) {
                    if pinch.start_distance > f64::EPSILON {
                        let focal = (pa + pb) * 0.5;
                        out.push(GestureEvent::PinchUpdate {
                            scale: (pb - pa).magnitude() / pinch.start_distance,
                            focal_x: focal.x,
                            focal_y: focal.y,
                        });
                    }
                }
            }
            return;
        }

        let slop = self.config.touch_slop;
        let Some(primary) = self.primary.as_mut().filter(|p| p.id == event.id) else {
            return;
        };
        let position = event.position();
        match primary.race {
            Race::Possible => {
                if (position - primary.start).magnitude() > slop {
                    primary.race = Race::Panning;
                    out.push(GestureEvent::PanStart);
                    out.push(pan_update(position - primary.pan_origin));
                }
            }
            Race::Panning => out.push(pan_update(position - primary.pan_origin)),
            Race::LongPressed | Race::Failed => {}
        }
    }

    fn on_up(&mut self, event: PointerEvent, out: &mut Vec<GestureEvent>) {
        let Some(index) = self.pointers.iter().position(|(p, _)| *p == event.id) else {
            return;
        };
        self.pointers.remove(index);

        if let Some(pinch) = self.pinch {
            if pinch.ids.contains(&event.id) {
                self.pinch = None;
                out.push(GestureEvent::PinchEnd);
                self.resume_pan(out);
            }
            return;
        }

        let Some(primary) = self.primary.filter(|p| p.id == event.id) else {
            return;
        };
        self.primary = None;

        match primary.race {
            Race::Possible if event.phase == PointerPhase::Up => self.on_tap(event, out),
            Race::Panning => out.push(GestureEvent::PanEnd),
            _ => {}
        }
    }

    /// After a pinch, the finger left on screen keeps panning
    fn resume_pan(&mut self, out: &mut Vec<GestureEvent>) {
        let Some(&(id, position)) = self.pointers.first() else {
            self.primary = None;
            return;
        };
        let Some(primary) = self.primary.as_mut() else {
            return;
        };
        if primary.race == Race::LongPressed {
            return;
        }
        primary.id = id;
        primary.pan_origin = position;
        primary.race = Race::Panning;
        out.push(GestureEvent::PanStart);
    }

    fn on_tap(&mut self, event: PointerEvent, out: &mut Vec<GestureEvent>) {
        let position = event.position();
        let is_second_tap = self.last_tap.is_some_and(|(at, time)| {
            event.time.saturating_duration_since(time) <= self.config.double_tap_timeout()
                && (position - at).magnitude() <= self.config.double_tap_slop
        });

        if is_second_tap {
            self.last_tap = None;
            out.push(GestureEvent::DoubleTap {
                x: position.x,
                y: position.y,
            });
        } else {
            self.last_tap = Some((position, event.time));
        }
    }
}

fn pan_update(translation: Vector2<f64>) -> GestureEvent {
    GestureEvent::PanUpdate {
        translation_x: translation.x,
        translation_y: translation.y,
    }
}
