//! Input handling.
//!
//! Turns raw pointer events from the host into orbit and pan deltas. The
//! tracker only remembers the last pointer position of the active drag; the
//! camera decides what the deltas are allowed to do.

use std::f32::consts::TAU;

use scene_shared::{
    event::{HostEvent, PointerButton},
    viewport::ViewportState,
};

/// Change in orbit angles, in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrbitDelta {
    pub azimuth: f32,
    pub polar: f32,
}

/// What a pointer event means for the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerAction {
    /// A drag started with this button.
    Began(PointerButton),
    Orbit(OrbitDelta),
    /// Screen-space pan, in pixels.
    Pan { dx: f32, dy: f32 },
    Ended,
    None,
}

/// Pointer state between events.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerTracker {
    active: Option<(PointerButton, f32, f32)>,
}

impl PointerTracker {
    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    /// Interprets one event.
    ///
    /// Horizontal drags across the full viewport height turn the camera one
    /// full orbit, scaled by `rotate_speed`.
    pub fn handle(&mut self, event: &HostEvent, viewport: ViewportState, rotate_speed: f32) -> PointerAction {
        match *event {
            // Positions that are not numbers would poison every later delta.
            HostEvent::PointerDown { x, y, .. } | HostEvent::PointerMove { x, y }
                if !(x.is_finite() && y.is_finite()) =>
            {
                PointerAction::None
            }
            HostEvent::PointerDown { x, y, button } => {
                self.active = Some((button, x, y));
                PointerAction::Began(button)
            }
            HostEvent::PointerMove { x, y } => {
                let Some((button, last_x, last_y)) = self.active else {
                    return PointerAction::None;
                };
                self.active = Some((button, x, y));
                let (dx, dy) = (x - last_x, y - last_y);
                match button {
                    PointerButton::Primary => {
                        PointerAction::Orbit(orbit_delta(dx, dy, viewport, rotate_speed))
                    }
                    PointerButton::Secondary => PointerAction::Pan { dx, dy },
                }
            }
            HostEvent::PointerUp => {
                if self.active.take().is_some() {
                    PointerAction::Ended
                } else {
                    PointerAction::None
                }
            }
            HostEvent::Wheel { .. } | HostEvent::Resize { .. } => PointerAction::None,
        }
    }
}

/// Pixel delta to orbit delta. Degenerate viewports and non-finite deltas
/// produce no motion.
pub fn orbit_delta(dx: f32, dy: f32, viewport: ViewportState, rotate_speed: f32) -> OrbitDelta {
    if viewport.is_degenerate() || !(dx.is_finite() && dy.is_finite()) {
        return OrbitDelta::default();
    }
    let per_pixel = TAU / viewport.height * rotate_speed;
    OrbitDelta {
        azimuth: -dx * per_pixel,
        polar: -dy * per_pixel,
    }
}
