//! Viewport state reported by the host canvas.

use serde::{Deserialize, Serialize};

/// Current drawable size in CSS pixels.
///
/// Hosts may briefly report zero or negative sizes during layout
/// transitions; consumers must not divide by these values unchecked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportState {
    pub width: f32,
    pub height: f32,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

impl ViewportState {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Width over height, or 1.0 while either side is degenerate.
    pub fn aspect_ratio(&self) -> f32 {
        if self.is_degenerate() {
            1.0
        } else {
            self.width / self.height
        }
    }

    /// True when a side is zero, negative or not a number.
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0)
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.width = width;
        self.height = height;
    }
}
