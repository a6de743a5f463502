//! Orbit camera.
//!
//! The camera sits on a sphere around a fixed look-at point. Users drag to
//! orbit; when configured, the camera also auto-rotates while nobody is
//! dragging. The polar angle is clamped after every change, whatever its
//! source, so the camera can never flip over the configured limits.

use std::f32::consts::{PI, TAU};

use scene_shared::{
    config::{CameraConfig, ConfigError, ControlFlags},
    event::{HostEvent, PointerButton},
    math::{Mat4, Vec3},
    viewport::ViewportState,
};
use tracing::debug;

use crate::input::{OrbitDelta, PointerAction, PointerTracker};

/// Radians per second of auto-rotation at speed 1.0 (one orbit a minute).
pub const AUTO_ROTATE_RATE: f32 = TAU / 60.0;

/// Per-notch dolly factor at zoom speed 1.0.
const ZOOM_STEP: f32 = 0.95;

/// What is currently moving the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMode {
    Idle,
    /// A user drag is in progress; auto-rotation is suspended.
    Dragging,
    AutoRotating,
}

/// Spherical camera state around `target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// Angle around the up axis, in (-π, π]; 0 looks down -Z.
    pub azimuth: f32,
    /// Angle from the up axis.
    pub polar: f32,
    pub radius: f32,
    pub target: Vec3,
    pub flags: ControlFlags,
    pub mode: CameraMode,
}

/// Owns the camera state and applies input to it.
#[derive(Debug, Clone)]
pub struct CameraController {
    config: CameraConfig,
    state: CameraState,
    pointer: PointerTracker,
}

impl CameraController {
    /// Builds the controller, rejecting invalid limits.
    pub fn new(config: &CameraConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let offset = config.position - config.target;
        let radius = offset.len();
        let polar = (offset.y / radius).clamp(-1.0, 1.0).acos();
        let azimuth = offset.x.atan2(offset.z);
        let flags = config.flags();
        let mode = if flags.contains(ControlFlags::AUTO_ROTATE) {
            CameraMode::AutoRotating
        } else {
            CameraMode::Idle
        };

        let mut controller = Self {
            config: *config,
            state: CameraState {
                azimuth,
                polar,
                radius,
                target: config.target,
                flags,
                mode,
            },
            pointer: PointerTracker::default(),
        };
        controller.enforce_limits();
        Ok(controller)
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn mode(&self) -> CameraMode {
        self.state.mode
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Applies one host input event.
    pub fn handle_event(&mut self, event: &HostEvent, viewport: ViewportState) {
        if let HostEvent::Wheel { delta_y } = *event {
            self.zoom(delta_y);
            return;
        }
        if !self.state.flags.contains(ControlFlags::ROTATE) {
            return;
        }
        match self.pointer.handle(event, viewport, self.config.rotate_speed) {
            // A secondary drag only counts when it can pan.
            PointerAction::Began(PointerButton::Secondary) if !self.state.flags.contains(ControlFlags::PAN) => {}
            PointerAction::Began(button) => {
                debug!(?button, previous = ?self.state.mode, "camera drag started");
                self.state.mode = CameraMode::Dragging;
            }
            PointerAction::Orbit(delta) => self.rotate(delta),
            PointerAction::Pan { dx, dy } => self.pan(dx, dy, viewport),
            PointerAction::Ended => {
                self.state.mode = self.resting_mode();
                debug!(mode = ?self.state.mode, "camera drag ended");
            }
            PointerAction::None => {}
        }
    }

    /// Applies an orbit delta and re-clamps. Non-finite deltas are ignored.
    pub fn rotate(&mut self, delta: OrbitDelta) {
        if !(delta.azimuth.is_finite() && delta.polar.is_finite()) {
            return;
        }
        self.state.azimuth += delta.azimuth;
        self.state.polar += delta.polar;
        self.enforce_limits();
    }

    /// Turns auto-rotation on or off. An active drag keeps precedence.
    pub fn set_auto_rotate(&mut self, enabled: bool) {
        self.state.flags.set(ControlFlags::AUTO_ROTATE, enabled);
        if self.state.mode != CameraMode::Dragging {
            self.state.mode = self.resting_mode();
        }
        debug!(enabled, mode = ?self.state.mode, "auto-rotate toggled");
    }

    /// Per-tick update.
    pub fn update(&mut self, dt: f32) {
        if self.state.mode == CameraMode::AutoRotating {
            self.state.azimuth -= AUTO_ROTATE_RATE * self.config.auto_rotate_speed * dt.max(0.0);
        }
        self.enforce_limits();
    }

    /// World-space eye position.
    pub fn eye(&self) -> Vec3 {
        let CameraState {
            azimuth,
            polar,
            radius,
            target,
            ..
        } = self.state;
        let (sp, cp) = polar.sin_cos();
        let (sa, ca) = azimuth.sin_cos();
        target + Vec3::new(sp * sa, cp, sp * ca) * radius
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at(self.eye(), self.state.target, Vec3::Y)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        let proj = Mat4::perspective(
            self.config.fov_deg.to_radians(),
            aspect,
            self.config.near,
            self.config.far,
        );
        proj.mul(&self.view())
    }

    fn resting_mode(&self) -> CameraMode {
        if self.state.flags.contains(ControlFlags::AUTO_ROTATE) {
            CameraMode::AutoRotating
        } else {
            CameraMode::Idle
        }
    }

    fn zoom(&mut self, delta_y: f32) {
        if !self.state.flags.contains(ControlFlags::ZOOM) || delta_y == 0.0 || !delta_y.is_finite() {
            return;
        }
        let step = ZOOM_STEP.powf(self.config.zoom_speed);
        let radius = if delta_y < 0.0 {
            self.state.radius * step
        } else {
            self.state.radius / step
        };
        self.state.radius = radius.clamp(self.config.min_distance, self.config.max_distance);
    }

    fn pan(&mut self, dx: f32, dy: f32, viewport: ViewportState) {
        if !self.state.flags.contains(ControlFlags::PAN) || viewport.is_degenerate() {
            return;
        }
        let half_height = self.state.radius * (self.config.fov_deg.to_radians() * 0.5).tan();
        let per_pixel = 2.0 * half_height / viewport.height;
        let (sp, cp) = self.state.polar.sin_cos();
        let (sa, ca) = self.state.azimuth.sin_cos();
        let right = Vec3::new(ca, 0.0, -sa);
        let up = Vec3::new(-cp * sa, sp, -cp * ca);
        self.state.target = self.state.target - right * (dx * per_pixel) + up * (dy * per_pixel);
    }

    fn enforce_limits(&mut self) {
        self.state.polar = self
            .state
            .polar
            .clamp(self.config.min_polar_angle, self.config.max_polar_angle);
        // Wrap into (-π, π].
        let wrapped = (self.state.azimuth + PI).rem_euclid(TAU) - PI;
        self.state.azimuth = if wrapped == -PI { PI } else { wrapped };
    }
}
