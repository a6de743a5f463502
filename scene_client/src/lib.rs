//! `scene_client`
//!
//! Scene-side systems:
//! - Scene assembly (moon, lettering, lights) and late asset attachment
//! - Per-primitive animation (spin, float, wobble)
//! - Responsive scaling of the lettering
//! - Orbit camera with polar limits and auto-rotation
//! - Frame scheduling and the pausable frame clock

pub mod animator;
pub mod assembler;
pub mod camera;
pub mod clock;
pub mod console;
pub mod input;
pub mod layout;
pub mod scheduler;

pub use scheduler::FrameScheduler;
