//! `scene_shared`
//!
//! Shared libraries for the greeting-card scene.
//!
//! Design goals:
//! - Deterministic and modular where practical.
//! - Clear separation of concerns (math, scene graph, render, resources, events).
//! - Traits for the collaborators the scene does not own (renderer, asset loader).
//! - No `unsafe`.

pub mod config;
pub mod event;
pub mod math;
pub mod overlay;
pub mod render;
pub mod resources;
pub mod scene;
pub mod viewport;
