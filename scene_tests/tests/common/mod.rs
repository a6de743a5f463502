//! Shared helpers for scenario tests.

#![allow(dead_code)]

use std::collections::BTreeMap;

use scene_client::{clock::FrameTime, FrameScheduler};
use scene_shared::{
    math::{Mat4, Transform, Vec3},
    overlay::OverlayFrame,
    render::{Environment, Light, RenderBackend},
    scene::{Primitive, PrimitiveId, PrimitiveKind},
};

pub const DT: f32 = 1.0 / 60.0;

/// Everything handed to the renderer during one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordedFrame {
    pub tick: u64,
    pub eye: Vec3,
    pub lights: usize,
    pub environment: Option<Environment>,
    pub primitives: BTreeMap<PrimitiveId, (PrimitiveKind, Transform)>,
    pub sparkle_opacities: Vec<f32>,
    pub title_size: f32,
}

/// Renderer that keeps every frame it is given.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub frames: Vec<RecordedFrame>,
    current: RecordedFrame,
}

impl RecordingRenderer {
    pub fn last(&self) -> &RecordedFrame {
        self.frames.last().expect("no frame recorded")
    }
}

impl RenderBackend for RecordingRenderer {
    fn begin_frame(&mut self, tick: u64) {
        self.current = RecordedFrame {
            tick,
            ..RecordedFrame::default()
        };
    }

    fn set_view_proj(&mut self, _view_proj: Mat4) {}

    fn set_camera_eye(&mut self, eye: Vec3) {
        self.current.eye = eye;
    }

    fn set_environment(&mut self, environment: Environment) {
        self.current.environment = Some(environment);
    }

    fn draw_light(&mut self, _light: &Light) {
        self.current.lights += 1;
    }

    fn draw_primitive(&mut self, id: PrimitiveId, primitive: &Primitive) {
        self.current
            .primitives
            .insert(id, (primitive.kind, primitive.transform));
    }

    fn draw_overlay(&mut self, overlay: &OverlayFrame) {
        self.current.sparkle_opacities = overlay.sparkles.iter().map(|s| s.opacity).collect();
        self.current.title_size = overlay.title_size;
    }

    fn end_frame(&mut self) {
        self.frames.push(std::mem::take(&mut self.current));
    }
}

/// Runs `ticks` fixed-step frames, continuing from `start_tick`.
pub fn run_ticks(scheduler: &mut FrameScheduler, renderer: &mut RecordingRenderer, start_tick: u64, ticks: u64) {
    for i in start_tick..start_tick + ticks {
        scheduler.tick(
            FrameTime {
                elapsed: (i + 1) as f32 * DT,
                delta: DT,
            },
            renderer,
        );
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

pub const TEST_FONT: &str = r#"{
    "familyName": "Test Bold",
    "resolution": 1000,
    "underlineThickness": 50,
    "boundingBox": { "xMin": 0, "xMax": 900, "yMin": -250, "yMax": 950 },
    "glyphs": {
        "A": { "ha": 720, "o": "m 0 0 l 360 720 l 720 0" },
        "N": { "ha": 740, "o": "m 0 0 l 0 720 l 740 0 l 740 720" },
        "D": { "ha": 700, "o": "m 0 0 l 0 720 q 700 720 700 360" },
        "R": { "ha": 690, "o": "m 0 0 l 0 720" },
        "E": { "ha": 620, "o": "m 620 0 l 0 0 l 0 720 l 620 720" },
        "W": { "ha": 980, "o": "m 0 720 l 245 0 l 490 720 l 735 0 l 980 720" },
        "?": { "ha": 560, "o": "m 0 0" }
    }
}"#;
