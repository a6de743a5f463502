//! Deterministic frame trace.
//!
//! Runs the scheduler at a fixed step with no real clock and prints one JSON
//! object per tick with every drawn primitive's transform. Two traces of the
//! same inputs must be byte-identical.
//!
//! Usage:
//!   frame_trace [--config scene.json] [--ticks 120] [--font fonts/x.json] [--font-tick 30]

use std::sync::Arc;

use anyhow::Context;
use scene_client::{clock::FrameClock, FrameScheduler};
use scene_shared::{
    config::SceneConfig,
    math::{Mat4, Transform, Vec3},
    overlay::OverlayFrame,
    render::{Environment, Light, RenderBackend},
    resources::{AssetEvent, FontData, LoadedAsset},
    scene::{AssetRef, Primitive, PrimitiveId},
};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
struct TraceEntry {
    id: PrimitiveId,
    kind: String,
    transform: Transform,
}

#[derive(Debug, Default, Serialize)]
struct TraceFrame {
    tick: u64,
    eye: Option<Vec3>,
    primitives: Vec<TraceEntry>,
}

#[derive(Default)]
struct TraceRenderer {
    frame: TraceFrame,
    lines: Vec<String>,
}

impl RenderBackend for TraceRenderer {
    fn begin_frame(&mut self, tick: u64) {
        self.frame = TraceFrame {
            tick,
            ..TraceFrame::default()
        };
    }
    fn set_view_proj(&mut self, _view_proj: Mat4) {}
    fn set_camera_eye(&mut self, eye: Vec3) {
        self.frame.eye = Some(eye);
    }
    fn set_environment(&mut self, _environment: Environment) {}
    fn draw_light(&mut self, _light: &Light) {}
    fn draw_primitive(&mut self, id: PrimitiveId, primitive: &Primitive) {
        self.frame.primitives.push(TraceEntry {
            id,
            kind: format!("{:?}", primitive.kind),
            transform: primitive.transform,
        });
    }
    fn draw_overlay(&mut self, _overlay: &OverlayFrame) {}
    fn end_frame(&mut self) {
        let frame = std::mem::take(&mut self.frame);
        match serde_json::to_string(&frame) {
            Ok(line) => self.lines.push(line),
            Err(e) => tracing::error!(error = %e, tick = frame.tick, "failed to encode frame"),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut font_path = None;
    let mut ticks: u64 = 120;
    let mut font_tick: u64 = 0;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                config_path = Some(args[i + 1].clone());
                i += 2;
            }
            "--font" if i + 1 < args.len() => {
                font_path = Some(args[i + 1].clone());
                i += 2;
            }
            "--ticks" if i + 1 < args.len() => {
                ticks = args[i + 1].parse().context("--ticks")?;
                i += 2;
            }
            "--font-tick" if i + 1 < args.len() => {
                font_tick = args[i + 1].parse().context("--font-tick")?;
                i += 2;
            }
            _ => i += 1,
        }
    }

    let config = match &config_path {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("read config {path}"))?;
            SceneConfig::from_json_str(&text).with_context(|| format!("parse config {path}"))?
        }
        None => SceneConfig::default(),
    };
    let font = match &font_path {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("read font {path}"))?;
            Some(Arc::new(FontData::from_json_str(&text)?))
        }
        None => None,
    };
    let font_ref = AssetRef::Font(config.lettering.font.clone());
    let dt = 1.0 / config.tick_hz as f32;

    let mut scheduler = FrameScheduler::new(config).context("invalid scene config")?;
    let mut clock = FrameClock::new();
    let mut renderer = TraceRenderer::default();
    for tick in 0..ticks {
        if tick == font_tick {
            if let Some(font) = &font {
                scheduler.asset_sender().send(AssetEvent {
                    asset: font_ref.clone(),
                    outcome: Ok(LoadedAsset::Font(Arc::clone(font))),
                })?;
            }
        }
        scheduler.tick(clock.advance_by(dt), &mut renderer);
    }

    for line in &renderer.lines {
        println!("{line}");
    }
    info!(ticks, frames = renderer.lines.len(), "trace complete");
    Ok(())
}
