//! Headless greeting-card binary.
//!
//! Usage:
//!   cargo run -p scene_client --bin greeting -- [--config scene.json] [--assets assets]
//!       [--ticks 600] [--fps 60]
//!
//! Runs the scene at a fixed frame rate against a logging renderer, loading
//! the font and any moon model from the assets directory in the background.
//!
//! Console commands:
//!   drag <dx> <dy>       - Drag from the viewport center
//!   resize <w> <h>       - Resize the viewport
//!   zoom <delta>         - Wheel input (ignored unless zoom is enabled)
//!   autorotate on|off    - Toggle camera auto-rotation
//!   pause / resume       - Freeze or continue the scene clock
//!   status               - Show scheduler status
//!   quit                 - Exit

use std::env;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use scene_client::{clock::FrameClock, console::ConsoleCommand, FrameScheduler};
use scene_shared::{
    config::SceneConfig,
    math::{Mat4, Vec3},
    overlay::OverlayFrame,
    render::{Environment, Light, RenderBackend},
    resources::FsAssetLoader,
    scene::{Primitive, PrimitiveId},
};
use tokio::sync::mpsc;
use tracing::{info, trace, warn};

struct Args {
    config: Option<String>,
    assets: String,
    ticks: Option<u64>,
    fps: Option<u32>,
}

fn parse_args() -> Args {
    let mut out = Args {
        config: None,
        assets: "assets".to_string(),
        ticks: None,
        fps: None,
    };
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                out.config = Some(args[i + 1].clone());
                i += 2;
            }
            "--assets" if i + 1 < args.len() => {
                out.assets = args[i + 1].clone();
                i += 2;
            }
            "--ticks" if i + 1 < args.len() => {
                out.ticks = args[i + 1].parse().ok();
                i += 2;
            }
            "--fps" if i + 1 < args.len() => {
                out.fps = args[i + 1].parse().ok();
                i += 2;
            }
            _ => i += 1,
        }
    }
    out
}

fn load_config(args: &Args) -> anyhow::Result<SceneConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("read config {path}"))?;
            SceneConfig::from_json_str(&text).with_context(|| format!("parse config {path}"))?
        }
        None => SceneConfig::default(),
    };
    if let Some(fps) = args.fps {
        cfg.tick_hz = fps;
    }
    Ok(cfg)
}

/// Counts what each frame would draw and traces it.
#[derive(Default)]
struct LogRenderer {
    primitives: usize,
    lights: usize,
    sparkles: usize,
}

impl RenderBackend for LogRenderer {
    fn begin_frame(&mut self, _tick: u64) {
        self.primitives = 0;
        self.lights = 0;
        self.sparkles = 0;
    }

    fn set_view_proj(&mut self, _view_proj: Mat4) {}

    fn set_camera_eye(&mut self, eye: Vec3) {
        trace!(x = eye.x, y = eye.y, z = eye.z, "camera eye");
    }

    fn set_environment(&mut self, _environment: Environment) {}

    fn draw_light(&mut self, _light: &Light) {
        self.lights += 1;
    }

    fn draw_primitive(&mut self, id: PrimitiveId, primitive: &Primitive) {
        trace!(?id, kind = ?primitive.kind, position = ?primitive.transform.position, "draw");
        self.primitives += 1;
    }

    fn draw_overlay(&mut self, overlay: &OverlayFrame) {
        self.sparkles = overlay.sparkles.len();
    }

    fn end_frame(&mut self) {
        trace!(
            primitives = self.primitives,
            lights = self.lights,
            sparkles = self.sparkles,
            "frame done"
        );
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = parse_args();
    let cfg = load_config(&args)?;
    let tick_hz = cfg.tick_hz;
    info!(
        config = args.config.as_deref().unwrap_or("<default>"),
        assets = %args.assets,
        tick_hz,
        "Starting greeting"
    );

    let mut scheduler = FrameScheduler::new(cfg).context("invalid scene config")?;
    let requested = scheduler.request_assets(Arc::new(FsAssetLoader::new(&args.assets)));
    info!(requested, "Asset loads started");

    // Set up console input channel.
    let (console_tx, mut console_rx) = mpsc::channel::<String>(32);

    // Spawn stdin reader thread.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    let mut clock = FrameClock::new();
    let mut renderer = LogRenderer::default();
    let tick_interval = Duration::from_secs_f64(1.0 / f64::from(tick_hz));
    let mut next = Instant::now();

    'frames: loop {
        while let Ok(line) = console_rx.try_recv() {
            let cmd = match ConsoleCommand::parse(&line) {
                Ok(Some(cmd)) => cmd,
                Ok(None) => continue,
                Err(e) => {
                    println!("Error: {e:#}");
                    continue;
                }
            };
            match cmd {
                ConsoleCommand::AutoRotate(enabled) => scheduler.set_auto_rotate(enabled),
                ConsoleCommand::Pause => clock.pause(),
                ConsoleCommand::Resume => clock.resume(),
                ConsoleCommand::Status => {
                    for line in scheduler.status().lines() {
                        println!("{line}");
                    }
                    println!("Clock: {}", if clock.is_paused() { "paused" } else { "running" });
                }
                ConsoleCommand::Quit => break 'frames,
                other => {
                    for event in other.host_events(scheduler.viewport()) {
                        scheduler.push_event(event);
                    }
                }
            }
        }

        let frame = clock.advance(Instant::now());
        scheduler.tick(frame, &mut renderer);

        let ticks = scheduler.tick_count();
        if ticks % u64::from(tick_hz) == 0 {
            let status = scheduler.status();
            info!(
                tick = status.tick,
                elapsed = status.elapsed,
                attached = status.attached,
                pending = status.pending,
                failed = status.failed,
                scale = status.scale,
                azimuth = status.azimuth,
                "Status"
            );
            if status.failed > 0 {
                warn!(failed = status.failed, "Some primitives are not drawn");
            }
        }
        if args.ticks.is_some_and(|limit| ticks >= limit) {
            break;
        }

        next += tick_interval;
        let now = Instant::now();
        if next < now {
            next = now;
        }
        tokio::time::sleep_until(tokio::time::Instant::from_std(next)).await;
    }

    info!(ticks = scheduler.tick_count(), "Exiting");
    Ok(())
}
