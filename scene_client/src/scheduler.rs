//! Frame scheduler.
//!
//! Owns everything the scene needs between frames and drives one tick at a
//! time. Asset completions and host events queue up between ticks and are
//! applied at the start of the next one, so a tick always sees a consistent
//! scene. Tick work itself cannot fail.

use std::sync::Arc;

use scene_shared::{
    config::{ConfigError, SceneConfig},
    event::{EventQueue, HostEvent},
    render::RenderBackend,
    resources::{AssetCache, AssetEvent, AssetLoader, LoadedAsset},
    scene::{AssetRef, Attachment, PrimitiveId, SceneGraph},
    viewport::ViewportState,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    animator::AnimatorRegistry,
    assembler::{apply_font, apply_mesh, mark_failed, pending_on, GlyphSlot, SceneAssembler},
    camera::{CameraController, CameraMode},
    clock::FrameTime,
    layout::{apply_group_scale, responsive_scale},
};

/// Snapshot for the `status` console command and periodic logs.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerStatus {
    pub tick: u64,
    pub elapsed: f32,
    pub scale: f32,
    pub viewport: ViewportState,
    pub attached: usize,
    pub pending: usize,
    pub failed: usize,
    pub camera_mode: CameraMode,
    pub azimuth: f32,
    pub polar: f32,
}

impl SchedulerStatus {
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("Tick: {} ({:.2}s)", self.tick, self.elapsed),
            format!("Viewport: {}x{}", self.viewport.width, self.viewport.height),
            format!("Lettering scale: {:.3}", self.scale),
            format!(
                "Primitives: {} attached, {} pending, {} failed",
                self.attached, self.pending, self.failed
            ),
            format!(
                "Camera: {:?} azimuth={:.3} polar={:.3}",
                self.camera_mode, self.azimuth, self.polar
            ),
        ]
    }
}

/// Drives the scene tick by tick.
pub struct FrameScheduler {
    config: SceneConfig,
    graph: SceneGraph,
    animators: AnimatorRegistry,
    camera: CameraController,
    viewport: ViewportState,
    moon: PrimitiveId,
    lettering_group: PrimitiveId,
    glyphs: Vec<GlyphSlot>,
    requests: Vec<AssetRef>,
    events: EventQueue<HostEvent>,
    asset_tx: mpsc::UnboundedSender<AssetEvent>,
    asset_rx: mpsc::UnboundedReceiver<AssetEvent>,
    cache: AssetCache,
    tick: u64,
    elapsed: f32,
    scale: f32,
}

impl FrameScheduler {
    /// Validates the configuration and assembles the scene.
    pub fn new(config: SceneConfig) -> Result<Self, ConfigError> {
        let mut animators = AnimatorRegistry::default();
        let scene = SceneAssembler::new(&config)?.assemble(&mut animators);
        let camera = CameraController::new(&config.camera)?;
        let viewport = config.viewport;
        let scale = responsive_scale(viewport, &config.layout);

        let mut graph = scene.graph;
        apply_group_scale(&mut graph, scene.lettering_group, scale);

        let (asset_tx, asset_rx) = mpsc::unbounded_channel();
        Ok(Self {
            config,
            graph,
            animators,
            camera,
            viewport,
            moon: scene.moon,
            lettering_group: scene.lettering_group,
            glyphs: scene.glyphs,
            requests: scene.requests,
            events: EventQueue::default(),
            asset_tx,
            asset_rx,
            cache: AssetCache::default(),
            tick: 0,
            elapsed: 0.0,
            scale,
        })
    }

    /// Sender for asset completions. Load tasks report through clones of it.
    pub fn asset_sender(&self) -> mpsc::UnboundedSender<AssetEvent> {
        self.asset_tx.clone()
    }

    /// Assets the scene still waits on.
    pub fn pending_assets(&self) -> Vec<AssetRef> {
        let mut out: Vec<AssetRef> = Vec::new();
        for (_, p) in self.graph.iter() {
            if let Attachment::Pending(asset) = &p.attachment {
                if !out.contains(asset) {
                    out.push(asset.clone());
                }
            }
        }
        out
    }

    /// Starts one load task per outstanding request. Must be called inside a
    /// tokio runtime. Returns how many tasks were spawned.
    pub fn request_assets(&mut self, loader: Arc<dyn AssetLoader>) -> usize {
        let requests = std::mem::take(&mut self.requests);
        for asset in &requests {
            let loader = Arc::clone(&loader);
            let tx = self.asset_tx.clone();
            let asset = asset.clone();
            debug!(path = asset.path(), "requesting asset");
            tokio::spawn(async move {
                let outcome = loader.load(&asset).await;
                // The scheduler may already be gone on shutdown.
                let _ = tx.send(AssetEvent { asset, outcome });
            });
        }
        requests.len()
    }

    /// Queues a host event for the next tick.
    pub fn push_event(&mut self, event: HostEvent) {
        self.events.push(event);
    }

    pub fn set_auto_rotate(&mut self, enabled: bool) {
        self.camera.set_auto_rotate(enabled);
    }

    /// Runs one frame and hands the result to `renderer`.
    pub fn tick(&mut self, frame: FrameTime, renderer: &mut dyn RenderBackend) {
        self.elapsed = frame.elapsed;

        while let Ok(event) = self.asset_rx.try_recv() {
            self.apply_asset(event);
        }
        for event in self.events.drain() {
            match event {
                HostEvent::Resize { width, height } => {
                    debug!(width, height, "viewport resized");
                    self.viewport.resize(width, height);
                }
                other => self.camera.handle_event(&other, self.viewport),
            }
        }

        self.animators.update_all(&mut self.graph, frame.elapsed, frame.delta);

        self.scale = responsive_scale(self.viewport, &self.config.layout);
        apply_group_scale(&mut self.graph, self.lettering_group, self.scale);

        self.camera.update(frame.delta);

        self.render(renderer);
        self.tick += 1;
    }

    fn apply_asset(&mut self, event: AssetEvent) {
        let AssetEvent { asset, outcome } = event;
        match outcome {
            Ok(LoadedAsset::Font(font)) => {
                self.cache.insert(asset.clone(), Arc::clone(&font));
                let attached = apply_font(&mut self.graph, &self.glyphs, &self.config.lettering, &font);
                for id in &attached {
                    self.animators.mark_attached(*id, self.elapsed);
                }
                info!(
                    path = asset.path(),
                    family = %font.family_name,
                    glyphs = attached.len(),
                    tick = self.tick,
                    "Font attached"
                );
            }
            Ok(LoadedAsset::Mesh(mesh)) => {
                self.cache.insert(asset.clone(), Arc::clone(&mesh));
                let mut attached = 0;
                for id in pending_on(&self.graph, &asset) {
                    if apply_mesh(&mut self.graph, id, &mesh) {
                        self.animators.mark_attached(id, self.elapsed);
                        attached += 1;
                    }
                }
                info!(
                    path = asset.path(),
                    nodes = mesh.node_names.len(),
                    attached,
                    tick = self.tick,
                    "Mesh attached"
                );
            }
            Err(e) => {
                let failed = mark_failed(&mut self.graph, &asset);
                warn!(path = asset.path(), failed, error = %format!("{e:#}"), "Asset failed to load");
            }
        }
    }

    fn render(&self, renderer: &mut dyn RenderBackend) {
        renderer.begin_frame(self.tick);
        renderer.set_environment(self.graph.environment());
        renderer.set_camera_eye(self.camera.eye());
        renderer.set_view_proj(self.camera.view_proj(self.viewport.aspect_ratio()));
        for light in self.graph.lights() {
            renderer.draw_light(light);
        }
        for (id, primitive) in self.graph.attached() {
            if self.graph.is_visible(id) {
                renderer.draw_primitive(id, primitive);
            }
        }
        renderer.draw_overlay(&self.config.overlay.frame(self.viewport, self.elapsed));
        renderer.end_frame();
    }

    pub fn status(&self) -> SchedulerStatus {
        let (mut attached, mut pending, mut failed) = (0, 0, 0);
        for (_, p) in self.graph.iter() {
            match p.attachment {
                Attachment::Attached => attached += 1,
                Attachment::Pending(_) => pending += 1,
                Attachment::Failed(_) => failed += 1,
            }
        }
        let camera = self.camera.state();
        SchedulerStatus {
            tick: self.tick,
            elapsed: self.elapsed,
            scale: self.scale,
            viewport: self.viewport,
            attached,
            pending,
            failed,
            camera_mode: camera.mode,
            azimuth: camera.azimuth,
            polar: camera.polar,
        }
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn animators(&self) -> &AnimatorRegistry {
        &self.animators
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn viewport(&self) -> ViewportState {
        self.viewport
    }

    pub fn moon(&self) -> PrimitiveId {
        self.moon
    }

    pub fn lettering_group(&self) -> PrimitiveId {
        self.lettering_group
    }

    pub fn glyphs(&self) -> &[GlyphSlot] {
        &self.glyphs
    }

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}
