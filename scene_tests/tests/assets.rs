//! Asset loading through the filesystem loader.

mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use common::{init_tracing, run_ticks, RecordingRenderer, TEST_FONT};
use scene_client::FrameScheduler;
use scene_shared::{
    config::SceneConfig,
    resources::{AssetLoader, FontData, FsAssetLoader},
    scene::{AssetRef, Geometry, PrimitiveKind},
};

const MOON_GLTF: &str = r#"{
    "asset": { "version": "2.0" },
    "meshes": [ { "name": "MoonBody" }, { "name": "MoonRim" } ]
}"#;

fn asset_dir(name: &str) -> anyhow::Result<PathBuf> {
    let dir = std::env::temp_dir().join(format!("scene_tests_{}_{name}", std::process::id()));
    std::fs::create_dir_all(dir.join("fonts"))?;
    std::fs::create_dir_all(dir.join("models"))?;
    Ok(dir)
}

/// Ticks until nothing is pending or the budget runs out.
async fn settle(s: &mut FrameScheduler, r: &mut RecordingRenderer) -> u64 {
    let mut tick = 0;
    while tick < 200 && !s.pending_assets().is_empty() {
        tokio::time::sleep(Duration::from_millis(2)).await;
        run_ticks(s, r, tick, 1);
        tick += 1;
    }
    tick
}

#[tokio::test]
async fn loads_font_and_model_from_disk() -> anyhow::Result<()> {
    init_tracing();
    let dir = asset_dir("ok")?;
    std::fs::write(dir.join("fonts/Geist_Bold.json"), TEST_FONT)?;
    std::fs::write(dir.join("models/moon.gltf"), MOON_GLTF)?;

    let mut config = SceneConfig::default();
    config.moon.model = Some("models/moon.gltf".into());
    let mut s = FrameScheduler::new(config)?;
    assert_eq!(s.request_assets(Arc::new(FsAssetLoader::new(&dir))), 2);

    let mut r = RecordingRenderer::default();
    let ticks = settle(&mut s, &mut r).await;
    assert!(s.pending_assets().is_empty(), "still pending after {ticks} ticks");

    let status = s.status();
    assert_eq!(status.failed, 0);
    assert_eq!(s.cache().len(), 2);
    let font: Option<Arc<FontData>> = s.cache().lookup(&AssetRef::Font("fonts/Geist_Bold.json".into()));
    assert_eq!(font.map(|f| f.family_name.clone()).as_deref(), Some("Test Bold"));

    match &s.graph().get(s.moon()).unwrap().geometry {
        Geometry::Mesh { nodes, .. } => {
            let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
            assert_eq!(names, ["MoonBody", "MoonRim"]);
        }
        other => panic!("expected mesh geometry, got {other:?}"),
    }

    run_ticks(&mut s, &mut r, ticks, 1);
    let glyphs = r
        .last()
        .primitives
        .values()
        .filter(|(k, _)| matches!(k, PrimitiveKind::Glyph(_)))
        .count();
    assert_eq!(glyphs, 6);

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[tokio::test]
async fn missing_files_degrade_without_stopping_frames() -> anyhow::Result<()> {
    init_tracing();
    let dir = asset_dir("missing")?;

    let mut config = SceneConfig::default();
    config.moon.model = Some("models/moon.glb".into());
    let mut s = FrameScheduler::new(config)?;
    s.request_assets(Arc::new(FsAssetLoader::new(&dir)));

    let mut r = RecordingRenderer::default();
    let ticks = settle(&mut s, &mut r).await;
    let status = s.status();
    // Six glyphs plus the moon body.
    assert_eq!(status.failed, 7);
    assert_eq!(status.tick, ticks);
    assert_eq!(r.frames.len() as u64, ticks);

    // Lights and the overlay still render.
    run_ticks(&mut s, &mut r, ticks, 1);
    assert_eq!(r.last().lights, 3);
    assert_eq!(r.last().sparkle_opacities.len(), 6);

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[tokio::test]
async fn unsupported_mesh_format_is_an_error() {
    let loader = FsAssetLoader::new(std::env::temp_dir());
    let err = loader.load_mesh("moon.obj").await.unwrap_err();
    assert!(format!("{err:#}").contains("unsupported mesh format"));
}
