//! Asset loading and resource management.
//!
//! - `AssetLoader` is the collaborator that fetches meshes and fonts.
//! - `FsAssetLoader` reads typeface JSON fonts and glTF (JSON) meshes from a
//!   directory.
//! - `AssetCache` keeps loaded assets behind typed handles, indexed by path,
//!   so each asset is applied to the scene once.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::scene::AssetRef;

/// Opaque scene-graph fragment produced by the mesh loader.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshFragment {
    pub source: String,
    pub node_names: Vec<String>,
}

/// Typeface bounding box in font units.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BoundingBox {
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
}

/// Outline and advance for one glyph.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GlyphData {
    /// Horizontal advance in font units.
    pub ha: f32,
    /// Outline commands (`m`, `l`, `q`, `b`).
    #[serde(default)]
    pub o: String,
}

/// Typeface font (the JSON format emitted by facetype.js).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontData {
    #[serde(default)]
    pub family_name: String,
    pub resolution: f32,
    #[serde(default)]
    pub underline_thickness: f32,
    #[serde(default)]
    pub bounding_box: BoundingBox,
    pub glyphs: HashMap<String, GlyphData>,
}

impl FontData {
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        let font: FontData = serde_json::from_str(s).context("parse typeface json")?;
        if !(font.resolution.is_finite() && font.resolution > 0.0) {
            bail!("typeface resolution must be positive, got {}", font.resolution);
        }
        Ok(font)
    }

    pub fn glyph(&self, ch: char) -> Option<&GlyphData> {
        let mut buf = [0u8; 4];
        let key: &str = ch.encode_utf8(&mut buf);
        self.glyphs.get(key)
    }
}

/// A finished load.
#[derive(Debug, Clone)]
pub enum LoadedAsset {
    Mesh(Arc<MeshFragment>),
    Font(Arc<FontData>),
}

/// Completion notice sent from a load task to the frame scheduler.
#[derive(Debug)]
pub struct AssetEvent {
    pub asset: AssetRef,
    pub outcome: anyhow::Result<LoadedAsset>,
}

/// Asset loader collaborator.
#[async_trait]
pub trait AssetLoader: Send + Sync {
    async fn load_mesh(&self, path: &str) -> anyhow::Result<MeshFragment>;
    async fn load_font(&self, path: &str) -> anyhow::Result<FontData>;

    /// Loads whatever `asset` names.
    async fn load(&self, asset: &AssetRef) -> anyhow::Result<LoadedAsset> {
        match asset {
            AssetRef::Mesh(path) => Ok(LoadedAsset::Mesh(Arc::new(self.load_mesh(path).await?))),
            AssetRef::Font(path) => Ok(LoadedAsset::Font(Arc::new(self.load_font(path).await?))),
        }
    }
}

/// Loads assets relative to a root directory.
#[derive(Debug, Clone)]
pub struct FsAssetLoader {
    root: PathBuf,
}

impl FsAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

/// Mesh names listed in a glTF JSON document.
pub fn gltf_mesh_names(json: &str) -> anyhow::Result<Vec<String>> {
    let doc: serde_json::Value = serde_json::from_str(json).context("parse gltf json")?;
    let meshes = doc
        .get("meshes")
        .and_then(|m| m.as_array())
        .context("gltf document has no meshes")?;
    if meshes.is_empty() {
        bail!("gltf document has an empty meshes array");
    }
    Ok(meshes
        .iter()
        .enumerate()
        .map(|(i, m)| {
            m.get("name")
                .and_then(|n| n.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("mesh_{i}"))
        })
        .collect())
}

#[async_trait]
impl AssetLoader for FsAssetLoader {
    async fn load_mesh(&self, path: &str) -> anyhow::Result<MeshFragment> {
        let full = self.resolve(path);
        let ext = full
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        if !matches!(ext.as_deref(), Some("gltf") | Some("json")) {
            bail!("unsupported mesh format: {}", full.display());
        }
        let text = read_text(&full).await?;
        let node_names = gltf_mesh_names(&text).with_context(|| format!("mesh {}", full.display()))?;
        debug!(path = %full.display(), meshes = node_names.len(), "mesh loaded");
        Ok(MeshFragment {
            source: path.to_string(),
            node_names,
        })
    }

    async fn load_font(&self, path: &str) -> anyhow::Result<FontData> {
        let full = self.resolve(path);
        let text = read_text(&full).await?;
        let font = FontData::from_json_str(&text).with_context(|| format!("font {}", full.display()))?;
        debug!(path = %full.display(), family = %font.family_name, glyphs = font.glyphs.len(), "font loaded");
        Ok(font)
    }
}

async fn read_text(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("read {}", path.display()))
}

/// Typed resource handle.
#[derive(Debug)]
pub struct Handle<T> {
    id: u64,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            _phantom: std::marker::PhantomData,
        }
    }
}

/// In-memory store of loaded assets.
#[derive(Default)]
pub struct AssetCache {
    next_id: u64,
    by_type: HashMap<TypeId, HashMap<u64, Arc<dyn Any + Send + Sync>>>,
    by_path: HashMap<AssetRef, u64>,
}

impl AssetCache {
    /// Stores a loaded asset under its reference and returns a handle.
    pub fn insert<T: 'static + Send + Sync>(&mut self, asset: AssetRef, value: Arc<T>) -> Handle<T> {
        let id = self.next_id;
        self.next_id += 1;
        let map = self.by_type.entry(TypeId::of::<T>()).or_default();
        map.insert(id, value);
        self.by_path.insert(asset, id);
        Handle {
            id,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Gets a resource by handle.
    pub fn get<T: 'static + Send + Sync>(&self, h: &Handle<T>) -> Option<Arc<T>> {
        self.by_type
            .get(&TypeId::of::<T>())
            .and_then(|map| map.get(&h.id))
            .and_then(|arc_any| arc_any.clone().downcast::<T>().ok())
    }

    /// Gets a resource by the reference it was loaded from.
    pub fn lookup<T: 'static + Send + Sync>(&self, asset: &AssetRef) -> Option<Arc<T>> {
        let id = *self.by_path.get(asset)?;
        self.get(&Handle::<T> {
            id,
            _phantom: std::marker::PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}
