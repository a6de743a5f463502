//! Scene graph.
//!
//! A fixed arena of primitives keyed by `PrimitiveId`, plus lights and the
//! environment reference. Slots are reserved when the scene is assembled and
//! never added or removed afterwards; primitives that depend on an asset stay
//! detached (invisible to the renderer) until the asset arrives.
//!
//! Iteration order is insertion order, so renderers and traces see a stable
//! ordering from tick to tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    math::Transform,
    render::{Environment, Light, MaterialDescriptor},
};

/// Opaque primitive id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PrimitiveId(pub u64);

/// What a primitive represents in the tableau.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    /// The moon body itself.
    CelestialBody,
    /// Surface detail parented to a celestial body.
    Crater,
    /// Dark sphere that bites the crescent out of the moon.
    Occluder,
    /// Edge overlay drawn on top of a low-poly body.
    Outline,
    /// One letter of the lettering.
    Glyph(char),
    /// Transform-only node.
    Group,
}

/// Bevel settings for extruded glyphs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bevel {
    pub thickness: f32,
    pub size: f32,
    pub offset: f32,
    pub segments: u32,
}

/// Geometry reference handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Geometry {
    Sphere {
        radius: f32,
        segments: u32,
    },
    Icosahedron {
        radius: f32,
        detail: u32,
    },
    /// Edges of the parent's geometry whose face angle exceeds the threshold.
    Edges {
        threshold_deg: f32,
    },
    /// Mesh loaded from `source`; `nodes` is filled in on load.
    Mesh {
        source: String,
        nodes: Vec<MeshNode>,
    },
    /// Extruded glyph; `outline` is in font units, scaled by `size / resolution`.
    Glyph {
        ch: char,
        outline: String,
        resolution: f32,
        size: f32,
        depth: f32,
        curve_segments: u32,
        bevel: Option<Bevel>,
    },
    Group,
}

/// One node of a loaded mesh fragment after its material was applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshNode {
    pub name: String,
    pub material: MaterialDescriptor,
}

/// Asset a pending primitive waits on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "path", rename_all = "snake_case")]
pub enum AssetRef {
    Mesh(String),
    Font(String),
}

impl AssetRef {
    pub fn path(&self) -> &str {
        match self {
            AssetRef::Mesh(p) | AssetRef::Font(p) => p,
        }
    }
}

/// Whether the primitive is part of the live scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attachment {
    Attached,
    Pending(AssetRef),
    Failed(AssetRef),
}

/// One renderable node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    pub parent: Option<PrimitiveId>,
    /// Transform at assembly time; animators offset from it.
    pub base: Transform,
    /// Live transform, owned by the animator (and the layout for groups).
    pub transform: Transform,
    pub material: MaterialDescriptor,
    pub geometry: Geometry,
    pub attachment: Attachment,
    /// Whether the renderer should make this primitive cast/receive shadows.
    pub shadows: bool,
    /// Draw order hint; higher draws later.
    pub render_order: i32,
}

impl Primitive {
    pub fn new(kind: PrimitiveKind, base: Transform, geometry: Geometry) -> Self {
        Self {
            kind,
            parent: None,
            base,
            transform: base,
            material: MaterialDescriptor::default(),
            geometry,
            attachment: Attachment::Attached,
            shadows: false,
            render_order: 0,
        }
    }

    pub fn with_parent(mut self, parent: PrimitiveId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_material(mut self, material: MaterialDescriptor) -> Self {
        self.material = material;
        self
    }

    pub fn pending_on(mut self, asset: AssetRef) -> Self {
        self.attachment = Attachment::Pending(asset);
        self
    }

    pub fn with_shadows(mut self) -> Self {
        self.shadows = true;
        self
    }

    pub fn with_render_order(mut self, order: i32) -> Self {
        self.render_order = order;
        self
    }

    pub fn is_attached(&self) -> bool {
        self.attachment == Attachment::Attached
    }
}

/// The composed scene: primitives, lights and environment.
#[derive(Debug, Default, Clone)]
pub struct SceneGraph {
    next_id: u64,
    primitives: BTreeMap<PrimitiveId, Primitive>,
    lights: Vec<Light>,
    environment: Environment,
}

impl SceneGraph {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            ..Self::default()
        }
    }

    /// Reserves a slot for a primitive and returns its id.
    pub fn insert(&mut self, primitive: Primitive) -> PrimitiveId {
        let id = PrimitiveId(self.next_id);
        self.next_id += 1;
        self.primitives.insert(id, primitive);
        id
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn get(&self, id: PrimitiveId) -> Option<&Primitive> {
        self.primitives.get(&id)
    }

    pub fn get_mut(&mut self, id: PrimitiveId) -> Option<&mut Primitive> {
        self.primitives.get_mut(&id)
    }

    /// Mutable access to an attached primitive; `None` while pending or failed.
    pub fn live_mut(&mut self, id: PrimitiveId) -> Option<&mut Primitive> {
        self.primitives.get_mut(&id).filter(|p| p.is_attached())
    }

    /// Returns true if the primitive and all of its ancestors are attached.
    pub fn is_visible(&self, id: PrimitiveId) -> bool {
        let mut cursor = Some(id);
        while let Some(cur) = cursor {
            match self.primitives.get(&cur) {
                Some(p) if p.is_attached() => cursor = p.parent,
                _ => return false,
            }
        }
        true
    }

    /// Iterates every slot, attached or not.
    pub fn iter(&self) -> impl Iterator<Item = (PrimitiveId, &Primitive)> {
        self.primitives.iter().map(|(k, v)| (*k, v))
    }

    /// Iterates the primitives the renderer should draw.
    pub fn attached(&self) -> impl Iterator<Item = (PrimitiveId, &Primitive)> {
        self.iter().filter(move |(id, _)| self.is_visible(*id))
    }

    /// Children of `parent`, in insertion order.
    pub fn children(&self, parent: PrimitiveId) -> impl Iterator<Item = (PrimitiveId, &Primitive)> {
        self.iter().filter(move |(_, p)| p.parent == Some(parent))
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }
}
