//! Scene assembly.
//!
//! Builds the fixed tableau once: lights, environment, the moon and the
//! lettering. Every slot is reserved here; primitives that need a font or a
//! mesh stay pending until the loader reports back, at which point the
//! matching `apply_*` function fills in geometry and material and attaches
//! them.

use std::collections::HashMap;

use scene_shared::{
    config::{AnimationParams, ConfigError, LetteringConfig, MoonStyle, SceneConfig},
    math::{Transform, Vec3},
    render::{Color, MaterialDescriptor},
    resources::{FontData, MeshFragment},
    scene::{AssetRef, Attachment, Geometry, MeshNode, Primitive, PrimitiveId, PrimitiveKind, SceneGraph},
};
use tracing::{debug, info, warn};

use crate::animator::AnimatorRegistry;

/// Outline overlay is drawn slightly larger than the body to avoid z-fighting.
const OUTLINE_SCALE: f32 = 1.002;
/// Occluder radius relative to the moon radius.
const OCCLUDER_SCALE: f32 = 1.01;

/// A reserved glyph slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphSlot {
    pub id: PrimitiveId,
    pub ch: char,
    /// Character index in the lettering text, whitespace included.
    pub index: usize,
}

/// Result of assembly.
#[derive(Debug)]
pub struct AssembledScene {
    pub graph: SceneGraph,
    /// The spinning celestial body.
    pub moon: PrimitiveId,
    pub lettering_group: PrimitiveId,
    pub glyphs: Vec<GlyphSlot>,
    /// Assets to fetch, without duplicates.
    pub requests: Vec<AssetRef>,
}

/// Builds the scene from a validated configuration.
#[derive(Debug)]
pub struct SceneAssembler<'a> {
    config: &'a SceneConfig,
}

impl<'a> SceneAssembler<'a> {
    pub fn new(config: &'a SceneConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Composes the scene and registers an animator for every animated slot.
    pub fn assemble(&self, animators: &mut AnimatorRegistry) -> AssembledScene {
        let mut graph = SceneGraph::new(self.config.environment);
        for light in &self.config.lights {
            graph.add_light(*light);
        }

        let moon = self.build_moon(&mut graph, animators);
        let (lettering_group, glyphs) = self.build_lettering(&mut graph, animators);

        let mut requests: Vec<AssetRef> = Vec::new();
        for (_, p) in graph.iter() {
            if let Attachment::Pending(asset) = &p.attachment {
                if !requests.contains(asset) {
                    requests.push(asset.clone());
                }
            }
        }

        info!(
            primitives = graph.len(),
            lights = graph.lights().len(),
            animators = animators.len(),
            pending_assets = requests.len(),
            style = ?self.config.moon.style,
            "Scene assembled"
        );

        AssembledScene {
            graph,
            moon,
            lettering_group,
            glyphs,
            requests,
        }
    }

    fn unify(&self, material: MaterialDescriptor) -> MaterialDescriptor {
        if self.config.materials.unified {
            material.into_chrome()
        } else {
            material
        }
    }

    fn body_geometry(&self, procedural: Geometry) -> (Geometry, Option<AssetRef>) {
        match &self.config.moon.model {
            Some(path) => (
                Geometry::Mesh {
                    source: path.clone(),
                    nodes: Vec::new(),
                },
                Some(AssetRef::Mesh(path.clone())),
            ),
            None => (procedural, None),
        }
    }

    fn build_moon(&self, graph: &mut SceneGraph, animators: &mut AnimatorRegistry) -> PrimitiveId {
        let moon = &self.config.moon;
        match moon.style {
            MoonStyle::Cratered => {
                let style = &moon.cratered;
                let (geometry, asset) = self.body_geometry(Geometry::Sphere {
                    radius: moon.radius,
                    segments: style.segments,
                });
                let material = self.unify(MaterialDescriptor::standard(
                    style.color,
                    style.roughness,
                    style.metalness,
                ));
                let mut body = Primitive::new(PrimitiveKind::CelestialBody, Transform::at(moon.position), geometry)
                    .with_material(material);
                if let Some(asset) = asset.clone() {
                    body = body.pending_on(asset);
                }
                let body_id = insert_animated(graph, animators, body, moon.animation);

                // A loaded model brings its own surface detail.
                if asset.is_none() {
                    let crater_material =
                        MaterialDescriptor::standard(style.crater_color, style.crater_roughness, 0.0);
                    for crater in &style.craters {
                        graph.insert(
                            Primitive::new(
                                PrimitiveKind::Crater,
                                Transform::at(crater.position),
                                Geometry::Sphere {
                                    radius: crater.radius,
                                    segments: 16,
                                },
                            )
                            .with_parent(body_id)
                            .with_material(crater_material),
                        );
                    }
                }
                body_id
            }
            MoonStyle::Crescent => {
                let style = &moon.crescent;

                // The group floats; the body spins inside it so the bite stays put.
                let group = insert_animated(
                    graph,
                    animators,
                    Primitive::new(PrimitiveKind::Group, Transform::at(moon.position), Geometry::Group),
                    AnimationParams {
                        spin_speed: 0.0,
                        ..moon.animation
                    },
                );

                let (geometry, asset) = self.body_geometry(Geometry::Icosahedron {
                    radius: moon.radius,
                    detail: style.detail,
                });
                let material = self.unify(
                    MaterialDescriptor::standard(style.color, style.roughness, style.metalness)
                        .with_emissive(style.color, style.emissive_intensity),
                );
                let mut body = Primitive::new(PrimitiveKind::CelestialBody, Transform::default(), geometry)
                    .with_parent(group)
                    .with_material(material)
                    .with_shadows();
                if let Some(asset) = asset.clone() {
                    body = body.pending_on(asset);
                }
                let body_id = insert_animated(
                    graph,
                    animators,
                    body,
                    AnimationParams::spin(moon.animation.spin_speed),
                );

                graph.insert(
                    Primitive::new(
                        PrimitiveKind::Outline,
                        Transform::default().with_uniform_scale(OUTLINE_SCALE),
                        Geometry::Edges {
                            threshold_deg: style.edge_threshold,
                        },
                    )
                    .with_parent(body_id)
                    .with_material(MaterialDescriptor::basic(style.edge_color, style.edge_opacity))
                    .with_render_order(2),
                );

                // Sibling of the body so it does not spin, but it waits on the
                // same model: a bite without a moon is not drawn.
                let mut occluder = Primitive::new(
                    PrimitiveKind::Occluder,
                    Transform::at(Vec3::new(style.crescent_offset * moon.radius * 0.5, 0.0, 0.0)),
                    Geometry::Sphere {
                        radius: moon.radius * OCCLUDER_SCALE,
                        segments: 64,
                    },
                )
                .with_parent(group)
                .with_material(MaterialDescriptor::basic(Color::BLACK, 1.0));
                if let Some(asset) = asset {
                    occluder = occluder.pending_on(asset);
                }
                graph.insert(occluder);
                body_id
            }
        }
    }

    fn build_lettering(
        &self,
        graph: &mut SceneGraph,
        animators: &mut AnimatorRegistry,
    ) -> (PrimitiveId, Vec<GlyphSlot>) {
        let cfg = &self.config.lettering;
        let group = graph.insert(Primitive::new(
            PrimitiveKind::Group,
            Transform::at(cfg.position),
            Geometry::Group,
        ));

        let material = self.unify(
            MaterialDescriptor::standard(cfg.color, cfg.roughness, cfg.metalness)
                .with_emissive(cfg.color, cfg.emissive_intensity),
        );
        let font = AssetRef::Font(cfg.font.clone());

        let mut glyphs = Vec::new();
        for (index, ch) in cfg.text.chars().enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            let letter_number = glyphs.len() as f32;
            let params = cfg
                .animation
                .with_phase(cfg.animation.phase_offset + cfg.letter_phase_step * letter_number);
            let primitive = Primitive::new(
                PrimitiveKind::Glyph(ch),
                Transform::default(),
                Geometry::Glyph {
                    ch,
                    outline: String::new(),
                    resolution: 1.0,
                    size: cfg.size,
                    depth: cfg.depth,
                    curve_segments: cfg.curve_segments,
                    bevel: cfg.bevel,
                },
            )
            .with_parent(group)
            .with_material(material)
            .with_shadows()
            .pending_on(font.clone());
            let id = insert_animated(graph, animators, primitive, params);
            glyphs.push(GlyphSlot { id, ch, index });
        }
        (group, glyphs)
    }
}

fn insert_animated(
    graph: &mut SceneGraph,
    animators: &mut AnimatorRegistry,
    primitive: Primitive,
    params: AnimationParams,
) -> PrimitiveId {
    let attached = primitive.is_attached();
    let id = graph.insert(primitive);
    animators.register(id, params);
    if attached {
        animators.mark_attached(id, 0.0);
    }
    id
}

/// Lays out and attaches glyph slots once the font is available.
///
/// Follows typeface layout: advance by `ha × size / resolution`, newlines
/// drop by the font's line height, missing glyphs fall back to `?`. Slots
/// with no usable glyph are marked failed. Returns the newly attached ids.
pub fn apply_font(
    graph: &mut SceneGraph,
    glyphs: &[GlyphSlot],
    lettering: &LetteringConfig,
    font: &FontData,
) -> Vec<PrimitiveId> {
    let scale = lettering.size / font.resolution;
    let bbox = font.bounding_box;
    let line_height = (bbox.y_max - bbox.y_min + font.underline_thickness) * scale;
    let slots: HashMap<usize, &GlyphSlot> = glyphs.iter().map(|g| (g.index, g)).collect();

    let mut attached = Vec::new();
    let (mut offset_x, mut offset_y) = (0.0f32, 0.0f32);
    for (index, ch) in lettering.text.chars().enumerate() {
        if ch == '\n' {
            offset_x = 0.0;
            offset_y -= line_height;
            continue;
        }
        let glyph = font.glyph(ch).or_else(|| font.glyph('?'));
        let slot = slots.get(&index);
        let Some(glyph) = glyph else {
            warn!(%ch, family = %font.family_name, "font has no glyph or fallback");
            if let Some(slot) = slot {
                if let Some(p) = graph.get_mut(slot.id) {
                    p.attachment = Attachment::Failed(AssetRef::Font(lettering.font.clone()));
                }
            }
            continue;
        };

        if let Some(slot) = slot {
            if let Some(p) = graph.get_mut(slot.id) {
                if matches!(p.attachment, Attachment::Pending(_)) {
                    let position = Vec3::new(offset_x, offset_y, 0.0);
                    p.base.position = position;
                    p.transform.position = position;
                    if let Geometry::Glyph {
                        outline, resolution, ..
                    } = &mut p.geometry
                    {
                        *outline = glyph.o.clone();
                        *resolution = font.resolution;
                    }
                    p.attachment = Attachment::Attached;
                    attached.push(slot.id);
                }
            }
        }
        offset_x += glyph.ha * scale;
    }

    debug!(
        family = %font.family_name,
        attached = attached.len(),
        width = offset_x,
        "Lettering laid out"
    );
    attached
}

/// Applies a loaded mesh to its slot: the slot's material descriptor is
/// copied onto every mesh node once, then the slot is attached.
pub fn apply_mesh(graph: &mut SceneGraph, id: PrimitiveId, fragment: &MeshFragment) -> bool {
    let Some(p) = graph.get_mut(id) else {
        return false;
    };
    if !matches!(p.attachment, Attachment::Pending(AssetRef::Mesh(_))) {
        return false;
    }
    // Slots that only wait on the model keep their own geometry.
    if p.kind != PrimitiveKind::CelestialBody {
        p.attachment = Attachment::Attached;
        return true;
    }
    let material = p.material;
    p.geometry = Geometry::Mesh {
        source: fragment.source.clone(),
        nodes: fragment
            .node_names
            .iter()
            .map(|name| MeshNode {
                name: name.clone(),
                material,
            })
            .collect(),
    };
    p.attachment = Attachment::Attached;
    true
}

/// Ids of slots still waiting on `asset`.
pub fn pending_on(graph: &SceneGraph, asset: &AssetRef) -> Vec<PrimitiveId> {
    graph
        .iter()
        .filter(|(_, p)| matches!(&p.attachment, Attachment::Pending(a) if a == asset))
        .map(|(id, _)| id)
        .collect()
}

/// Marks every slot waiting on `asset` as failed. Returns how many.
pub fn mark_failed(graph: &mut SceneGraph, asset: &AssetRef) -> usize {
    let ids = pending_on(graph, asset);
    for id in &ids {
        if let Some(p) = graph.get_mut(*id) {
            p.attachment = Attachment::Failed(asset.clone());
        }
    }
    ids.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_shared::config::MaterialsConfig;

    const FONT: &str = r#"{
        "familyName": "Test Sans",
        "resolution": 1000,
        "underlineThickness": 50,
        "boundingBox": { "xMin": 0, "xMax": 800, "yMin": -200, "yMax": 950 },
        "glyphs": {
            "A": { "ha": 700, "o": "m 0 0 l 350 700 l 700 0" },
            "B": { "ha": 650, "o": "m 0 0 l 0 700" },
            "?": { "ha": 500, "o": "m 0 0" },
            " ": { "ha": 250 }
        }
    }"#;

    fn assemble(config: &SceneConfig) -> (AssembledScene, AnimatorRegistry) {
        let mut animators = AnimatorRegistry::default();
        let scene = SceneAssembler::new(config).unwrap().assemble(&mut animators);
        (scene, animators)
    }

    #[test]
    fn default_scene_composition() {
        let (scene, animators) = assemble(&SceneConfig::default());
        let g = &scene.graph;
        assert_eq!(g.lights().len(), 3);
        // body + 3 craters + group + 6 glyphs
        assert_eq!(g.len(), 11);
        assert_eq!(g.children(scene.moon).count(), 3);
        assert_eq!(scene.glyphs.len(), 6);
        assert_eq!(animators.len(), 7);
        assert_eq!(
            scene.requests,
            vec![AssetRef::Font("fonts/Geist_Bold.json".into())]
        );
        // Only the moon and its craters are live before the font arrives.
        assert_eq!(g.attached().count(), 5);
    }

    #[test]
    fn invalid_config_is_rejected_before_assembly() {
        let mut config = SceneConfig::default();
        config.layout.max_scale = 0.1;
        assert!(SceneAssembler::new(&config).is_err());
    }

    #[test]
    fn crescent_variant_has_outline_and_occluder() {
        let mut config = SceneConfig::default();
        config.moon.style = MoonStyle::Crescent;
        let (scene, _) = assemble(&config);
        let g = &scene.graph;
        let body = g.get(scene.moon).unwrap();
        assert!(matches!(body.geometry, Geometry::Icosahedron { detail: 2, .. }));
        let group = body.parent.unwrap();
        assert_eq!(g.get(group).unwrap().base.position, config.moon.position);

        let outline = g.children(scene.moon).next().unwrap().1;
        assert_eq!(outline.kind, PrimitiveKind::Outline);
        assert_eq!(outline.render_order, 2);
        assert!((outline.material.opacity - 0.85).abs() < 1e-6);

        let occluder = g
            .children(group)
            .find(|(_, p)| p.kind == PrimitiveKind::Occluder)
            .unwrap()
            .1;
        assert!((occluder.base.position.x - 0.75).abs() < 1e-6);
        assert!(matches!(occluder.geometry, Geometry::Sphere { radius, .. } if (radius - 2.02).abs() < 1e-6));
    }

    #[test]
    fn unified_materials_share_the_chrome_family() {
        let mut config = SceneConfig::default();
        config.materials = MaterialsConfig { unified: true };
        let (scene, _) = assemble(&config);
        let moon = scene.graph.get(scene.moon).unwrap().material;
        let glyph = scene.graph.get(scene.glyphs[0].id).unwrap().material;
        assert_eq!(moon.metalness, glyph.metalness);
        assert_eq!(moon.roughness, glyph.roughness);
        assert_ne!(moon.color, glyph.color);

        let (plain, _) = assemble(&SceneConfig::default());
        assert_eq!(plain.graph.get(plain.moon).unwrap().material.metalness, 0.1);
    }

    #[test]
    fn glyph_phases_are_staggered() {
        let (scene, animators) = assemble(&SceneConfig::default());
        let first = animators.get(scene.glyphs[0].id).unwrap().params().phase_offset;
        let second = animators.get(scene.glyphs[1].id).unwrap().params().phase_offset;
        assert!((second - first - 0.35).abs() < 1e-6);
    }

    #[test]
    fn font_layout_advances_and_falls_back() {
        let mut config = SceneConfig::default();
        config.lettering.text = "AB ZA".into();
        let (mut scene, _) = assemble(&config);
        assert_eq!(scene.glyphs.len(), 4);

        let font = FontData::from_json_str(FONT).unwrap();
        let attached = apply_font(&mut scene.graph, &scene.glyphs, &config.lettering, &font);
        assert_eq!(attached.len(), 4);

        let x = |i: usize| scene.graph.get(scene.glyphs[i].id).unwrap().base.position.x;
        let unit = 0.8 / 1000.0;
        assert_eq!(x(0), 0.0);
        assert!((x(1) - 700.0 * unit).abs() < 1e-6);
        // "Z" is missing and drawn with the "?" glyph.
        assert!((x(2) - (700.0 + 650.0 + 250.0) * unit).abs() < 1e-6);
        assert!((x(3) - (700.0 + 650.0 + 250.0 + 500.0) * unit).abs() < 1e-6);

        // Applying again is a no-op.
        assert!(apply_font(&mut scene.graph, &scene.glyphs, &config.lettering, &font).is_empty());
    }

    #[test]
    fn newline_starts_a_lower_line() {
        let mut config = SceneConfig::default();
        config.lettering.text = "A\nB".into();
        let (mut scene, _) = assemble(&config);
        let font = FontData::from_json_str(FONT).unwrap();
        apply_font(&mut scene.graph, &scene.glyphs, &config.lettering, &font);
        let b = scene.graph.get(scene.glyphs[1].id).unwrap().base.position;
        assert_eq!(b.x, 0.0);
        assert!((b.y + (950.0 + 200.0 + 50.0) * 0.8 / 1000.0).abs() < 1e-6);
    }

    #[test]
    fn model_body_waits_for_mesh_and_gets_its_material() {
        let mut config = SceneConfig::default();
        config.moon.model = Some("models/moon.gltf".into());
        let (mut scene, _) = assemble(&config);
        let asset = AssetRef::Mesh("models/moon.gltf".into());
        assert!(scene.requests.contains(&asset));
        assert_eq!(pending_on(&scene.graph, &asset), vec![scene.moon]);

        let fragment = MeshFragment {
            source: "models/moon.gltf".into(),
            node_names: vec!["Moon".into(), "Rim".into()],
        };
        assert!(apply_mesh(&mut scene.graph, scene.moon, &fragment));
        let body = scene.graph.get(scene.moon).unwrap();
        assert!(body.is_attached());
        match &body.geometry {
            Geometry::Mesh { nodes, .. } => {
                assert_eq!(nodes.len(), 2);
                assert!(nodes.iter().all(|n| n.material == body.material));
            }
            other => panic!("expected mesh, got {other:?}"),
        }
        assert!(!apply_mesh(&mut scene.graph, scene.moon, &fragment));
    }

    #[test]
    fn crescent_occluder_follows_the_model_body() {
        let mut config = SceneConfig::default();
        config.moon.style = MoonStyle::Crescent;
        config.moon.model = Some("models/moon.gltf".into());
        let asset = AssetRef::Mesh("models/moon.gltf".into());

        let (mut scene, _) = assemble(&config);
        let occluder = scene
            .graph
            .iter()
            .find(|(_, p)| p.kind == PrimitiveKind::Occluder)
            .map(|(id, _)| id)
            .unwrap();
        assert!(!scene.graph.is_visible(occluder));
        assert_eq!(pending_on(&scene.graph, &asset).len(), 2);

        let fragment = MeshFragment {
            source: "models/moon.gltf".into(),
            node_names: vec!["Moon".into()],
        };
        for id in pending_on(&scene.graph, &asset) {
            assert!(apply_mesh(&mut scene.graph, id, &fragment));
        }
        assert!(scene.graph.is_visible(occluder));
        assert!(matches!(
            scene.graph.get(occluder).unwrap().geometry,
            Geometry::Sphere { .. }
        ));
        assert!(matches!(
            scene.graph.get(scene.moon).unwrap().geometry,
            Geometry::Mesh { .. }
        ));

        let (mut failed, _) = assemble(&config);
        assert_eq!(mark_failed(&mut failed.graph, &asset), 2);
        assert!(failed
            .graph
            .iter()
            .filter(|(_, p)| p.kind == PrimitiveKind::Occluder)
            .all(|(id, _)| !failed.graph.is_visible(id)));
    }

    #[test]
    fn failed_font_marks_every_glyph() {
        let (mut scene, _) = assemble(&SceneConfig::default());
        let asset = AssetRef::Font("fonts/Geist_Bold.json".into());
        assert_eq!(mark_failed(&mut scene.graph, &asset), 6);
        assert!(pending_on(&scene.graph, &asset).is_empty());
        assert_eq!(scene.graph.attached().count(), 5);
    }
}
