//! Per-primitive animation.
//!
//! Oscillatory motion (float, wobble) is evaluated from the primitive's own
//! elapsed time, so it is restartable and independent of frame rate. Spin is
//! integrated from frame deltas, so it keeps its direction and speed when
//! the host clock pauses and resumes.

use std::f32::consts::TAU;

use scene_shared::{
    config::AnimationParams,
    math::{Transform, Vec3},
    scene::{PrimitiveId, SceneGraph},
};
use tracing::trace;

/// Frequency ratio of the depth drift relative to the vertical float.
pub const DRIFT_FREQUENCY: f32 = 0.7;
/// Amplitude ratio of the depth drift relative to the vertical float.
pub const DRIFT_AMPLITUDE: f32 = 0.4;

/// Evaluates a primitive's transform at local time `t`.
///
/// `scale` is passed through untouched; it belongs to the layout.
pub fn animate(
    base: &Transform,
    params: &AnimationParams,
    t: f32,
    spin_angle: f32,
    scale: Vec3,
) -> Transform {
    let t = t + params.phase_offset;
    let float = t * params.float_speed;

    let mut out = *base;
    out.position.y = base.position.y + float.sin() * params.float_amplitude;
    out.position.z = base.position.z
        + (float * DRIFT_FREQUENCY).cos() * params.float_amplitude * DRIFT_AMPLITUDE;
    out.rotation.y = base.rotation.y + spin_angle + (t * 0.6).sin() * params.wobble_speed * 0.3;
    out.rotation.x = base.rotation.x + (t * 0.4).cos() * params.wobble_speed * 0.15;
    out.scale = scale;
    out
}

/// Mutable state behind one animator. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnimationState {
    /// Scheduler time at which the target joined the live scene.
    pub started_at: Option<f32>,
    /// Accumulated spin, wrapped into `[0, 2π)`.
    pub spin_angle: f32,
}

/// Drives one primitive.
#[derive(Debug, Clone)]
pub struct ObjectAnimator {
    target: PrimitiveId,
    params: AnimationParams,
    state: AnimationState,
}

impl ObjectAnimator {
    pub fn new(target: PrimitiveId, params: AnimationParams) -> Self {
        Self {
            target,
            params,
            state: AnimationState::default(),
        }
    }

    pub fn target(&self) -> PrimitiveId {
        self.target
    }

    pub fn params(&self) -> &AnimationParams {
        &self.params
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    /// Starts the local clock at `elapsed` if it has not started yet.
    pub fn mark_attached(&mut self, elapsed: f32) {
        if self.state.started_at.is_none() {
            self.state = AnimationState {
                started_at: Some(elapsed),
                spin_angle: 0.0,
            };
        }
    }

    /// Time since the target attached, if it has.
    pub fn local_time(&self, elapsed: f32) -> Option<f32> {
        self.state.started_at.map(|s| (elapsed - s).max(0.0))
    }

    /// Advances by one frame and writes the target's transform.
    ///
    /// Returns false (and changes nothing) while the target is not attached.
    pub fn update(&mut self, graph: &mut SceneGraph, elapsed: f32, dt: f32) -> bool {
        let Some(primitive) = graph.live_mut(self.target) else {
            trace!(primitive = ?self.target, "animator target not attached, skipping");
            return false;
        };
        self.state.started_at.get_or_insert(elapsed);
        let t = self.local_time(elapsed).unwrap_or(0.0);

        // The first frame after attaching contributes no spin: local time is 0.
        let step = dt.max(0.0).min(t);
        self.state.spin_angle = (self.state.spin_angle + step * self.params.spin_speed).rem_euclid(TAU);

        primitive.transform = animate(
            &primitive.base,
            &self.params,
            t,
            self.state.spin_angle,
            primitive.transform.scale,
        );
        true
    }

    /// Evaluates directly at local time `t` from a cold start.
    pub fn sample(&self, base: &Transform, t: f32) -> Transform {
        let spin = (t * self.params.spin_speed).rem_euclid(TAU);
        animate(base, &self.params, t, spin, base.scale)
    }
}

/// The arena of animators, iterated once per tick.
#[derive(Debug, Default)]
pub struct AnimatorRegistry {
    entries: Vec<ObjectAnimator>,
}

impl AnimatorRegistry {
    /// Registers an animator for `target`.
    pub fn register(&mut self, target: PrimitiveId, params: AnimationParams) {
        self.entries.push(ObjectAnimator::new(target, params));
    }

    /// Starts the local clock of every animator driving `target`.
    pub fn mark_attached(&mut self, target: PrimitiveId, elapsed: f32) {
        for entry in self.entries.iter_mut().filter(|e| e.target == target) {
            entry.mark_attached(elapsed);
        }
    }

    /// Runs every animator; returns how many wrote a transform.
    pub fn update_all(&mut self, graph: &mut SceneGraph, elapsed: f32, dt: f32) -> usize {
        self.entries
            .iter_mut()
            .map(|e| e.update(graph, elapsed, dt))
            .filter(|updated| *updated)
            .count()
    }

    pub fn get(&self, target: PrimitiveId) -> Option<&ObjectAnimator> {
        self.entries.iter().find(|e| e.target == target)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Smallest signed difference between two angles.
pub fn angle_delta(a: f32, b: f32) -> f32 {
    let d = (a - b).rem_euclid(TAU);
    if d > TAU / 2.0 {
        d - TAU
    } else {
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_shared::{
        math::Euler,
        scene::{AssetRef, Attachment, Geometry, Primitive, PrimitiveKind},
    };

    fn params() -> AnimationParams {
        AnimationParams {
            spin_speed: 0.2,
            float_amplitude: 0.5,
            float_speed: 1.3,
            wobble_speed: 0.4,
            phase_offset: 0.25,
        }
    }

    fn graph_with_body(pending: bool) -> (SceneGraph, PrimitiveId) {
        let mut graph = SceneGraph::default();
        let mut body = Primitive::new(
            PrimitiveKind::CelestialBody,
            Transform::at(Vec3::new(0.0, 1.0, 0.0)),
            Geometry::Sphere {
                radius: 2.0,
                segments: 64,
            },
        );
        if pending {
            body = body.pending_on(AssetRef::Mesh("moon.gltf".into()));
        }
        let id = graph.insert(body);
        (graph, id)
    }

    #[test]
    fn float_follows_closed_form() {
        let base = Transform::at(Vec3::new(1.0, 2.0, 3.0));
        let p = AnimationParams {
            float_amplitude: 0.5,
            float_speed: 2.0,
            ..AnimationParams::default()
        };
        let out = animate(&base, &p, 0.75, 0.0, Vec3::ONE);
        assert!((out.position.y - (2.0 + (1.5f32).sin() * 0.5)).abs() < 1e-6);
        assert!((out.position.z - (3.0 + (1.05f32).cos() * 0.5 * 0.4)).abs() < 1e-6);
        assert_eq!(out.position.x, 1.0);
    }

    #[test]
    fn wobble_adds_to_base_and_spin() {
        let mut base = Transform::default();
        base.rotation = Euler::new(0.1, 0.5, 0.0);
        let p = AnimationParams {
            wobble_speed: 1.0,
            ..AnimationParams::default()
        };
        let out = animate(&base, &p, 2.0, 0.3, Vec3::ONE);
        assert!((out.rotation.y - (0.5 + 0.3 + (1.2f32).sin() * 0.3)).abs() < 1e-6);
        assert!((out.rotation.x - (0.1 + (0.8f32).cos() * 0.15)).abs() < 1e-6);
    }

    #[test]
    fn scale_is_left_to_the_layout() {
        let base = Transform::default();
        let out = animate(&base, &params(), 1.0, 0.0, Vec3::splat(0.6));
        assert_eq!(out.scale, Vec3::splat(0.6));
    }

    #[test]
    fn same_timestamp_same_transform() {
        let anim = ObjectAnimator::new(PrimitiveId(0), params());
        let base = Transform::at(Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(anim.sample(&base, 3.7), anim.sample(&base, 3.7));
    }

    #[test]
    fn stepping_matches_direct_evaluation() {
        let (mut graph, id) = graph_with_body(false);
        let mut anim = ObjectAnimator::new(id, params());
        anim.mark_attached(0.0);

        let dt = 1.0 / 60.0;
        let mut elapsed = 0.0f32;
        for _ in 0..300 {
            elapsed += dt;
            assert!(anim.update(&mut graph, elapsed, dt));
        }
        let stepped = graph.get(id).unwrap().transform;
        let direct = anim.sample(&graph.get(id).unwrap().base, elapsed);

        assert!((stepped.position.y - direct.position.y).abs() < 1e-5);
        assert!((stepped.position.z - direct.position.z).abs() < 1e-5);
        assert!(angle_delta(stepped.rotation.y, direct.rotation.y).abs() < 1e-4);
    }

    #[test]
    fn detached_target_is_a_silent_noop() {
        let (mut graph, id) = graph_with_body(true);
        let before = graph.get(id).unwrap().transform;
        let mut anim = ObjectAnimator::new(id, params());
        assert!(!anim.update(&mut graph, 1.0, 0.016));
        assert_eq!(graph.get(id).unwrap().transform, before);
        assert_eq!(anim.state().started_at, None);

        let mut anim = ObjectAnimator::new(PrimitiveId(99), params());
        assert!(!anim.update(&mut graph, 1.0, 0.016));
    }

    #[test]
    fn late_attach_starts_from_local_zero() {
        let (mut graph, id) = graph_with_body(true);
        let mut anim = ObjectAnimator::new(id, params());
        anim.update(&mut graph, 4.0, 0.016);

        graph.get_mut(id).unwrap().attachment = Attachment::Attached;
        anim.mark_attached(5.0);
        assert!(anim.update(&mut graph, 5.0, 0.016));

        let base = graph.get(id).unwrap().base;
        let expected = anim.sample(&base, 0.0);
        let got = graph.get(id).unwrap().transform;
        assert!((got.position.y - expected.position.y).abs() < 1e-6);
        assert_eq!(anim.state().spin_angle, 0.0);
    }

    #[test]
    fn spin_holds_while_clock_is_paused() {
        let (mut graph, id) = graph_with_body(false);
        let mut anim = ObjectAnimator::new(id, AnimationParams::spin(0.5));
        anim.mark_attached(0.0);
        anim.update(&mut graph, 1.0, 1.0);
        let spun = anim.state().spin_angle;
        anim.update(&mut graph, 1.0, 0.0);
        assert_eq!(anim.state().spin_angle, spun);
        anim.update(&mut graph, 2.0, 1.0);
        assert!((anim.state().spin_angle - 1.0).abs() < 1e-6);
    }

    #[test]
    fn negative_spin_turns_the_other_way() {
        let (mut graph, id) = graph_with_body(false);
        let mut anim = ObjectAnimator::new(id, AnimationParams::spin(-0.5));
        anim.mark_attached(0.0);
        anim.update(&mut graph, 1.0, 1.0);
        assert!((angle_delta(anim.state().spin_angle, 0.0) + 0.5).abs() < 1e-6);
    }

    #[test]
    fn registry_counts_live_updates() {
        let (mut graph, live) = graph_with_body(false);
        let pending = graph.insert(
            Primitive::new(PrimitiveKind::Glyph('A'), Transform::default(), Geometry::Group)
                .pending_on(AssetRef::Font("font.json".into())),
        );
        let mut registry = AnimatorRegistry::default();
        registry.register(live, params());
        registry.register(pending, params());
        registry.mark_attached(live, 0.0);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.update_all(&mut graph, 0.5, 0.016), 1);
        assert!(registry.get(pending).unwrap().state().started_at.is_none());
    }
}
