//! Configuration system.
//!
//! Loads scene configuration from JSON strings (file IO left to app).
//! `SceneConfig::default()` is the greeting card as shipped; JSON only needs
//! to name the fields it changes.
//!
//! Every value is checked by `validate()` before a scene is assembled, so
//! animation code never sees an out-of-domain parameter.

use std::{
    f32::consts::{FRAC_PI_2, FRAC_PI_3, PI},
    fmt,
};

use serde::{Deserialize, Serialize};

use crate::{
    math::Vec3,
    overlay::OverlayConfig,
    render::{Color, Environment, Light},
    scene::Bevel,
    viewport::ViewportState,
};

bitflags::bitflags! {
    /// Camera interactions the host allows.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlFlags: u32 {
        const ROTATE = 1 << 0;
        const ZOOM = 1 << 1;
        const PAN = 1 << 2;
        const AUTO_ROTATE = 1 << 3;
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Headless host refresh rate.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
    /// Initial viewport, until the host reports a resize.
    #[serde(default)]
    pub viewport: ViewportState,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default = "default_lights")]
    pub lights: Vec<Light>,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub moon: MoonConfig,
    #[serde(default)]
    pub lettering: LetteringConfig,
    #[serde(default)]
    pub materials: MaterialsConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
}

fn default_tick_hz() -> u32 {
    60
}

fn hex(s: &str) -> Color {
    Color::from_hex(s).unwrap_or(Color::WHITE)
}

fn default_lights() -> Vec<Light> {
    vec![
        Light::Ambient {
            color: hex("#4f46e5"),
            intensity: 0.3,
        },
        Light::Directional {
            position: Vec3::new(5.0, 5.0, 5.0),
            color: hex("#fbbf24"),
            intensity: 0.8,
            cast_shadow: true,
        },
        Light::Point {
            position: Vec3::new(-5.0, 2.0, 2.0),
            color: hex("#ec4899"),
            intensity: 0.5,
        },
    ]
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            viewport: ViewportState::default(),
            camera: CameraConfig::default(),
            layout: LayoutConfig::default(),
            lights: default_lights(),
            environment: Environment::default(),
            moon: MoonConfig::default(),
            lettering: LetteringConfig::default(),
            materials: MaterialsConfig::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

/// Per-primitive motion tuning. Set once at creation, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnimationParams {
    /// Yaw spin in rad/s; the sign picks the direction.
    pub spin_speed: f32,
    /// Vertical float amplitude in world units.
    pub float_amplitude: f32,
    /// Float frequency in rad/s.
    pub float_speed: f32,
    /// Wobble strength for the secondary rotation.
    pub wobble_speed: f32,
    /// Seconds added to the oscillation clock.
    pub phase_offset: f32,
}

impl AnimationParams {
    pub fn spin(speed: f32) -> Self {
        Self {
            spin_speed: speed,
            ..Self::default()
        }
    }

    pub fn with_phase(mut self, phase_offset: f32) -> Self {
        self.phase_offset = phase_offset;
        self
    }

    pub fn validate(&self, target: &'static str) -> Result<(), ConfigError> {
        let fields = [
            ("spin_speed", self.spin_speed),
            ("float_amplitude", self.float_amplitude),
            ("float_speed", self.float_speed),
            ("wobble_speed", self.wobble_speed),
            ("phase_offset", self.phase_offset),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(ConfigError::Animation { target, field, value });
            }
        }
        for (field, value) in [
            ("float_amplitude", self.float_amplitude),
            ("float_speed", self.float_speed),
            ("wobble_speed", self.wobble_speed),
        ] {
            if value < 0.0 {
                return Err(ConfigError::Animation { target, field, value });
            }
        }
        Ok(())
    }
}

/// Orbit camera configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub auto_rotate: bool,
    /// 1.0 is one full orbit per minute.
    pub auto_rotate_speed: f32,
    pub rotate_speed: f32,
    pub enable_zoom: bool,
    pub enable_pan: bool,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 8.0),
            target: Vec3::ZERO,
            fov_deg: 50.0,
            near: 0.1,
            far: 1000.0,
            min_polar_angle: FRAC_PI_3,
            max_polar_angle: FRAC_PI_2,
            auto_rotate: true,
            auto_rotate_speed: 0.5,
            rotate_speed: 1.0,
            enable_zoom: false,
            enable_pan: false,
            zoom_speed: 1.0,
            min_distance: 2.0,
            max_distance: 20.0,
        }
    }
}

impl CameraConfig {
    pub fn flags(&self) -> ControlFlags {
        let mut flags = ControlFlags::ROTATE;
        flags.set(ControlFlags::ZOOM, self.enable_zoom);
        flags.set(ControlFlags::PAN, self.enable_pan);
        flags.set(ControlFlags::AUTO_ROTATE, self.auto_rotate);
        flags
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = (self.min_polar_angle, self.max_polar_angle);
        if !(min.is_finite() && max.is_finite()) || min < 0.0 || max > PI || min > max {
            return Err(ConfigError::PolarRange { min, max });
        }
        if !self.position.is_finite() || !self.target.is_finite() {
            return Err(ConfigError::NonFinite("camera.position"));
        }
        if (self.position - self.target).len() <= f32::EPSILON {
            return Err(ConfigError::NonPositive {
                field: "camera distance",
                value: 0.0,
            });
        }
        for (field, value) in [
            ("camera.fov_deg", self.fov_deg),
            ("camera.near", self.near),
            ("camera.rotate_speed", self.rotate_speed),
            ("camera.zoom_speed", self.zoom_speed),
            ("camera.min_distance", self.min_distance),
        ] {
            positive(field, value)?;
        }
        if self.fov_deg >= 180.0 {
            return Err(ConfigError::OutOfRange {
                field: "camera.fov_deg",
                value: self.fov_deg,
            });
        }
        if !(self.far > self.near) {
            return Err(ConfigError::OutOfRange {
                field: "camera.far",
                value: self.far,
            });
        }
        if !(self.max_distance >= self.min_distance) {
            return Err(ConfigError::DistanceRange {
                min: self.min_distance,
                max: self.max_distance,
            });
        }
        if !self.auto_rotate_speed.is_finite() {
            return Err(ConfigError::NonFinite("camera.auto_rotate_speed"));
        }
        Ok(())
    }
}

/// Responsive scaling for the lettering group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub reference_width: f32,
    pub min_scale: f32,
    pub max_scale: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            reference_width: 1000.0,
            min_scale: 0.6,
            max_scale: 1.0,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("layout.reference_width", self.reference_width)?;
        let (min, max) = (self.min_scale, self.max_scale);
        if !(min.is_finite() && max.is_finite()) || min <= 0.0 || min > max {
            return Err(ConfigError::ScaleRange { min, max });
        }
        Ok(())
    }
}

/// Which moon to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MoonStyle {
    /// Smooth sphere with crater spheres on its face.
    #[default]
    Cratered,
    /// Low-poly icosahedron with edge overlay and an occluder bite.
    Crescent,
}

/// One crater sphere, in moon-local coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crater {
    pub radius: f32,
    pub position: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrateredMoon {
    pub color: Color,
    pub roughness: f32,
    pub metalness: f32,
    pub segments: u32,
    pub crater_color: Color,
    pub crater_roughness: f32,
    pub craters: Vec<Crater>,
}

impl Default for CrateredMoon {
    fn default() -> Self {
        Self {
            color: hex("#f8f9fa"),
            roughness: 0.8,
            metalness: 0.1,
            segments: 64,
            crater_color: hex("#e9ecef"),
            crater_roughness: 0.9,
            craters: vec![
                Crater {
                    radius: 0.1,
                    position: Vec3::new(0.8, 0.3, 1.2),
                },
                Crater {
                    radius: 0.15,
                    position: Vec3::new(-0.6, -0.4, 1.5),
                },
                Crater {
                    radius: 0.08,
                    position: Vec3::new(0.2, 0.8, 1.8),
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrescentMoon {
    pub color: Color,
    pub edge_color: Color,
    pub edge_opacity: f32,
    /// Face angle in degrees above which an edge is outlined.
    pub edge_threshold: f32,
    /// Icosahedron subdivision, 1..=4.
    pub detail: u32,
    pub roughness: f32,
    pub metalness: f32,
    pub emissive_intensity: f32,
    /// How much of the disc the occluder bites away (0.4 thin, 1.2 half).
    pub crescent_offset: f32,
}

impl Default for CrescentMoon {
    fn default() -> Self {
        Self {
            color: hex("#facc15"),
            edge_color: hex("#fde68a"),
            edge_opacity: 0.85,
            edge_threshold: 12.0,
            detail: 2,
            roughness: 0.5,
            metalness: 0.25,
            emissive_intensity: 0.06,
            crescent_offset: 0.75,
        }
    }
}

/// The celestial body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoonConfig {
    pub style: MoonStyle,
    pub position: Vec3,
    pub radius: f32,
    /// Optional mesh that replaces the procedural body once loaded.
    pub model: Option<String>,
    pub animation: AnimationParams,
    pub cratered: CrateredMoon,
    pub crescent: CrescentMoon,
}

impl Default for MoonConfig {
    fn default() -> Self {
        Self {
            style: MoonStyle::default(),
            position: Vec3::new(0.0, 1.0, 0.0),
            radius: 2.0,
            model: None,
            animation: AnimationParams {
                spin_speed: 0.2,
                float_amplitude: 0.15,
                float_speed: 0.8,
                wobble_speed: 0.0,
                phase_offset: 0.0,
            },
            cratered: CrateredMoon::default(),
            crescent: CrescentMoon::default(),
        }
    }
}

impl MoonConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.position.is_finite() {
            return Err(ConfigError::NonFinite("moon.position"));
        }
        positive("moon.radius", self.radius)?;
        self.animation.validate("moon")?;
        for crater in &self.cratered.craters {
            positive("moon.cratered.craters.radius", crater.radius)?;
        }
        if !(1..=4).contains(&self.crescent.detail) {
            return Err(ConfigError::OutOfRange {
                field: "moon.crescent.detail",
                value: self.crescent.detail as f32,
            });
        }
        unit_interval("moon.crescent.edge_opacity", self.crescent.edge_opacity)?;
        if !(self.crescent.crescent_offset.is_finite() && self.crescent.crescent_offset >= 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "moon.crescent.crescent_offset",
                value: self.crescent.crescent_offset,
            });
        }
        Ok(())
    }
}

/// Extruded 3D lettering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LetteringConfig {
    pub text: String,
    /// Typeface JSON path, relative to the asset root.
    pub font: String,
    pub size: f32,
    pub depth: f32,
    pub curve_segments: u32,
    pub bevel: Option<Bevel>,
    pub position: Vec3,
    pub color: Color,
    pub roughness: f32,
    pub metalness: f32,
    pub emissive_intensity: f32,
    pub animation: AnimationParams,
    /// Extra phase, in seconds, for each successive letter.
    pub letter_phase_step: f32,
}

impl Default for LetteringConfig {
    fn default() -> Self {
        Self {
            text: "ANDREW".to_string(),
            font: "fonts/Geist_Bold.json".to_string(),
            size: 0.8,
            depth: 0.1,
            curve_segments: 12,
            bevel: Some(Bevel {
                thickness: 0.02,
                size: 0.02,
                offset: 0.0,
                segments: 5,
            }),
            position: Vec3::new(-2.2, -2.5, 0.0),
            color: hex("#a855f7"),
            roughness: 0.3,
            metalness: 0.7,
            emissive_intensity: 0.15,
            animation: AnimationParams {
                spin_speed: 0.0,
                float_amplitude: 0.08,
                float_speed: 1.2,
                wobble_speed: 0.5,
                phase_offset: 0.0,
            },
            letter_phase_step: 0.35,
        }
    }
}

impl LetteringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.text.trim().is_empty() {
            return Err(ConfigError::EmptyText);
        }
        positive("lettering.size", self.size)?;
        if !(self.depth.is_finite() && self.depth >= 0.0) {
            return Err(ConfigError::OutOfRange {
                field: "lettering.depth",
                value: self.depth,
            });
        }
        if !self.position.is_finite() {
            return Err(ConfigError::NonFinite("lettering.position"));
        }
        if !self.letter_phase_step.is_finite() {
            return Err(ConfigError::NonFinite("lettering.letter_phase_step"));
        }
        self.animation.validate("lettering")
    }
}

/// Material policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MaterialsConfig {
    /// Moon and lettering share the chrome family so they read as one substance.
    pub unified: bool,
}

impl SceneConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Rejects out-of-domain values before any scene is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_hz == 0 {
            return Err(ConfigError::TickRate);
        }
        self.camera.validate()?;
        self.layout.validate()?;
        self.moon.validate()?;
        self.lettering.validate()?;
        for light in &self.lights {
            let value = light.intensity();
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::OutOfRange {
                    field: "lights.intensity",
                    value,
                });
            }
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn unit_interval(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value })
    }
}

/// Invalid configuration, reported at scene construction.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    PolarRange { min: f32, max: f32 },
    ScaleRange { min: f32, max: f32 },
    DistanceRange { min: f32, max: f32 },
    NonPositive { field: &'static str, value: f32 },
    OutOfRange { field: &'static str, value: f32 },
    NonFinite(&'static str),
    Animation {
        target: &'static str,
        field: &'static str,
        value: f32,
    },
    TickRate,
    EmptyText,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::PolarRange { min, max } => {
                write!(f, "polar angle limits [{min}, {max}] must satisfy 0 <= min <= max <= pi")
            }
            ConfigError::ScaleRange { min, max } => {
                write!(f, "scale limits [{min}, {max}] must satisfy 0 < min <= max")
            }
            ConfigError::DistanceRange { min, max } => {
                write!(f, "camera distance limits [{min}, {max}] are inverted")
            }
            ConfigError::NonPositive { field, value } => {
                write!(f, "{field} must be positive, got {value}")
            }
            ConfigError::OutOfRange { field, value } => write!(f, "{field} out of range: {value}"),
            ConfigError::NonFinite(field) => write!(f, "{field} must be finite"),
            ConfigError::Animation { target, field, value } => {
                write!(f, "invalid {target} animation {field}: {value}")
            }
            ConfigError::TickRate => write!(f, "tick_hz must be at least 1"),
            ConfigError::EmptyText => write!(f, "lettering text is empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SceneConfig::default().validate(), Ok(()));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = SceneConfig::from_json_str(
            r#"{ "lettering": { "text": "LUNA" }, "camera": { "auto_rotate": false } }"#,
        )
        .unwrap();
        assert_eq!(cfg.lettering.text, "LUNA");
        assert_eq!(cfg.lettering.size, 0.8);
        assert!(!cfg.camera.auto_rotate);
        assert_eq!(cfg.camera.max_polar_angle, FRAC_PI_2);
        assert_eq!(cfg.lights.len(), 3);
        assert_eq!(cfg.tick_hz, 60);
    }

    #[test]
    fn partial_overlay_keeps_default_sparkles() {
        let cfg = SceneConfig::from_json_str(r#"{ "overlay": { "title": "Hi" } }"#).unwrap();
        let defaults = OverlayConfig::default();
        assert_eq!(cfg.overlay.title, "Hi");
        assert_eq!(cfg.overlay.subtitle, defaults.subtitle);
        assert_eq!(cfg.overlay.title_color, defaults.title_color);
        assert_eq!(cfg.overlay.sparkles.len(), 6);
    }

    #[test]
    fn inverted_polar_limits_are_rejected() {
        let mut cfg = SceneConfig::default();
        cfg.camera.min_polar_angle = 2.0;
        cfg.camera.max_polar_angle = 1.0;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::PolarRange { min: 2.0, max: 1.0 })
        );
    }

    #[test]
    fn scale_and_animation_domains_are_checked() {
        let mut cfg = SceneConfig::default();
        cfg.layout.min_scale = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::ScaleRange { .. })));

        let mut cfg = SceneConfig::default();
        cfg.lettering.animation.float_amplitude = -1.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Animation {
                target: "lettering",
                field: "float_amplitude",
                ..
            })
        ));

        let mut cfg = SceneConfig::default();
        cfg.moon.animation.spin_speed = f32::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn negative_spin_is_a_direction_not_an_error() {
        let mut cfg = SceneConfig::default();
        cfg.moon.animation.spin_speed = -0.2;
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn flags_follow_booleans() {
        let cam = CameraConfig::default();
        let flags = cam.flags();
        assert!(flags.contains(ControlFlags::ROTATE | ControlFlags::AUTO_ROTATE));
        assert!(!flags.intersects(ControlFlags::ZOOM | ControlFlags::PAN));
    }

    #[test]
    fn errors_render_readably() {
        let e = ConfigError::NonPositive {
            field: "moon.radius",
            value: 0.0,
        };
        assert_eq!(e.to_string(), "moon.radius must be positive, got 0");
    }
}
