//! Rendering abstraction.
//!
//! This crate intentionally does not depend on a graphics backend.
//! It defines what the scene hands to a renderer (materials, lights,
//! environment, camera matrices) and the trait a renderer implementation
//! would satisfy.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    math::{Mat4, Vec3},
    overlay::OverlayFrame,
    scene::{Primitive, PrimitiveId},
};

/// Linear RGB colour in `[0, 1]`, written as `#rrggbb` in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Parses `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(s: &str) -> Result<Self, ColorParseError> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ColorParseError(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ColorParseError(s.to_string()))
        };
        Ok(Self::rgb8(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_rgb8(self) -> (u8, u8, u8) {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        (q(self.r), q(self.g), q(self.b))
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Color::from_hex(&s)
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (r, g, b) = self.to_rgb8();
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
    }
}

/// Error returned for colour strings that are not `#rrggbb`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorParseError(pub String);

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid colour {:?}, expected #rrggbb", self.0)
    }
}

impl std::error::Error for ColorParseError {}

/// Immutable surface description handed to the renderer.
///
/// Loaded assets get a descriptor applied once on load completion; nothing
/// patches materials while the scene runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialDescriptor {
    pub color: Color,
    pub roughness: f32,
    pub metalness: f32,
    pub emissive: Color,
    pub emissive_intensity: f32,
    /// 1.0 is opaque.
    pub opacity: f32,
    /// Unlit material (edge overlays, occluders drawn flat).
    pub unlit: bool,
}

impl Default for MaterialDescriptor {
    fn default() -> Self {
        Self::standard(Color::WHITE, 1.0, 0.0)
    }
}

impl MaterialDescriptor {
    /// Physically-based standard material.
    pub fn standard(color: Color, roughness: f32, metalness: f32) -> Self {
        Self {
            color,
            roughness,
            metalness,
            emissive: Color::BLACK,
            emissive_intensity: 0.0,
            opacity: 1.0,
            unlit: false,
        }
    }

    /// Chrome-like family shared by objects that must read as one substance.
    pub fn chrome(tint: Color) -> Self {
        Self::standard(tint, 0.15, 0.9)
    }

    /// Flat, unlit material.
    pub fn basic(color: Color, opacity: f32) -> Self {
        Self {
            opacity,
            unlit: true,
            ..Self::standard(color, 1.0, 0.0)
        }
    }

    pub fn with_emissive(mut self, emissive: Color, intensity: f32) -> Self {
        self.emissive = emissive;
        self.emissive_intensity = intensity;
        self
    }

    /// Keeps the glow of `self` but swaps the surface to the chrome family.
    pub fn into_chrome(self) -> Self {
        Self {
            emissive: self.emissive,
            emissive_intensity: self.emissive_intensity,
            ..Self::chrome(self.color)
        }
    }
}

/// Scene light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Light {
    Ambient {
        color: Color,
        intensity: f32,
    },
    Directional {
        position: Vec3,
        color: Color,
        intensity: f32,
        #[serde(default)]
        cast_shadow: bool,
    },
    Point {
        position: Vec3,
        color: Color,
        intensity: f32,
    },
}

impl Light {
    pub fn intensity(&self) -> f32 {
        match self {
            Light::Ambient { intensity, .. }
            | Light::Directional { intensity, .. }
            | Light::Point { intensity, .. } => *intensity,
        }
    }
}

/// Environment map preset used as backdrop and reflection source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Night,
    Sunset,
    Dawn,
    City,
    Studio,
}

/// A minimal rendering API.
///
/// Called once per tick by the frame scheduler, in this order:
/// `begin_frame`, camera + environment + lights, primitives, overlay,
/// `end_frame`. Only attached primitives are passed.
pub trait RenderBackend: Send + Sync {
    fn begin_frame(&mut self, tick: u64);
    fn set_view_proj(&mut self, view_proj: Mat4);
    fn set_camera_eye(&mut self, eye: Vec3);
    fn set_environment(&mut self, environment: Environment);
    fn draw_light(&mut self, light: &Light);
    fn draw_primitive(&mut self, id: PrimitiveId, primitive: &Primitive);
    fn draw_overlay(&mut self, overlay: &OverlayFrame);
    fn end_frame(&mut self);
}

/// A no-op renderer useful for headless runs and tests.
#[derive(Default)]
pub struct NullRenderer;

impl RenderBackend for NullRenderer {
    fn begin_frame(&mut self, _tick: u64) {}
    fn set_view_proj(&mut self, _view_proj: Mat4) {}
    fn set_camera_eye(&mut self, _eye: Vec3) {}
    fn set_environment(&mut self, _environment: Environment) {}
    fn draw_light(&mut self, _light: &Light) {}
    fn draw_primitive(&mut self, _id: PrimitiveId, _primitive: &Primitive) {}
    fn draw_overlay(&mut self, _overlay: &OverlayFrame) {}
    fn end_frame(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_parse_and_print() {
        let lilac = Color::from_hex("#a855f7").unwrap();
        assert_eq!(lilac.to_rgb8(), (0xa8, 0x55, 0xf7));
        assert_eq!(lilac.to_string(), "#a855f7");
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("#zzzzzz").is_err());
    }

    #[test]
    fn color_serde_uses_hex_strings() {
        let c: Color = serde_json::from_str("\"#fbbf24\"").unwrap();
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"#fbbf24\"");
        assert!(serde_json::from_str::<Color>("\"yellow\"").is_err());
    }

    #[test]
    fn chrome_keeps_tint_and_glow() {
        let glyph = MaterialDescriptor::standard(Color::rgb8(168, 85, 247), 0.3, 0.7)
            .with_emissive(Color::rgb8(168, 85, 247), 0.15);
        let chrome = glyph.into_chrome();
        assert_eq!(chrome.color, glyph.color);
        assert_eq!(chrome.emissive_intensity, 0.15);
        assert!(chrome.metalness > 0.8 && chrome.roughness < 0.2);
    }
}
