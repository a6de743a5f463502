//! Decorative 2D overlay drawn above the 3D canvas.
//!
//! A heading, a subtitle and a handful of pulsing sparkles. Positions are
//! resolved against the current viewport every tick.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::{render::Color, viewport::ViewportState};

/// Width at which the heading switches to its large size.
pub const WIDE_BREAKPOINT: f32 = 768.0;

/// Pulse period in seconds.
pub const PULSE_PERIOD: f32 = 2.0;

/// Distance from a viewport edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inset {
    Px(f32),
    /// Fraction of the viewport extent along that axis.
    Fraction(f32),
}

impl Inset {
    fn resolve(self, extent: f32) -> f32 {
        match self {
            Inset::Px(px) => px,
            Inset::Fraction(f) => f * extent.max(0.0),
        }
    }
}

/// Horizontal anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HAnchor {
    Left(Inset),
    Right(Inset),
}

/// Vertical anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VAnchor {
    Top(Inset),
    Bottom(Inset),
}

/// A pulsing star glyph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sparkle {
    pub glyph: char,
    pub horizontal: HAnchor,
    pub vertical: VAnchor,
    pub color: Color,
    /// Font size in pixels.
    pub size: f32,
    /// Seconds before the pulse starts.
    #[serde(default)]
    pub delay: f32,
}

impl Sparkle {
    /// Opacity at `elapsed` seconds: 1 until the delay passes, then a
    /// 2 s pulse down to 0.5 and back.
    pub fn opacity(&self, elapsed: f32) -> f32 {
        let local = elapsed - self.delay;
        if local <= 0.0 {
            return 1.0;
        }
        let phase = (local / PULSE_PERIOD).fract();
        0.75 + 0.25 * (TAU * phase).cos()
    }

    /// Top-left pixel position for this viewport.
    pub fn position(&self, viewport: ViewportState) -> (f32, f32) {
        let x = match self.horizontal {
            HAnchor::Left(i) => i.resolve(viewport.width),
            HAnchor::Right(i) => viewport.width - i.resolve(viewport.width) - self.size,
        };
        let y = match self.vertical {
            VAnchor::Top(i) => i.resolve(viewport.height),
            VAnchor::Bottom(i) => viewport.height - i.resolve(viewport.height) - self.size,
        };
        (x, y)
    }
}

/// Overlay configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub title: String,
    pub subtitle: String,
    pub title_color: Color,
    pub subtitle_color: Color,
    pub sparkles: Vec<Sparkle>,
}

fn sparkle(glyph: char, h: HAnchor, v: VAnchor, hex: &str, size: f32, delay: f32) -> Sparkle {
    Sparkle {
        glyph,
        horizontal: h,
        vertical: v,
        color: Color::from_hex(hex).unwrap_or(Color::WHITE),
        size,
        delay,
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        use HAnchor::{Left, Right};
        use Inset::{Fraction, Px};
        use VAnchor::{Bottom, Top};

        Self {
            title: "Te amuu ✨".to_string(),
            subtitle: "Si te queda energía, yo te veo to los días".to_string(),
            title_color: Color::WHITE,
            subtitle_color: Color::rgb8(0xfb, 0xcf, 0xe8),
            sparkles: vec![
                sparkle('✦', Left(Px(80.0)), Top(Px(80.0)), "#fde047", 24.0, 0.0),
                sparkle('✧', Right(Px(128.0)), Top(Px(128.0)), "#f9a8d4", 20.0, 1.0),
                sparkle('✦', Left(Px(64.0)), Bottom(Px(160.0)), "#93c5fd", 18.0, 2.0),
                sparkle('✧', Right(Px(80.0)), Bottom(Px(80.0)), "#d8b4fe", 24.0, 0.5),
                sparkle('✦', Left(Px(32.0)), Top(Fraction(0.5)), "#fef08a", 14.0, 1.5),
                sparkle('✧', Right(Px(48.0)), Top(Fraction(1.0 / 3.0)), "#fbcfe8", 18.0, 0.7),
            ],
        }
    }
}

/// One sparkle as the renderer should draw it this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparkleFrame {
    pub glyph: char,
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub color: Color,
    pub opacity: f32,
}

/// Resolved overlay for a single tick.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayFrame<'a> {
    pub title: &'a str,
    pub subtitle: &'a str,
    pub title_color: Color,
    pub subtitle_color: Color,
    pub title_size: f32,
    pub subtitle_size: f32,
    pub sparkles: Vec<SparkleFrame>,
}

impl OverlayConfig {
    /// Resolves sizes, positions and pulse opacity for this tick.
    pub fn frame(&self, viewport: ViewportState, elapsed: f32) -> OverlayFrame<'_> {
        let wide = viewport.width >= WIDE_BREAKPOINT;
        OverlayFrame {
            title: &self.title,
            subtitle: &self.subtitle,
            title_color: self.title_color,
            subtitle_color: self.subtitle_color,
            title_size: if wide { 60.0 } else { 36.0 },
            subtitle_size: if wide { 20.0 } else { 18.0 },
            sparkles: self
                .sparkles
                .iter()
                .map(|s| {
                    let (x, y) = s.position(viewport);
                    SparkleFrame {
                        glyph: s.glyph,
                        x,
                        y,
                        size: s.size,
                        color: s.color,
                        opacity: s.opacity(elapsed),
                    }
                })
                .collect(),
        }
    }
}
