//! Caption Palette and Style
//!
//! Colors are stored as `#RRGGBB` (or `#RRGGBBAA`) strings in settings files.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{ColorTag, CoreError};

// =============================================================================
// Color
// =============================================================================

/// RGBA color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Creates a new color from RGBA components
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque color from RGB components
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Converts to hex string (e.g., "FFFFFF" or "FFFFFFFF" with alpha)
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }

    /// Converts to ASS/SSA color format (&HAABBGGRR, alpha inverted)
    pub fn to_ass_color(&self) -> String {
        format!(
            "&H{:02X}{:02X}{:02X}{:02X}",
            255 - self.a,
            self.b,
            self.g,
            self.r
        )
    }

    /// Inline override form used inside ASS dialogue text (`&HBBGGRR&`)
    pub fn to_ass_inline(&self) -> String {
        format!("&H{:02X}{:02X}{:02X}&", self.b, self.g, self.r)
    }
}

impl FromStr for Color {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || CoreError::InvalidInput(format!("Invalid color: {}", s));

        if !(hex.len() == 6 || hex.len() == 8) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let a = if hex.len() == 8 { channel(6)? } else { 255 };
        Ok(Self::rgba(channel(0)?, channel(2)?, channel(4)?, a))
    }
}

impl TryFrom<String> for Color {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

// =============================================================================
// Palette
// =============================================================================

/// Caption text color per [`ColorTag`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionPalette {
    pub number: Color,
    pub warning: Color,
    pub highlight: Color,
    pub default: Color,
}

impl Default for CaptionPalette {
    fn default() -> Self {
        Self {
            number: Color::rgb(0x4C, 0xFF, 0x00),
            warning: Color::rgb(0xFF, 0x3B, 0x3B),
            highlight: Color::rgb(0x00, 0xD9, 0xFF),
            default: Color::rgb(0xFF, 0xD9, 0x3D),
        }
    }
}

impl CaptionPalette {
    /// Returns the text color for a tag
    pub fn color_for(&self, tag: ColorTag) -> Color {
        match tag {
            ColorTag::Number => self.number,
            ColorTag::Warning => self.warning,
            ColorTag::Highlight => self.highlight,
            ColorTag::Default => self.default,
        }
    }
}

// =============================================================================
// Style
// =============================================================================

/// Layout and animation of burned-in captions
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptionStyle {
    /// Font family name
    pub font_family: String,
    /// Font size in points at the canvas resolution
    pub font_size: u32,
    /// Canvas width the document is authored for
    pub canvas_width: u32,
    /// Canvas height the document is authored for
    pub canvas_height: u32,
    /// Vertical anchor of the caption box as a fraction of canvas height
    pub vertical_position: f64,
    /// Box behind each word
    pub background_color: Color,
    /// Extra scale at word onset (0.4 = starts at 140%)
    pub pop_in_scale: f64,
    /// Fade in/out duration in milliseconds
    pub fade_ms: u32,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_family: "DejaVu Sans".to_string(),
            font_size: 56,
            canvas_width: 720,
            canvas_height: 1280,
            vertical_position: 0.55,
            background_color: Color::rgba(0, 0, 0, 200),
            pop_in_scale: 0.4,
            fade_ms: 80,
        }
    }
}

impl CaptionStyle {
    /// Clamps out-of-range values back into a renderable range
    pub fn normalize(&mut self) {
        let defaults = Self::default();
        if self.font_family.trim().is_empty() {
            self.font_family = defaults.font_family;
        }
        self.font_size = self.font_size.clamp(8, 256);
        if self.canvas_width == 0 || self.canvas_height == 0 {
            self.canvas_width = defaults.canvas_width;
            self.canvas_height = defaults.canvas_height;
        }
        self.vertical_position = if self.vertical_position.is_finite() {
            self.vertical_position.clamp(0.0, 1.0)
        } else {
            defaults.vertical_position
        };
        self.pop_in_scale = if self.pop_in_scale.is_finite() {
            self.pop_in_scale.clamp(0.0, 2.0)
        } else {
            defaults.pop_in_scale
        };
        self.fade_ms = self.fade_ms.min(1000);
    }
}
