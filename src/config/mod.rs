//! Configuration management for slate
//!
//! This module handles loading, parsing, and validating configuration
//! from TOML files. Every field has a default, so an empty or missing
//! file yields a usable launcher.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::geometry::{Anchor, Dimension, Edges, ExclusiveZone, GeometrySpec};
use crate::render::Rgba;

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    /// Size and placement of the launcher surface
    #[serde(default)]
    pub window: WindowConfig,

    /// Which output to open on
    #[serde(default)]
    pub output: OutputConfig,

    /// Colors used by the renderer
    #[serde(default)]
    pub colors: ColorConfig,
}

/// A length that is either absolute or a percentage of the output.
///
/// In TOML this is an integer (`640`) or a string with an optional `%`
/// suffix (`"50%"`, `"12"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLength", into = "RawLength")]
pub struct Length {
    pub value: i32,
    pub is_percent: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawLength {
    Int(i64),
    Str(String),
}

impl Length {
    pub const fn px(value: i32) -> Self {
        Self {
            value,
            is_percent: false,
        }
    }

    pub const fn percent(value: i32) -> Self {
        Self {
            value,
            is_percent: true,
        }
    }

    /// Parse `"50%"`, `"12"` or `"-1"`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (digits, is_percent) = match s.strip_suffix('%') {
            Some(digits) => (digits.trim_end(), true),
            None => (s, false),
        };
        let value = digits
            .parse::<i32>()
            .with_context(|| format!("Invalid length: {:?}", s))?;
        Ok(Self { value, is_percent })
    }

    /// Non-negative lengths as a geometry dimension.
    fn dimension(&self, field: &str) -> Result<Dimension> {
        let value = u32::try_from(self.value)
            .with_context(|| format!("Invalid {}: must not be negative", field))?;
        Ok(Dimension {
            value,
            is_percent: self.is_percent,
        })
    }
}

impl TryFrom<RawLength> for Length {
    type Error = String;

    fn try_from(raw: RawLength) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawLength::Int(v) => i32::try_from(v)
                .map(Length::px)
                .map_err(|_| format!("length {} is out of range", v)),
            RawLength::Str(s) => Length::parse(&s).map_err(|e| e.to_string()),
        }
    }
}

impl From<Length> for RawLength {
    fn from(length: Length) -> Self {
        if length.is_percent {
            RawLength::Str(length.to_string())
        } else {
            RawLength::Int(length.value as i64)
        }
    }
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_percent {
            write!(f, "{}%", self.value)
        } else {
            write!(f, "{}", self.value)
        }
    }
}

/// Anchor names as written in the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AnchorName {
    TopLeft,
    Top,
    TopRight,
    Left,
    #[default]
    Center,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl From<AnchorName> for Anchor {
    fn from(name: AnchorName) -> Self {
        match name {
            AnchorName::TopLeft => Anchor::TopLeft,
            AnchorName::Top => Anchor::Top,
            AnchorName::TopRight => Anchor::TopRight,
            AnchorName::Left => Anchor::Left,
            AnchorName::Center => Anchor::Center,
            AnchorName::Right => Anchor::Right,
            AnchorName::BottomLeft => Anchor::BottomLeft,
            AnchorName::Bottom => Anchor::Bottom,
            AnchorName::BottomRight => Anchor::BottomRight,
        }
    }
}

/// Launcher surface geometry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub width: Length,
    pub height: Length,
    pub anchor: AnchorName,

    /// Negative to opt out of any exclusive zone
    pub exclusive_zone: Length,

    pub margin_top: Length,
    pub margin_right: Length,
    pub margin_bottom: Length,
    pub margin_left: Length,

    pub padding_top: Length,
    pub padding_right: Length,
    pub padding_bottom: Length,
    pub padding_left: Length,

    /// Treat sizes as logical units and let the renderer scale
    pub use_scale: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: Length::percent(50),
            height: Length::percent(50),
            anchor: AnchorName::Center,
            exclusive_zone: Length::px(-1),
            margin_top: Length::px(0),
            margin_right: Length::px(0),
            margin_bottom: Length::px(0),
            margin_left: Length::px(0),
            padding_top: Length::px(8),
            padding_right: Length::px(8),
            padding_bottom: Length::px(8),
            padding_left: Length::px(8),
            use_scale: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Output name such as "DP-1"; empty lets the compositor choose
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColorConfig {
    /// `#RRGGBB` or `#RRGGBBAA`
    pub background: String,
    pub panel: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            background: "#1B1D1E".to_string(),
            panel: "#2E3440".to_string(),
        }
    }
}

/// Parse `#RRGGBB` or `#RRGGBBAA`.
pub fn parse_color(s: &str) -> Result<Rgba> {
    let hex = s
        .strip_prefix('#')
        .with_context(|| format!("Invalid color {:?}: missing '#'", s))?;
    if !(hex.len() == 6 || hex.len() == 8) || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        anyhow::bail!("Invalid color {:?}: expected #RRGGBB or #RRGGBBAA", s);
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
    let alpha = if hex.len() == 8 { channel(6)? } else { 0xff };
    Ok(Rgba::new(channel(0)?, channel(2)?, channel(4)?, alpha))
}

/// Expand a leading `~` to the home directory.
pub fn expand_home<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            Ok(Path::new(&home).join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_home(path)?;

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))
    }

    /// Parse and validate configuration text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let window = &self.window;
        let lengths = [
            ("width", window.width),
            ("height", window.height),
            ("margin_top", window.margin_top),
            ("margin_right", window.margin_right),
            ("margin_bottom", window.margin_bottom),
            ("margin_left", window.margin_left),
            ("padding_top", window.padding_top),
            ("padding_right", window.padding_right),
            ("padding_bottom", window.padding_bottom),
            ("padding_left", window.padding_left),
        ];
        for (field, length) in lengths {
            length.dimension(field)?;
            if length.is_percent && length.value > 100 {
                anyhow::bail!("Invalid {}: percentage must not exceed 100%", field);
            }
        }

        let zone = window.exclusive_zone;
        if zone.is_percent && !(0..=100).contains(&zone.value) {
            anyhow::bail!("Invalid exclusive_zone: percentage must be between 0% and 100%");
        }

        parse_color(&self.colors.background).context("Invalid background color")?;
        parse_color(&self.colors.panel).context("Invalid panel color")?;

        Ok(())
    }

    /// The geometry request handed to the resolver.
    pub fn geometry_spec(&self) -> Result<GeometrySpec> {
        let window = &self.window;
        Ok(GeometrySpec {
            width: window.width.dimension("width")?,
            height: window.height.dimension("height")?,
            margin: Edges {
                top: window.margin_top.dimension("margin_top")?,
                right: window.margin_right.dimension("margin_right")?,
                bottom: window.margin_bottom.dimension("margin_bottom")?,
                left: window.margin_left.dimension("margin_left")?,
            },
            padding: Edges {
                top: window.padding_top.dimension("padding_top")?,
                right: window.padding_right.dimension("padding_right")?,
                bottom: window.padding_bottom.dimension("padding_bottom")?,
                left: window.padding_left.dimension("padding_left")?,
            },
            exclusive_zone: ExclusiveZone {
                value: window.exclusive_zone.value,
                is_percent: window.exclusive_zone.is_percent,
            },
            anchor: window.anchor.into(),
            use_scale: window.use_scale,
        })
    }
}
