//! Declarative theme state
//!
//! The rendering layer reads a `ThemeState` and applies it; nothing in the
//! client mutates page styling directly.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Page background selected by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Background {
    /// Stock background
    #[default]
    Default,
    /// Animated line shader
    Threads,
    /// Flat color (`#rgb` or `#rrggbb`)
    Solid { color: String },
    /// Two-stop linear gradient
    Gradient { from: String, to: String },
    /// Remote image
    Image { url: String },
}

impl Background {
    /// Validated solid color background
    pub fn solid(color: &str) -> Result<Self> {
        validate_hex_color(color)?;
        Ok(Background::Solid {
            color: color.to_lowercase(),
        })
    }

    /// Validated gradient background
    pub fn gradient(from: &str, to: &str) -> Result<Self> {
        validate_hex_color(from)?;
        validate_hex_color(to)?;
        Ok(Background::Gradient {
            from: from.to_lowercase(),
            to: to.to_lowercase(),
        })
    }

    /// Whether rendering needs an animation loop
    pub fn is_animated(&self) -> bool {
        matches!(self, Background::Threads)
    }
}

fn validate_hex_color(color: &str) -> Result<()> {
    let digits = color
        .strip_prefix('#')
        .ok_or_else(|| Error::InvalidInput(format!("Color must start with '#': {}", color)))?;
    let valid_len = digits.len() == 3 || digits.len() == 6;
    if !valid_len || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidInput(format!("Invalid hex color: {}", color)));
    }
    Ok(())
}

/// Everything the rendering layer needs to style the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ThemeState {
    pub background: Background,
    /// True when the background runs an animation loop
    pub animated: bool,
}

impl From<Background> for ThemeState {
    fn from(background: Background) -> Self {
        let animated = background.is_animated();
        Self {
            background,
            animated,
        }
    }
}
