//! Keyboard and pointer input mapping
//!
//! Keys:
//! - ArrowUp: previous story
//! - ArrowDown: next story
//! - Escape: close viewer
//! - Space: pause / resume
//! - L: like current story
//!
//! Pointer: a press in the left half of the viewport goes back, the right half
//! (including the exact midpoint) goes forward.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Keys the viewer reacts to (DOM `KeyboardEvent.key` names)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Escape,
    Space,
    Char(char),
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ArrowUp" => Ok(Key::ArrowUp),
            "ArrowDown" => Ok(Key::ArrowDown),
            "ArrowLeft" => Ok(Key::ArrowLeft),
            "ArrowRight" => Ok(Key::ArrowRight),
            "Escape" | "Esc" => Ok(Key::Escape),
            " " | "Space" | "Spacebar" => Ok(Key::Space),
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Key::Char(c)),
                    _ => Err(format!("Unknown key: {:?}", other)),
                }
            }
        }
    }
}

/// Pointer press inside the viewer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerPress {
    /// Horizontal position relative to the viewport's left edge
    pub x: f64,
    pub viewport_width: f64,
}

/// Action requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewerCommand {
    Advance,
    Retreat,
    Close,
    TogglePause,
    Like,
}

/// Map a key to a command (None for keys the viewer ignores)
pub fn map_key(key: Key) -> Option<ViewerCommand> {
    match key {
        Key::ArrowUp => Some(ViewerCommand::Retreat),
        Key::ArrowDown => Some(ViewerCommand::Advance),
        Key::Escape => Some(ViewerCommand::Close),
        Key::Space => Some(ViewerCommand::TogglePause),
        Key::Char('l') | Key::Char('L') => Some(ViewerCommand::Like),
        Key::ArrowLeft | Key::ArrowRight | Key::Char(_) => None,
    }
}

/// Map a pointer press to a hit-test zone
pub fn map_pointer(press: PointerPress) -> Option<ViewerCommand> {
    if !(press.viewport_width.is_finite() && press.viewport_width > 0.0) || !press.x.is_finite() {
        return None;
    }
    if press.x < press.viewport_width / 2.0 {
        Some(ViewerCommand::Retreat)
    } else {
        Some(ViewerCommand::Advance)
    }
}
