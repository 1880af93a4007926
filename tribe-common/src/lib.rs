//! # Tribe Common Library
//!
//! Shared code for all Tribe client modules including:
//! - Data model (story groups, stories, like status, posts)
//! - Event types (TribeEvent enum) and the EventBus
//! - Configuration resolution
//! - Application-state store and declarative theme state
//! - Error reporting with severity levels
//! - Time helpers

pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod reporting;
pub mod store;
pub mod theme;
pub mod time;

pub use error::{Error, Result};
