//! Backend HTTP access

pub mod client;
pub mod csrf;

pub use client::StoriesClient;
pub use csrf::{extract_csrf_token, CSRF_HEADER};
