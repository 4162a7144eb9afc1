//! Terminal commands
//!
//! Input parsing, redirect navigation and transcript rendering.

pub mod input;
pub mod navigation;
pub mod render;
