//! Utility Module
//!
//! - [`FpsCounter`]: frame rate measurement for the window title

pub mod fps_counter;

pub use fps_counter::{FPS_INTERVAL, FpsCounter};
