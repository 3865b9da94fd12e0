//! Application Layer
//!
//! - [`input`]: platform-independent input state and its mapping onto the
//!   camera and scene
//! - [`winit`]: the windowed viewer built on winit

pub mod input;
pub mod winit;

pub use input::Input;
pub use winit::App;
