//! Asset Loading
//!
//! Setup-time loaders for meshes (glTF) and images, and the fixed directory
//! layout they are read from.

pub mod image;
pub mod mesh;
pub mod paths;

pub use self::image::{Image, PixelData};
pub use mesh::{MaterialRefs, Mesh, TextureRef, Vertex};
pub use paths::AssetPaths;
