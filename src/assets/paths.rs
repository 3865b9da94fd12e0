//! Fixed asset directory layout: `<root>/meshes`, `<root>/textures`, `<root>/shaders`.

use std::path::{Path, PathBuf};

pub const ASTEROID_MESH: &str = "asteroid.glb";
pub const SKYBOX_TEXTURE: &str = "skybox.hdr";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    root: PathBuf,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self::new("data")
    }
}

impl AssetPaths {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn meshes_dir(&self) -> PathBuf {
        self.root.join("meshes")
    }

    #[must_use]
    pub fn textures_dir(&self) -> PathBuf {
        self.root.join("textures")
    }

    #[must_use]
    pub fn shaders_dir(&self) -> PathBuf {
        self.root.join("shaders")
    }

    #[must_use]
    pub fn mesh(&self, name: &str) -> PathBuf {
        self.meshes_dir().join(name)
    }

    #[must_use]
    pub fn texture(&self, name: &str) -> PathBuf {
        self.textures_dir().join(name)
    }

    #[must_use]
    pub fn shader(&self, name: &str) -> PathBuf {
        self.shaders_dir().join(name)
    }
}
