//! Mesh Loader
//!
//! Loads the first mesh of a glTF 2.0 file (`.gltf` or `.glb`) into a flat
//! vertex/triangle list with full tangent frames, plus the texture files its
//! material references.
//!
//! Missing normals are generated from face geometry; missing tangents are
//! generated from texture coordinates. Supplied glTF tangents carry the
//! bitangent sign in `w`.

use std::path::{Path, PathBuf};

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::errors::{PbrError, Result};

/// Interleaved vertex: 14 floats, 56 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub bitangent: [f32; 3],
    pub texcoord: [f32; 2],
}

/// One texture file a material refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureRef {
    pub path: PathBuf,
    /// Source channel for single-channel maps packed into a multi-channel file.
    pub channel: Option<u32>,
}

impl TextureRef {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            channel: None,
        }
    }

    #[must_use]
    pub fn with_channel(mut self, channel: u32) -> Self {
        self.channel = Some(channel);
        self
    }
}

/// Texture references of the four PBR material inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialRefs {
    pub albedo: Option<TextureRef>,
    pub normals: Option<TextureRef>,
    pub metalness: Option<TextureRef>,
    pub roughness: Option<TextureRef>,
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<[u32; 3]>,
    pub textures: MaterialRefs,
}

impl Mesh {
    /// Loads the first mesh of a glTF/GLB file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading mesh: {}", path.display());

        let bytes = std::fs::read(path).map_err(|err| PbrError::asset(path.display().to_string(), err.to_string()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_slice(&bytes, Some(base_dir))
            .map_err(|err| PbrError::asset(path.display().to_string(), err.to_string()))
    }

    /// Loads the first mesh of an in-memory glTF/GLB document.
    ///
    /// External buffers and texture files resolve against `base_dir`;
    /// embedded `data:` URIs need no base.
    pub fn from_slice(bytes: &[u8], base_dir: Option<&Path>) -> Result<Self> {
        let gltf::Gltf { document, blob } = gltf::Gltf::from_slice(bytes)?;
        let buffers = gltf::import_buffers(&document, base_dir, blob)?;

        let Some(mesh) = document.meshes().next() else {
            return Err(PbrError::asset("<gltf>", "file contains no mesh data"));
        };

        let mut out = Mesh::default();
        let mut has_normals = true;
        let mut has_tangents = true;

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!("Skipping non-triangle primitive {:?}", primitive.mode());
                continue;
            }
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let positions: Vec<[f32; 3]> = positions.collect();
            let count = positions.len();
            let base = out.vertices.len() as u32;

            let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(Iterator::collect);
            let tangents: Option<Vec<[f32; 4]>> = reader.read_tangents().map(Iterator::collect);
            let texcoords: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|tc| tc.into_f32().collect())
                .unwrap_or_else(|| vec![[0.0; 2]; count]);

            has_normals &= normals.as_ref().is_some_and(|n| n.len() == count);
            has_tangents &= tangents.as_ref().is_some_and(|t| t.len() == count);

            for i in 0..count {
                let normal = normals.as_ref().and_then(|n| n.get(i)).copied().unwrap_or_default();
                let (tangent, bitangent) = match tangents.as_ref().and_then(|t| t.get(i)) {
                    Some(t) => {
                        let n = Vec3::from(normal);
                        let tv = Vec3::new(t[0], t[1], t[2]);
                        (tv.to_array(), (n.cross(tv) * t[3]).to_array())
                    }
                    None => ([0.0; 3], [0.0; 3]),
                };
                out.vertices.push(Vertex {
                    position: positions[i],
                    normal,
                    tangent,
                    bitangent,
                    texcoord: texcoords.get(i).copied().unwrap_or_default(),
                });
            }

            match reader.read_indices() {
                Some(indices) => {
                    let indices: Vec<u32> = indices.into_u32().collect();
                    out.indices
                        .extend(indices.chunks_exact(3).map(|t| [t[0] + base, t[1] + base, t[2] + base]));
                }
                None => {
                    out.indices.extend((0..count as u32 / 3).map(|t| {
                        let i = base + t * 3;
                        [i, i + 1, i + 2]
                    }));
                }
            }

            if out.textures == MaterialRefs::default() {
                out.textures = material_refs(&primitive.material(), base_dir);
            }
        }

        if out.vertices.is_empty() || out.indices.is_empty() {
            return Err(PbrError::asset("<gltf>", "mesh has no triangle data"));
        }

        if !has_normals {
            out.generate_normals();
        }
        if !has_tangents {
            out.generate_tangents();
        }
        Ok(out)
    }

    /// Builds a mesh from programmatic data; tangent frames are regenerated
    /// when all tangents are zero.
    #[must_use]
    pub fn from_parts(vertices: Vec<Vertex>, indices: Vec<[u32; 3]>) -> Self {
        let mut mesh = Self {
            vertices,
            indices,
            textures: MaterialRefs::default(),
        };
        if mesh.vertices.iter().all(|v| v.normal == [0.0; 3]) {
            mesh.generate_normals();
        }
        if mesh.vertices.iter().all(|v| v.tangent == [0.0; 3]) {
            mesh.generate_tangents();
        }
        mesh
    }

    /// Axis-aligned cube of half-extent 1 with outward faces, 24 vertices.
    #[must_use]
    pub fn cube() -> Self {
        // (normal, tangent) per face; bitangent = normal × tangent
        const FACES: [([f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0]),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(12);
        for (normal, tangent) in FACES {
            let n = Vec3::from(normal);
            let t = Vec3::from(tangent);
            let b = n.cross(t);
            let base = vertices.len() as u32;
            for (u, v) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
                let position = n + t * (u * 2.0 - 1.0) + b * (v * 2.0 - 1.0);
                vertices.push(Vertex {
                    position: position.to_array(),
                    normal,
                    tangent,
                    bitangent: b.to_array(),
                    texcoord: [u, v],
                });
            }
            indices.push([base, base + 1, base + 2]);
            indices.push([base, base + 2, base + 3]);
        }

        Self {
            vertices,
            indices,
            textures: MaterialRefs::default(),
        }
    }

    #[must_use]
    pub fn face_count(&self) -> usize {
        self.indices.len()
    }

    /// Largest vertex distance from the origin.
    #[must_use]
    pub fn bounding_radius(&self) -> f32 {
        self.vertices
            .iter()
            .map(|v| Vec3::from(v.position).length())
            .fold(0.0, f32::max)
    }

    fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let len = self.vertices.len();
        self.indices
            .iter()
            .map(|t| t.map(|i| i as usize))
            .filter(move |t| t.iter().all(|&i| i < len))
    }

    /// Area-weighted vertex normals.
    pub fn generate_normals(&mut self) {
        let mut accum = vec![Vec3::ZERO; self.vertices.len()];
        for [a, b, c] in self.triangles() {
            let p = |i: usize| Vec3::from(self.vertices[i].position);
            let face = (p(b) - p(a)).cross(p(c) - p(a));
            for i in [a, b, c] {
                accum[i] += face;
            }
        }
        for (vertex, n) in self.vertices.iter_mut().zip(accum) {
            vertex.normal = n.normalize_or(Vec3::Z).to_array();
        }
    }

    /// UV-derived tangents, Gram-Schmidt orthogonalized against the normal.
    pub fn generate_tangents(&mut self) {
        let mut tan = vec![Vec3::ZERO; self.vertices.len()];
        let mut bitan = vec![Vec3::ZERO; self.vertices.len()];

        for [a, b, c] in self.triangles() {
            let p = |i: usize| Vec3::from(self.vertices[i].position);
            let uv = |i: usize| Vec2::from(self.vertices[i].texcoord);
            let (e1, e2) = (p(b) - p(a), p(c) - p(a));
            let (d1, d2) = (uv(b) - uv(a), uv(c) - uv(a));
            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < f32::EPSILON {
                continue;
            }
            let r = 1.0 / det;
            let t = (e1 * d2.y - e2 * d1.y) * r;
            let bt = (e2 * d1.x - e1 * d2.x) * r;
            for i in [a, b, c] {
                tan[i] += t;
                bitan[i] += bt;
            }
        }

        for (i, vertex) in self.vertices.iter_mut().enumerate() {
            let n = Vec3::from(vertex.normal);
            let t = (tan[i] - n * n.dot(tan[i])).try_normalize().unwrap_or_else(|| n.any_orthonormal_vector());
            let w = if n.cross(t).dot(bitan[i]) < 0.0 { -1.0 } else { 1.0 };
            vertex.tangent = t.to_array();
            vertex.bitangent = (n.cross(t) * w).to_array();
        }
    }
}

fn texture_path(texture: &gltf::Texture, base_dir: Option<&Path>) -> Option<PathBuf> {
    match texture.source().source() {
        gltf::image::Source::Uri { uri, .. } if !uri.starts_with("data:") => {
            Some(base_dir.map_or_else(|| PathBuf::from(uri), |dir| dir.join(uri)))
        }
        _ => {
            log::debug!("Embedded texture images are not supported, using defaults");
            None
        }
    }
}

fn material_refs(material: &gltf::Material, base_dir: Option<&Path>) -> MaterialRefs {
    let pbr = material.pbr_metallic_roughness();
    let albedo = pbr
        .base_color_texture()
        .and_then(|info| texture_path(&info.texture(), base_dir))
        .map(TextureRef::new);
    let normals = material
        .normal_texture()
        .and_then(|info| texture_path(&info.texture(), base_dir))
        .map(TextureRef::new);
    // glTF packs metalness in blue and roughness in green.
    let packed = pbr
        .metallic_roughness_texture()
        .and_then(|info| texture_path(&info.texture(), base_dir));

    MaterialRefs {
        albedo,
        normals,
        metalness: packed.clone().map(|p| TextureRef::new(p).with_channel(2)),
        roughness: packed.map(|p| TextureRef::new(p).with_channel(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_fourteen_floats() {
        assert_eq!(size_of::<Vertex>(), 56);
    }

    #[test]
    fn cube_faces_point_outward() {
        let cube = Mesh::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.face_count(), 12);
        for [a, b, c] in &cube.indices {
            let p = |i: &u32| Vec3::from(cube.vertices[*i as usize].position);
            let face = (p(b) - p(a)).cross(p(c) - p(a));
            let centroid = (p(a) + p(b) + p(c)) / 3.0;
            assert!(face.dot(centroid) > 0.0, "inward face {a},{b},{c}");
        }
        assert!((cube.bounding_radius() - 3f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn from_parts_generates_tangent_frame() {
        let v = |p: [f32; 3], uv: [f32; 2]| Vertex {
            position: p,
            texcoord: uv,
            ..Default::default()
        };
        let mesh = Mesh::from_parts(
            vec![v([0.0, 0.0, 0.0], [0.0, 0.0]), v([1.0, 0.0, 0.0], [1.0, 0.0]), v([0.0, 1.0, 0.0], [0.0, 1.0])],
            vec![[0, 1, 2]],
        );
        for vertex in &mesh.vertices {
            assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
            assert!((Vec3::from(vertex.tangent) - Vec3::X).length() < 1e-6);
            assert!((Vec3::from(vertex.bitangent) - Vec3::Y).length() < 1e-6);
        }
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Mesh::from_slice(b"not a gltf", None).is_err());
        assert!(matches!(
            Mesh::from_file("definitely/not/here.glb"),
            Err(PbrError::AssetLoad { .. })
        ));
    }
}
