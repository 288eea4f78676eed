use foundation::CellId;
use foundation::math::Vec3;

use crate::template::TemplateMesh;

/// Malformed template mesh or tessellation. Fatal for model build.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    InvalidTessellation { lat_bands: u32, lon_bands: u32 },
    InvalidStride { stride: usize },
    RaggedBuffer { len: usize, stride: usize },
    EmptyMesh,
    NonFiniteVertex { index: usize },
    MissingCorner {
        cell: CellId,
        vertex: usize,
        available: usize,
    },
}

impl std::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeometryError::InvalidTessellation {
                lat_bands,
                lon_bands,
            } => write!(
                f,
                "invalid tessellation: lat_bands={lat_bands} lon_bands={lon_bands} (need >= 2 each)"
            ),
            GeometryError::InvalidStride { stride } => {
                write!(f, "vertex stride {stride} cannot hold a position")
            }
            GeometryError::RaggedBuffer { len, stride } => {
                write!(f, "vertex buffer of {len} floats is not a multiple of stride {stride}")
            }
            GeometryError::EmptyMesh => write!(f, "template mesh has no vertices"),
            GeometryError::NonFiniteVertex { index } => {
                write!(f, "vertex {index} has a non-finite coordinate")
            }
            GeometryError::MissingCorner {
                cell,
                vertex,
                available,
            } => write!(
                f,
                "{cell} needs corner vertex {vertex} but the mesh only has {available}"
            ),
        }
    }
}

impl std::error::Error for GeometryError {}

/// Extracts world-space vertex positions from an interleaved template mesh.
pub fn extract_vertices(mesh: &TemplateMesh) -> Result<Vec<Vec3>, GeometryError> {
    if mesh.stride < 3 {
        return Err(GeometryError::InvalidStride {
            stride: mesh.stride,
        });
    }
    if mesh.vertices.is_empty() {
        return Err(GeometryError::EmptyMesh);
    }
    if mesh.vertices.len() % mesh.stride != 0 {
        return Err(GeometryError::RaggedBuffer {
            len: mesh.vertices.len(),
            stride: mesh.stride,
        });
    }

    mesh.vertices
        .chunks_exact(mesh.stride)
        .enumerate()
        .map(|(index, v)| {
            let local = Vec3::from_f32(v[0], v[1], v[2]);
            let world = mesh.world_transform.transform_point(local);
            if world.is_finite() {
                Ok(world)
            } else {
                Err(GeometryError::NonFiniteVertex { index })
            }
        })
        .collect()
}
