use std::collections::{BTreeMap, BTreeSet};

use foundation::CellId;
use foundation::math::Vec3;
use tracing::debug;

use crate::geometry::{GeometryError, extract_vertices};
use crate::template::TemplateMesh;

/// Highest valid cell id: all rows times columns, minus the last row, plus
/// half a row where the column index wraps.
pub fn max_cell_id(lat_bands: u32, lon_bands: u32) -> u32 {
    lat_bands
        .saturating_mul(lon_bands)
        .saturating_sub(lat_bands)
        .saturating_add(lat_bands / 2)
}

/// Addressable cells of a `lat_bands` x `lon_bands` tessellation.
///
/// The range `[lat_bands, max_cell_id]` skips the degenerate pole row. It
/// still contains the seam cells; see [`seam_cell_ids`].
pub fn compute_valid_cell_ids(lat_bands: u32, lon_bands: u32) -> BTreeSet<CellId> {
    (lat_bands..=max_cell_id(lat_bands, lon_bands))
        .map(CellId)
        .collect()
}

/// Cells whose `i + 1` corner wraps onto the first column of the next ring.
///
/// With a row stride of `lat_bands + 1` these are `k * (lat_bands + 1) + lat_bands`.
/// For a 10 x 7 sphere: `{10, 21, 32, 43, 54, 65}`.
pub fn seam_cell_ids(lat_bands: u32, lon_bands: u32) -> BTreeSet<CellId> {
    let max = max_cell_id(lat_bands, lon_bands);
    let stride = lat_bands + 1;
    (0..)
        .map(|k: u32| k * stride + lat_bands)
        .take_while(|id| *id <= max)
        .filter(|id| *id >= lat_bands)
        .map(CellId)
        .collect()
}

/// Vertex indices of a cell's four corners, in quad winding order:
/// `i + L + 1`, `i + L + 2`, `i + 1`, `i`.
pub fn corner_indices(cell: CellId, lat_bands: u32) -> [usize; 4] {
    let i = cell.index();
    let l = lat_bands as usize;
    [i + l + 1, i + l + 2, i + 1, i]
}

fn corners(
    vertices: &[Vec3],
    cell: CellId,
    lat_bands: u32,
) -> Result<[Vec3; 4], GeometryError> {
    let idx = corner_indices(cell, lat_bands);
    let mut out = [Vec3::ZERO; 4];
    for (slot, vertex) in out.iter_mut().zip(idx) {
        *slot = *vertices.get(vertex).ok_or(GeometryError::MissingCorner {
            cell,
            vertex,
            available: vertices.len(),
        })?;
    }
    Ok(out)
}

/// Summed midpoints of the two opposite edges of a cell.
///
/// This is twice the geometric centroid. Targeting thresholds were tuned
/// against this scale, so it must not be halved.
pub fn cell_center(quad: &[Vec3; 4]) -> Vec3 {
    let [a, b, c, d] = *quad;
    Vec3::new(
        (a.x + b.x) / 2.0 + (c.x + d.x) / 2.0,
        (a.y + b.y) / 2.0 + (c.y + d.y) / 2.0,
        (a.z + b.z) / 2.0 + (c.z + d.z) / 2.0,
    )
}

pub fn compute_cell_centers(
    vertices: &[Vec3],
    valid_ids: &BTreeSet<CellId>,
    lat_bands: u32,
) -> Result<BTreeMap<CellId, Vec3>, GeometryError> {
    valid_ids
        .iter()
        .map(|&cell| Ok((cell, cell_center(&corners(vertices, cell, lat_bands)?))))
        .collect()
}

/// Four world-space corners of one cell, for per-cell material building.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CellQuad {
    pub cell: CellId,
    pub corners: [Vec3; 4],
}

/// Immutable grid data for one sphere model.
#[derive(Debug, Clone)]
pub struct SphereGrid {
    lat_bands: u32,
    lon_bands: u32,
    valid: BTreeSet<CellId>,
    seams: BTreeSet<CellId>,
    centers: BTreeMap<CellId, Vec3>,
    quads: Vec<CellQuad>,
}

impl SphereGrid {
    pub fn build(
        vertices: &[Vec3],
        lat_bands: u32,
        lon_bands: u32,
    ) -> Result<Self, GeometryError> {
        if lat_bands < 2 || lon_bands < 2 {
            return Err(GeometryError::InvalidTessellation {
                lat_bands,
                lon_bands,
            });
        }

        let valid = compute_valid_cell_ids(lat_bands, lon_bands);
        let seams = seam_cell_ids(lat_bands, lon_bands);
        let quads = valid
            .iter()
            .map(|&cell| {
                Ok(CellQuad {
                    cell,
                    corners: corners(vertices, cell, lat_bands)?,
                })
            })
            .collect::<Result<Vec<_>, GeometryError>>()?;
        let centers = quads
            .iter()
            .map(|q| (q.cell, cell_center(&q.corners)))
            .collect();

        debug!(
            lat_bands,
            lon_bands,
            cells = valid.len(),
            seams = seams.len(),
            "sphere grid built"
        );

        Ok(Self {
            lat_bands,
            lon_bands,
            valid,
            seams,
            centers,
            quads,
        })
    }

    pub fn from_mesh(
        mesh: &TemplateMesh,
        lat_bands: u32,
        lon_bands: u32,
    ) -> Result<Self, GeometryError> {
        let vertices = extract_vertices(mesh)?;
        Self::build(&vertices, lat_bands, lon_bands)
    }

    pub fn lat_bands(&self) -> u32 {
        self.lat_bands
    }

    pub fn lon_bands(&self) -> u32 {
        self.lon_bands
    }

    pub fn cell_ids(&self) -> &BTreeSet<CellId> {
        &self.valid
    }

    pub fn seam_ids(&self) -> &BTreeSet<CellId> {
        &self.seams
    }

    pub fn centers(&self) -> &BTreeMap<CellId, Vec3> {
        &self.centers
    }

    pub fn quads(&self) -> &[CellQuad] {
        &self.quads
    }

    pub fn cell_count(&self) -> usize {
        self.valid.len()
    }

    pub fn contains(&self, cell: CellId) -> bool {
        self.valid.contains(&cell)
    }

    pub fn is_seam(&self, cell: CellId) -> bool {
        self.seams.contains(&cell)
    }

    pub fn center(&self, cell: CellId) -> Option<Vec3> {
        self.centers.get(&cell).copied()
    }

    /// Renderer material slot of a cell (`cell - lat_bands`).
    pub fn material_slot(&self, cell: CellId) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        Some((cell.get() - self.lat_bands) as usize)
    }

    pub fn cell_for_slot(&self, slot: usize) -> Option<CellId> {
        let cell = CellId(u32::try_from(slot).ok()?.checked_add(self.lat_bands)?);
        self.contains(cell).then_some(cell)
    }
}
