use std::collections::{BTreeMap, BTreeSet};

use foundation::CellId;
use foundation::math::Vec3;

use crate::grid::SphereGrid;

/// Half-width of the band every cross-product component must fall inside for
/// a direction to count as pointing at a cell center. Tuned against the
/// summed-midpoint center scale, not derived from cell size.
pub const DEFAULT_COLLINEARITY_TOLERANCE: f64 = 0.3;

/// `true` when `a` and `b` do not point into opposite half-spaces on any axis.
#[inline]
pub fn same_octant(a: Vec3, b: Vec3) -> bool {
    a.x * b.x >= 0.0 && a.y * b.y >= 0.0 && a.z * b.z >= 0.0
}

#[inline]
pub fn is_collinear(direction: Vec3, center: Vec3, tolerance: f64) -> bool {
    let c = direction.cross(center);
    let within = |v: f64| v < tolerance && v > -tolerance;
    within(c.x) && within(c.y) && within(c.z)
}

/// Finds the cell the viewing direction points at.
///
/// Cells are scanned in ascending id order and the first collinear,
/// same-octant center wins. Seam cells never match; a collinear seam is
/// skipped and the scan goes on to the next candidate.
pub fn locate(
    direction: Vec3,
    centers: &BTreeMap<CellId, Vec3>,
    seams: &BTreeSet<CellId>,
    tolerance: f64,
) -> Option<CellId> {
    centers
        .iter()
        .filter(|(_, center)| same_octant(direction, **center))
        .filter(|(_, center)| is_collinear(direction, **center, tolerance))
        .map(|(cell, _)| *cell)
        .find(|cell| !seams.contains(cell))
}

/// Per-frame locator bound to one sphere grid.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CellLocator {
    pub tolerance: f64,
}

impl Default for CellLocator {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_COLLINEARITY_TOLERANCE,
        }
    }
}

impl CellLocator {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn locate(&self, grid: &SphereGrid, direction: Vec3) -> Option<CellId> {
        locate(direction, grid.centers(), grid.seam_ids(), self.tolerance)
    }
}
