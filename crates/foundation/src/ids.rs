use serde::{Deserialize, Serialize};

/// Address of one rectangular patch of the sphere grid.
///
/// Ids live in the 1-D vertex-index space of the template tessellation, so the
/// valid set starts past the first ring and stops short of the last.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CellId(pub u32);

impl CellId {
    pub fn new(n: u32) -> Self {
        CellId(n)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}
