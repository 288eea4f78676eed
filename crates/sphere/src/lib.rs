//! Sphere-grid geometry: template mesh, cell addressing and view targeting.

pub mod geometry;
pub mod grid;
pub mod locator;
pub mod stability;
pub mod template;

pub use geometry::*;
pub use grid::*;
pub use locator::*;
pub use stability::*;
pub use template::*;
