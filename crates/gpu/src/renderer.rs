use sphere::{CellQuad, TemplateMesh};

use crate::texture::DecodedImage;

/// Index of a per-cell material in the sphere model (`cell - lat_bands`).
pub type MaterialSlot = usize;

/// Rendering backend capability driven by the capture core.
///
/// All methods are called from the render loop's thread only. Texture
/// resources belong to the backend; the core only decides when a slot's
/// texture is released and what replaces it.
pub trait Renderer {
    /// Interleaved vertex buffer of the template sphere the grid is cut from.
    fn template_mesh(&mut self, lat_bands: u32, lon_bands: u32) -> TemplateMesh;

    /// Builds one textured quad per cell, slot `i` for `quads[i]`, each
    /// starting with `placeholder`. Rebuilding releases the previous model.
    fn build_cell_materials(&mut self, quads: &[CellQuad], placeholder: &DecodedImage);

    /// Installs a texture into an empty slot.
    fn install_texture(&mut self, slot: MaterialSlot, image: &DecodedImage);

    /// Releases the slot's current texture.
    fn release_texture(&mut self, slot: MaterialSlot);
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn template_mesh(&mut self, lat_bands: u32, lon_bands: u32) -> TemplateMesh {
        (**self).template_mesh(lat_bands, lon_bands)
    }

    fn build_cell_materials(&mut self, quads: &[CellQuad], placeholder: &DecodedImage) {
        (**self).build_cell_materials(quads, placeholder)
    }

    fn install_texture(&mut self, slot: MaterialSlot, image: &DecodedImage) {
        (**self).install_texture(slot, image)
    }

    fn release_texture(&mut self, slot: MaterialSlot) {
        (**self).release_texture(slot)
    }
}
