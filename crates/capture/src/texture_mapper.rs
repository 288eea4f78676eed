use foundation::CellId;
use gpu::{DecodedImage, MaterialSlot, Renderer};
use sphere::SphereGrid;
use tracing::{debug, warn};

use crate::error::TextureError;

/// Installs captured images as cell textures.
///
/// Every install is a swap on the render thread: the slot's current texture
/// is released, then the replacement is installed, so a slot never holds two
/// live textures.
#[derive(Debug, Clone)]
pub struct TextureMapper {
    max_texture_dim: u32,
    placeholder: DecodedImage,
}

impl TextureMapper {
    pub fn new(max_texture_dim: u32) -> Self {
        Self {
            max_texture_dim,
            placeholder: DecodedImage::placeholder(),
        }
    }

    pub fn placeholder(&self) -> &DecodedImage {
        &self.placeholder
    }

    /// Builds the per-cell model with a placeholder on every cell.
    pub fn build_model<R: Renderer>(&self, renderer: &mut R, grid: &SphereGrid) {
        renderer.build_cell_materials(grid.quads(), &self.placeholder);
    }

    /// Decodes `bytes` and makes it the texture of `cell`.
    ///
    /// Undecodable bytes put the placeholder on the cell and return
    /// [`TextureError::Decode`]; the model stays usable either way.
    pub fn install_texture<R: Renderer>(
        &self,
        renderer: &mut R,
        grid: &SphereGrid,
        cell: CellId,
        bytes: &[u8],
    ) -> Result<MaterialSlot, TextureError> {
        let slot = grid
            .material_slot(cell)
            .ok_or(TextureError::UnknownCell(cell))?;

        match DecodedImage::decode(bytes) {
            Ok(image) => {
                let image = image.fit_within(self.max_texture_dim);
                debug!(%cell, slot, width = image.width(), height = image.height(), "installing texture");
                swap(renderer, slot, &image);
                Ok(slot)
            }
            Err(source) => {
                warn!(%cell, slot, "texture load failed, installing placeholder: {source}");
                swap(renderer, slot, &self.placeholder);
                Err(TextureError::Decode { cell, source })
            }
        }
    }

    /// Puts the placeholder back on `cell`.
    pub fn clear_texture<R: Renderer>(
        &self,
        renderer: &mut R,
        grid: &SphereGrid,
        cell: CellId,
    ) -> Result<MaterialSlot, TextureError> {
        let slot = grid
            .material_slot(cell)
            .ok_or(TextureError::UnknownCell(cell))?;
        swap(renderer, slot, &self.placeholder);
        Ok(slot)
    }
}

fn swap<R: Renderer>(renderer: &mut R, slot: MaterialSlot, image: &DecodedImage) {
    renderer.release_texture(slot);
    renderer.install_texture(slot, image);
}
