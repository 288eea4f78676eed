use sphere::{CellQuad, TemplateMesh};
use tracing::error;

use crate::renderer::{MaterialSlot, Renderer};
use crate::texture::DecodedImage;

/// Handle of one backend texture allocation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(pub u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LiveTexture {
    pub id: TextureId,
    pub width: u32,
    pub height: u32,
    pub placeholder: bool,
}

/// What the backend was asked to do, in order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RenderCommand {
    BuildModel { cells: usize },
    Install { slot: MaterialSlot, texture: TextureId },
    Release { slot: MaterialSlot, texture: TextureId },
}

/// Renderer without a GPU: keeps texture bookkeeping only.
///
/// Tracks every live texture per slot so tests can check that each swap
/// releases its predecessor exactly once. Installing over a live texture or
/// releasing an empty slot is a programming error (debug assertion).
#[derive(Debug)]
pub struct HeadlessRenderer {
    diameter: f32,
    next_texture: u64,
    slots: Vec<Option<LiveTexture>>,
    release_counts: Vec<u32>,
    commands: Vec<RenderCommand>,
    violations: u32,
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new(4.0)
    }
}

impl HeadlessRenderer {
    pub fn new(diameter: f32) -> Self {
        Self {
            diameter,
            next_texture: 0,
            slots: Vec::new(),
            release_counts: Vec::new(),
            commands: Vec::new(),
            violations: 0,
        }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn texture(&self, slot: MaterialSlot) -> Option<LiveTexture> {
        self.slots.get(slot).copied().flatten()
    }

    pub fn live_textures(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn release_count(&self, slot: MaterialSlot) -> u32 {
        self.release_counts.get(slot).copied().unwrap_or(0)
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Installs over live textures plus releases of empty slots.
    pub fn violations(&self) -> u32 {
        self.violations
    }

    fn allocate(&mut self, image: &DecodedImage) -> LiveTexture {
        let id = TextureId(self.next_texture);
        self.next_texture += 1;
        LiveTexture {
            id,
            width: image.width(),
            height: image.height(),
            placeholder: image.is_placeholder(),
        }
    }

    fn violation(&mut self, what: &str, slot: MaterialSlot) {
        self.violations += 1;
        error!(slot, "texture lifetime violation: {what}");
        debug_assert!(false, "texture lifetime violation: {what} (slot {slot})");
    }
}

impl Renderer for HeadlessRenderer {
    fn template_mesh(&mut self, lat_bands: u32, lon_bands: u32) -> TemplateMesh {
        TemplateMesh::uv_sphere(self.diameter, lat_bands, lon_bands)
    }

    fn build_cell_materials(&mut self, quads: &[CellQuad], placeholder: &DecodedImage) {
        for slot in 0..self.slots.len() {
            if self.slots[slot].is_some() {
                self.release_texture(slot);
            }
        }
        self.slots = vec![None; quads.len()];
        self.release_counts = vec![0; quads.len()];
        self.commands.push(RenderCommand::BuildModel { cells: quads.len() });
        for slot in 0..quads.len() {
            self.install_texture(slot, placeholder);
        }
    }

    fn install_texture(&mut self, slot: MaterialSlot, image: &DecodedImage) {
        if slot >= self.slots.len() {
            self.violation("install into unknown slot", slot);
            return;
        }
        if self.slots[slot].is_some() {
            self.violation("install over a live texture", slot);
        }
        let tex = self.allocate(image);
        self.slots[slot] = Some(tex);
        self.commands.push(RenderCommand::Install {
            slot,
            texture: tex.id,
        });
    }

    fn release_texture(&mut self, slot: MaterialSlot) {
        match self.slots.get_mut(slot).and_then(Option::take) {
            Some(tex) => {
                self.release_counts[slot] += 1;
                self.commands.push(RenderCommand::Release {
                    slot,
                    texture: tex.id,
                });
            }
            None => self.violation("release of an empty slot", slot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{HeadlessRenderer, RenderCommand, TextureId};
    use crate::renderer::Renderer;
    use crate::texture::DecodedImage;
    use crate::texture::tests::png_bytes;
    use foundation::CellId;
    use foundation::math::Vec3;
    use pretty_assertions::assert_eq;
    use sphere::CellQuad;

    fn quads(n: u32) -> Vec<CellQuad> {
        (0..n)
            .map(|i| CellQuad {
                cell: CellId(10 + i),
                corners: [Vec3::ZERO; 4],
            })
            .collect()
    }

    #[test]
    fn build_installs_one_placeholder_per_slot() {
        let mut r = HeadlessRenderer::default();
        r.build_cell_materials(&quads(3), &DecodedImage::placeholder());
        assert_eq!(r.slot_count(), 3);
        assert_eq!(r.live_textures(), 3);
        assert!(r.texture(1).expect("live").placeholder);
    }

    #[test]
    fn swap_releases_predecessor_once() {
        let mut r = HeadlessRenderer::default();
        r.build_cell_materials(&quads(2), &DecodedImage::placeholder());
        let photo = DecodedImage::decode(&png_bytes(4, 4, [1, 2, 3, 255])).expect("decode");

        r.release_texture(1);
        r.install_texture(1, &photo);

        assert_eq!(r.release_count(1), 1);
        assert_eq!(r.release_count(0), 0);
        assert_eq!(r.live_textures(), 2);
        let live = r.texture(1).expect("live");
        assert!(!live.placeholder);
        assert_eq!(live.id, TextureId(2));
        assert_eq!(
            &r.commands()[r.commands().len() - 2..],
            &[
                RenderCommand::Release {
                    slot: 1,
                    texture: TextureId(1)
                },
                RenderCommand::Install {
                    slot: 1,
                    texture: TextureId(2)
                },
            ]
        );
        assert_eq!(r.violations(), 0);
    }

    #[test]
    fn rebuild_releases_previous_model() {
        let mut r = HeadlessRenderer::default();
        r.build_cell_materials(&quads(2), &DecodedImage::placeholder());
        r.build_cell_materials(&quads(3), &DecodedImage::placeholder());
        assert_eq!(r.live_textures(), 3);
        let releases = r
            .commands()
            .iter()
            .filter(|c| matches!(c, RenderCommand::Release { .. }))
            .count();
        assert_eq!(releases, 2);
    }

    #[test]
    fn template_mesh_uses_configured_diameter() {
        let mut r = HeadlessRenderer::new(2.0);
        let mesh = r.template_mesh(4, 3);
        assert_eq!(mesh.vertex_count(), 5 * 4);
        // North pole at +radius.
        assert!((mesh.vertices[1] - 1.0).abs() < 1e-6);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "install over a live texture")]
    fn installing_without_release_is_caught() {
        let mut r = HeadlessRenderer::default();
        r.build_cell_materials(&quads(1), &DecodedImage::placeholder());
        r.install_texture(0, &DecodedImage::placeholder());
    }
}
