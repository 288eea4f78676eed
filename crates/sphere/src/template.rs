use foundation::math::Mat4;

/// Floats per interleaved vertex: position (3), normal (3), uv (2).
pub const FLOATS_PER_VERTEX: usize = 8;

/// Interleaved vertex buffer of a template sphere, as a rendering backend
/// hands it out at model-build time.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMesh {
    pub vertices: Vec<f32>,
    /// Floats per vertex. Position is always the first three.
    pub stride: usize,
    pub world_transform: Mat4,
}

impl TemplateMesh {
    pub fn new(vertices: Vec<f32>, stride: usize) -> Self {
        Self {
            vertices,
            stride,
            world_transform: Mat4::identity(),
        }
    }

    pub fn with_transform(mut self, world_transform: Mat4) -> Self {
        self.world_transform = world_transform;
        self
    }

    /// Builds a UV sphere centred on the origin.
    ///
    /// Layout: `lon_bands + 1` rings from the +Y pole to the -Y pole, each with
    /// `lat_bands + 1` vertices around the Y axis. The last vertex of every ring
    /// duplicates the first one (azimuth 2π), and the two pole rings collapse to
    /// a single point. The vertex of ring `v`, column `u` sits at index
    /// `v * (lat_bands + 1) + u`.
    pub fn uv_sphere(diameter: f32, lat_bands: u32, lon_bands: u32) -> Self {
        let lat_bands = lat_bands.max(1);
        let lon_bands = lon_bands.max(1);
        let r = diameter * 0.5;
        let step_u = std::f32::consts::TAU / lat_bands as f32;
        let step_v = std::f32::consts::PI / lon_bands as f32;
        let us = 1.0 / lat_bands as f32;
        let vs = 1.0 / lon_bands as f32;

        let count = ((lat_bands + 1) * (lon_bands + 1)) as usize;
        let mut vertices = Vec::with_capacity(count * FLOATS_PER_VERTEX);

        for iv in 0..=lon_bands {
            let angle_v = step_v * iv as f32;
            let t = angle_v.sin();
            let h = angle_v.cos() * r;
            let pole = iv == 0 || iv == lon_bands;
            for iu in 0..=lat_bands {
                let angle_u = step_u * iu as f32;
                let x = angle_u.cos() * r * t;
                let z = angle_u.sin() * r * t;
                let len = (x * x + h * h + z * z).sqrt();
                let (nx, ny, nz) = if len > 0.0 {
                    (x / len, h / len, z / len)
                } else {
                    (0.0, 1.0, 0.0)
                };
                let u = if pole {
                    1.0 - us * (iu as f32 - 0.5)
                } else {
                    1.0 - us * iu as f32
                };
                let v = vs * iv as f32;
                vertices.extend_from_slice(&[x, h, z, nx, ny, nz, u, v]);
            }
        }

        Self::new(vertices, FLOATS_PER_VERTEX)
    }

    pub fn vertex_count(&self) -> usize {
        if self.stride == 0 {
            return 0;
        }
        self.vertices.len() / self.stride
    }
}
