use super::Vec3;

/// 4x4 matrix stored column-major (`m[col * 4 + row]`), the layout GL-style
/// backends and device rotation sensors hand out.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mat4 {
    pub m: [f64; 16],
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mat4 {
    pub fn identity() -> Self {
        let mut m = [0.0; 16];
        m[0] = 1.0;
        m[5] = 1.0;
        m[10] = 1.0;
        m[15] = 1.0;
        Self { m }
    }

    pub fn from_cols_array(m: [f64; 16]) -> Self {
        Self { m }
    }

    pub fn from_f32_cols(values: &[f32; 16]) -> Self {
        let mut m = [0.0; 16];
        for (dst, src) in m.iter_mut().zip(values) {
            *dst = *src as f64;
        }
        Self { m }
    }

    pub fn translation(t: Vec3) -> Self {
        let mut out = Self::identity();
        out.m[12] = t.x;
        out.m[13] = t.y;
        out.m[14] = t.z;
        out
    }

    pub fn scale(s: f64) -> Self {
        let mut out = Self::identity();
        out.m[0] = s;
        out.m[5] = s;
        out.m[10] = s;
        out
    }

    #[inline]
    pub fn at(&self, row: usize, col: usize) -> f64 {
        self.m[col * 4 + row]
    }

    /// Affine point transform (projective row ignored).
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        Vec3::new(
            self.at(0, 0) * p.x + self.at(0, 1) * p.y + self.at(0, 2) * p.z + self.at(0, 3),
            self.at(1, 0) * p.x + self.at(1, 1) * p.y + self.at(1, 2) * p.z + self.at(1, 3),
            self.at(2, 0) * p.x + self.at(2, 1) * p.y + self.at(2, 2) * p.z + self.at(2, 3),
        )
    }
}
