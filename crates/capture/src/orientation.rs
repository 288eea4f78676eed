use foundation::math::{Mat4, Vec3};

/// Camera pose derived from the device's rotation sensor.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewPose {
    pub direction: Vec3,
    pub up: Vec3,
}

/// Maps a device rotation matrix (column-major, as reported by the rotation
/// vector sensor) to the sphere camera's view direction and up vector.
///
/// The back camera looks along the device's negative Z axis; the sphere's Y
/// axis points to the sky, so axes are permuted `(x, y, z) -> (y, z, x)`.
pub fn view_from_rotation_matrix(values: &[f32; 16]) -> ViewPose {
    let m = Mat4::from_f32_cols(values);
    ViewPose {
        direction: Vec3::new(-m.at(2, 1), -m.at(2, 2), -m.at(2, 0)),
        up: Vec3::new(m.at(0, 1), m.at(0, 2), m.at(0, 0)),
    }
}

#[cfg(test)]
mod tests {
    use super::view_from_rotation_matrix;
    use foundation::math::Vec3;

    #[rustfmt::skip]
    const IDENTITY: [f32; 16] = [
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    ];

    #[test]
    fn device_lying_flat_looks_at_the_floor() {
        let pose = view_from_rotation_matrix(&IDENTITY);
        assert_eq!(pose.direction, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(pose.up, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn upright_device_looks_at_the_horizon() {
        // Device held upright: rotated +90 degrees about X.
        #[rustfmt::skip]
        let upright: [f32; 16] = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, -1.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        let pose = view_from_rotation_matrix(&upright);
        assert_eq!(pose.direction.y, 0.0);
        assert!((pose.direction.length() - 1.0).abs() < 1e-9);
    }
}
