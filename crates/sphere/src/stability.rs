use foundation::math::Vec3;

/// Per-axis movement allowed between two decimated samples.
pub const DEFAULT_STEADY_TOLERANCE: f64 = 0.003;

/// Frames between refreshes of the previous direction sample.
pub const DEFAULT_SAMPLE_INTERVAL: u32 = 10;

/// Steady unless some axis moved past `previous ± tolerance`.
pub fn is_steady(previous: Vec3, current: Vec3, tolerance: f64) -> bool {
    let moved = |c: f64, p: f64| c > p + tolerance || c < p - tolerance;
    !(moved(current.x, previous.x) || moved(current.y, previous.y) || moved(current.z, previous.z))
}

/// Single decimated direction sample used to detect motion.
///
/// Comparing against a sample that is only refreshed every `interval` frames
/// filters per-frame jitter; slow constant panning still registers as motion.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DirectionHistory {
    previous: Vec3,
    frames: u32,
    interval: u32,
}

impl Default for DirectionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_INTERVAL)
    }
}

impl DirectionHistory {
    pub fn new(interval: u32) -> Self {
        Self {
            previous: Vec3::ZERO,
            frames: 0,
            interval,
        }
    }

    pub fn previous(&self) -> Vec3 {
        self.previous
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn is_steady(&self, current: Vec3, tolerance: f64) -> bool {
        is_steady(self.previous, current, tolerance)
    }

    /// Called once per frame after targeting. Returns `true` when the stored
    /// sample was replaced by `current`.
    pub fn observe(&mut self, current: Vec3) -> bool {
        let refreshed = self.frames >= self.interval;
        if refreshed {
            self.previous = current;
            self.frames = 0;
        }
        self.frames += 1;
        refreshed
    }

    pub fn reset(&mut self) {
        self.previous = Vec3::ZERO;
        self.frames = 0;
    }
}
