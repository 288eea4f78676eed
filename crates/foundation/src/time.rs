/// Engine time in seconds.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct Time(pub f64);

impl Time {
    pub fn seconds(self) -> f64 {
        self.0
    }

    pub fn elapsed_since(self, earlier: Time) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }
}
