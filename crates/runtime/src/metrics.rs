use std::collections::BTreeMap;

use serde::Serialize;

/// Session counters, gauges and frame-count histograms.
///
/// Keys are static metric names such as `captures.requested`. Sorted maps keep
/// the serialized form stable from run to run.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Metrics {
    counters: BTreeMap<&'static str, u64>,
    gauges: BTreeMap<&'static str, i64>,
    histograms: BTreeMap<&'static str, Histogram>,
}

/// Summary of non-negative samples, e.g. frames between capture request and
/// delivery.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Histogram {
    pub count: u64,
    pub sum: u64,
    pub min: u64,
    pub max: u64,
}

impl Histogram {
    pub fn record(&mut self, value: u64) {
        self.min = if self.count == 0 {
            value
        } else {
            self.min.min(value)
        };
        self.max = self.max.max(value);
        self.count += 1;
        self.sum = self.sum.saturating_add(value);
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64 / self.count as f64)
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr(&mut self, name: &'static str) {
        *self.counters.entry(name).or_default() += 1;
    }

    /// Zero for counters never incremented.
    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn set_gauge(&mut self, name: &'static str, value: i64) {
        self.gauges.insert(name, value);
    }

    pub fn gauge(&self, name: &str) -> Option<i64> {
        self.gauges.get(name).copied()
    }

    pub fn record(&mut self, name: &'static str, value: u64) {
        self.histograms.entry(name).or_default().record(value);
    }

    pub fn histogram(&self, name: &str) -> Option<Histogram> {
        self.histograms.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::{Histogram, Metrics};
    use pretty_assertions::assert_eq;

    #[test]
    fn counters_start_at_zero() {
        let mut m = Metrics::new();
        assert_eq!(m.counter("captures.requested"), 0);
        m.incr("captures.requested");
        m.incr("captures.requested");
        assert_eq!(m.counter("captures.requested"), 2);
    }

    #[test]
    fn captured_gauge_tracks_latest_value() {
        let mut m = Metrics::new();
        assert_eq!(m.gauge("cells.captured"), None);
        m.set_gauge("cells.captured", 10);
        m.set_gauge("cells.captured", 11);
        assert_eq!(m.gauge("cells.captured"), Some(11));
    }

    #[test]
    fn latency_histogram() {
        let mut m = Metrics::new();
        for frames in [3, 1, 8] {
            m.record("capture.latency_frames", frames);
        }
        let h = m.histogram("capture.latency_frames").expect("recorded");
        assert_eq!(
            h,
            Histogram {
                count: 3,
                sum: 12,
                min: 1,
                max: 8,
            }
        );
        assert_eq!(h.mean(), Some(4.0));
        assert_eq!(Histogram::default().mean(), None);
    }

    #[test]
    fn serializes_in_key_order() {
        let mut m = Metrics::new();
        m.incr("textures.installed");
        m.incr("captures.failed");
        m.record("capture.latency_frames", 2);

        let json = serde_json::to_value(&m).expect("serialize");
        let counters: Vec<&str> = json["counters"]
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(counters, vec!["captures.failed", "textures.installed"]);
        assert_eq!(json["histograms"]["capture.latency_frames"]["max"], 2);
    }
}
