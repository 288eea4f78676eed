use std::collections::VecDeque;

use serde::Serialize;

use crate::frame::Frame;

/// An event stamped with the frame it was emitted in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event<E> {
    pub frame_index: u64,
    pub payload: E,
}

/// Append-only, frame-ordered event log.
///
/// Owned by the render loop; nothing else writes to it, so event order is the
/// order decisions were taken in.
#[derive(Debug)]
pub struct EventBus<E> {
    events: VecDeque<Event<E>>,
    capacity: Option<usize>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            events: VecDeque::new(),
            capacity: None,
        }
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most `capacity` events, dropping the oldest first.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: Some(capacity),
        }
    }

    pub fn emit(&mut self, frame: Frame, payload: E) {
        if let Some(cap) = self.capacity {
            if cap == 0 {
                return;
            }
            while self.events.len() >= cap {
                self.events.pop_front();
            }
        }
        self.events.push_back(Event {
            frame_index: frame.index,
            payload,
        });
    }

    /// Oldest first.
    pub fn events(&self) -> &VecDeque<Event<E>> {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Event<E>> {
        self.events.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::EventBus;
    use crate::frame::Frame;

    #[test]
    fn records_events_with_frame_index() {
        let mut bus = EventBus::new();
        bus.emit(Frame::new(2, 0.1), "hello");
        assert_eq!(bus.events().len(), 1);
        assert_eq!(bus.events()[0].frame_index, 2);
        assert_eq!(bus.events()[0].payload, "hello");
    }

    #[test]
    fn drain_clears_events() {
        let mut bus = EventBus::new();
        bus.emit(Frame::new(0, 1.0), 7u32);
        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        assert!(bus.is_empty());
    }

    #[test]
    fn bounded_bus_drops_oldest() {
        let mut bus = EventBus::with_capacity(2);
        bus.emit(Frame::new(0, 1.0), 'a');
        bus.emit(Frame::new(1, 1.0), 'b');
        bus.emit(Frame::new(2, 1.0), 'c');
        let kept: Vec<char> = bus.events().iter().map(|e| e.payload).collect();
        assert_eq!(kept, vec!['b', 'c']);
    }

    #[test]
    fn full_bus_keeps_newest_window() {
        let mut bus = EventBus::with_capacity(3);
        let mut frame = Frame::first();
        for n in 0..1000u32 {
            bus.emit(frame, n);
            frame = frame.next();
        }
        assert_eq!(bus.len(), 3);
        let kept: Vec<(u64, u32)> = bus
            .events()
            .iter()
            .map(|e| (e.frame_index, e.payload))
            .collect();
        assert_eq!(kept, vec![(997, 997), (998, 998), (999, 999)]);

        let drained = bus.drain();
        assert_eq!(drained[0].payload, 997);
        assert!(bus.is_empty());
    }
}
