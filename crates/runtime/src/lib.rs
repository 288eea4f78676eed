pub mod event_bus;
pub mod frame;
pub mod handoff;
pub mod metrics;

pub use event_bus::*;
pub use frame::*;
pub use handoff::*;
pub use metrics::*;
