//! Auto-capture targeting and texture mapping for a photo sphere.
//!
//! The render loop calls [`PanoramaSession::on_view_direction_changed`] once
//! per frame. Camera hardware, settings UI and the 3D backend are injected as
//! [`ImageSource`], [`ConfigProvider`] and [`gpu::Renderer`].

pub mod config;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod orientation;
pub mod session;
pub mod source;
pub mod texture_mapper;

pub use config::*;
pub use error::*;
pub use events::*;
pub use orchestrator::*;
pub use orientation::*;
pub use session::*;
pub use source::*;
pub use texture_mapper::*;
