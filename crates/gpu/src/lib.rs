pub mod headless;
pub mod renderer;
pub mod texture;

pub use headless::*;
pub use renderer::*;
pub use texture::*;
