pub mod renderer;
pub mod settings;

pub use renderer::*;
pub use settings::*;
