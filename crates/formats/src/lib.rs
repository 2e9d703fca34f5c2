pub mod geojson;
pub mod map_config;

pub use geojson::*;
pub use map_config::*;
