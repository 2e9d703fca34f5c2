pub mod edges;
pub mod extrude;
pub mod region_map;

pub use edges::*;
pub use extrude::*;
pub use region_map::*;
