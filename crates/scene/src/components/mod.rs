pub mod geometry;
pub mod light;
pub mod material;
pub mod mesh;
pub mod transform;

pub use geometry::*;
pub use light::*;
pub use material::*;
pub use mesh::*;
pub use transform::*;
