pub mod camera;
pub mod components;
pub mod controls;
pub mod entity;
pub mod prefabs;
pub mod world;

pub use camera::*;
pub use controls::*;
pub use entity::*;
pub use world::*;
