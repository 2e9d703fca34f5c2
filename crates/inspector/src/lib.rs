//! Debug-control panel: a serialisable description of tweakable scene,
//! camera and mesh properties, plus the code that reads and writes them.
//!
//! The host page renders the folders; every edit comes back through
//! [`Panel::apply`].

pub mod control;
pub mod panel;

pub use control::*;
pub use panel::*;
