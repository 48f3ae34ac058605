//! Project persistence and domain model for the wiring designer.

mod model;
mod store;

pub use model::*;
pub use store::*;
