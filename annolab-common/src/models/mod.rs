//! Entity models and enumerated column values

pub mod entities;
pub mod enums;

pub use entities::*;
pub use enums::*;
