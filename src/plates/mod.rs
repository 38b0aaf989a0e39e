pub mod seed;
pub mod grow;
pub mod properties;
pub mod boundary;
pub mod distance;

pub use boundary::{CONVERGENT, DIVERGENT, INTERIOR, TRANSFORM};
pub use properties::PlateSet;
