//! Value objects - immutable types without identity.

mod coordinates;

pub use coordinates::Coordinates;
