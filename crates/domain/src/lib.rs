//! Babel domain - passive records for the dialogue engine.
//!
//! No I/O lives here. The engine owns every mutation of these records while
//! a dialogue session is active.

extern crate self as babel_domain;

pub mod entities;
pub mod error;
pub mod ids;
pub mod value_objects;

// Re-export all entities (explicit list in entities/mod.rs)
pub use entities::{Message, MessageRole, Npc, ScheduleEntry};

pub use error::DomainError;

// Re-export ID types
pub use ids::{NpcId, SessionId};

// Re-export value objects
pub use value_objects::Coordinates;
