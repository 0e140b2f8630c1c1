//! Domain entities - passive records read and mutated by the dialogue engine.

mod message;
mod npc;
mod schedule;

pub use message::{Message, MessageRole};
pub use npc::Npc;
pub use schedule::ScheduleEntry;
