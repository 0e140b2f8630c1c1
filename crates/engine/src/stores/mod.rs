//! In-memory state storage modules.
//!
//! Stores manage runtime state that lives for the whole process:
//! - `NpcRegistry` - every NPC loaded by the current scene set

pub mod npc_registry;

// Re-export store types
pub use npc_registry::{NpcRegistry, RegistryError, SharedNpc};
