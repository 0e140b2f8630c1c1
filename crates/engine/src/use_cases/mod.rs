//! Use cases - orchestration over the NPC registry and the UI ports.

pub mod dialogue;
pub mod interaction;

pub use dialogue::{
    DialogueController, DialogueError, DialogueSource, DialogueState, PlayerInput,
};
pub use interaction::{InteractionTrigger, TriggerContext};
