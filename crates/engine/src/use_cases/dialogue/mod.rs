//! Dialogue use cases.
//!
//! The dialogue flow is:
//! 1. A scene trigger starts a session with an NPC (`start_dialogue`)
//! 2. The NPC's opening lines are revealed one by one by the typewriter
//! 3. The player advances or skips through the queued lines
//! 4. Online: the player submits free text, the gateway fetches a reply, and
//!    the exchange is appended to the NPC's history and revealed
//! 5. The player (or offline mode, once the queue drains) stops the session

mod controller;
mod gateway;
mod typewriter;

pub use controller::DialogueController;
pub use gateway::{persona_prompt, GatewayError, Reply, ResponseGateway, ResponseSlot};
pub use typewriter::{frames, Cancelled, SkipSignal, Typewriter};

use babel_domain::{Npc, NpcId};

use crate::stores::RegistryError;

/// Where the controller is in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DialogueState {
    /// No session; panel hidden.
    #[default]
    Idle,
    /// A queued line is being revealed.
    Displaying,
    /// A line is fully shown and waits for the player to advance.
    HeldForAdvance,
    /// The queue is empty; free-text input is open.
    AwaitingInput,
    /// A gateway request is in flight.
    AwaitingResponse,
}

/// What a session's sentence queue is seeded from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DialogueSource {
    /// The NPC's own greeting lines.
    #[default]
    Greeting,
    /// A fixed script.
    Lines(Vec<String>),
    /// A single line fetched ahead of time.
    Reply(String),
}

impl DialogueSource {
    pub fn into_lines(self, npc: &Npc) -> Vec<String> {
        match self {
            Self::Greeting => npc.greeting().to_vec(),
            Self::Lines(lines) => lines,
            Self::Reply(reply) => vec![reply],
        }
    }
}

/// One player input event, as produced by the host's input handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerInput {
    Submit(String),
    Skip,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DialogueError {
    #[error("Already in dialogue with NPC {active}")]
    AlreadyTalking { active: NpcId },
    #[error("No dialogue is active")]
    NotTalking,
    #[error("Input is empty")]
    EmptyInput,
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
