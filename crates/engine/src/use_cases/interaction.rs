//! Scene trigger guard for opening a dialogue.

use babel_domain::{NpcId, SessionId};

use crate::use_cases::dialogue::{DialogueController, DialogueError};

/// What the scene knows about the frame an interaction happens in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TriggerContext {
    /// The actor standing in the trigger is the player.
    pub is_player: bool,
    /// The interact button is held this frame.
    pub interact_pressed: bool,
    pub paused: bool,
}

impl TriggerContext {
    pub fn player_interacting() -> Self {
        Self {
            is_player: true,
            interact_pressed: true,
            paused: false,
        }
    }
}

/// Opens dialogues from scene triggers.
#[derive(Debug, Clone)]
pub struct InteractionTrigger {
    dialogue: DialogueController,
}

impl InteractionTrigger {
    pub fn new(dialogue: DialogueController) -> Self {
        Self { dialogue }
    }

    /// Start a dialogue with `npc_id` if the frame allows it.
    ///
    /// Returns `Ok(None)` when the guard declines, which is the common case
    /// for a trigger evaluated every frame.
    pub async fn try_interact(
        &self,
        ctx: TriggerContext,
        npc_id: NpcId,
    ) -> Result<Option<SessionId>, DialogueError> {
        if !ctx.is_player || !ctx.interact_pressed || ctx.paused || self.dialogue.is_talking() {
            return Ok(None);
        }
        self.dialogue.start_dialogue(npc_id).await.map(Some)
    }
}
