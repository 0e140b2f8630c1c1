//! Application state and composition.

use std::sync::Arc;

use babel_domain::Npc;

use crate::infrastructure::{
    ports::{DialoguePanel, LlmPort, TextSink},
    settings::DialogueSettings,
};
use crate::stores::{NpcRegistry, RegistryError};
use crate::use_cases::{DialogueController, InteractionTrigger};

/// Main application state.
///
/// Owns the NPC registry and the single dialogue controller. Built once by
/// the host and handed to whatever needs it.
pub struct App {
    pub settings: DialogueSettings,
    pub registry: Arc<NpcRegistry>,
    pub dialogue: DialogueController,
    pub interaction: InteractionTrigger,
}

impl App {
    pub fn new(
        settings: DialogueSettings,
        llm: Arc<dyn LlmPort>,
        sink: Arc<dyn TextSink>,
        panel: Arc<dyn DialoguePanel>,
    ) -> Self {
        let registry = Arc::new(NpcRegistry::new());
        let dialogue = DialogueController::new(registry.clone(), llm, sink, panel, &settings);
        let interaction = InteractionTrigger::new(dialogue.clone());

        Self {
            settings,
            registry,
            dialogue,
            interaction,
        }
    }

    /// Register every NPC of a scene. Stops at the first duplicate id.
    pub fn load_npcs(&self, npcs: impl IntoIterator<Item = Npc>) -> Result<usize, RegistryError> {
        let mut loaded = 0;
        for npc in npcs {
            self.registry.register(npc)?;
            loaded += 1;
        }
        Ok(loaded)
    }

    /// Close any open session. Call before the host exits.
    pub async fn shutdown(&self) {
        if self.dialogue.stop_dialogue().await {
            tracing::info!("Closed open dialogue on shutdown");
        }
    }
}
