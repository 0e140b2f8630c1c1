//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - LLM calls (could swap Ollama -> Claude/OpenAI)
//! - The text surface and dialogue panel (game UI, console, tests)

mod error;
mod external;
mod view;

// =============================================================================
// External Service Ports
// =============================================================================
pub use external::{
    ChatMessage, FinishReason, LlmPort, LlmRequest, LlmResponse, TokenUsage,
};

// =============================================================================
// UI Ports
// =============================================================================
pub use view::{DialoguePanel, TextSink};

// =============================================================================
// Test-Only Mocks (only available during test builds)
// =============================================================================
#[cfg(test)]
pub use external::MockLlmPort;

#[cfg(test)]
pub use view::MockDialoguePanel;

// =============================================================================
// Error Types
// =============================================================================
pub use error::LlmError;
