//! Infrastructure implementations.
//!
//! Contains port trait implementations for external dependencies.

pub mod console;
pub mod ollama;
pub mod ports;
pub mod resilient_llm;
pub mod settings;
pub mod text_buffer;
