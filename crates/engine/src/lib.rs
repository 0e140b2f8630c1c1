//! Babel dialogue engine library.
//!
//! This crate contains the conversational core of the Babel town game.
//!
//! ## Structure
//!
//! - `stores/` - In-memory NPC registry
//! - `use_cases/` - Dialogue state machine and scene trigger guard
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `roster` - The town's seed NPCs
//! - `app` - Application composition

pub mod app;
pub mod infrastructure;
pub mod roster;
pub mod stores;
pub mod use_cases;

pub use app::App;
