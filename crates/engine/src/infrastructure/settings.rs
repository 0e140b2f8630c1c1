//! Dialogue settings and their environment loader
//!
//! # Environment Variables
//!
//! Typewriter:
//! - `BABEL_TYPEWRITER_CHAR_DELAY` - Delay between revealed characters in ms (default: 80)
//! - `BABEL_TYPEWRITER_HOLD_POLL` - Poll interval while a finished line waits for advance, ms (default: 100)
//!
//! Gateway:
//! - `BABEL_RESPONSE_POLL` - Poll interval while waiting for an agent reply, ms (default: 100)
//! - `BABEL_GATEWAY_TIMEOUT_SECS` - Upper bound on one agent exchange (default: 30)
//! - `BABEL_CONTEXT_MESSAGES` - History entries forwarded with each request (default: 20)
//!
//! Session:
//! - `BABEL_DIALOGUE_MODE` - `online` or `offline` (default: online)
//! - `BABEL_REENTRY_POLICY` - `reject` or `force_close` (default: reject)

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ============================================================================
// Dialogue Mode
// ============================================================================

/// What happens when the sentence queue runs dry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DialogueMode {
    /// Show the free-text input and wait for the player.
    #[default]
    Online,
    /// No agent available: close the session.
    Offline,
}

impl std::fmt::Display for DialogueMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DialogueMode::Online => write!(f, "online"),
            DialogueMode::Offline => write!(f, "offline"),
        }
    }
}

impl std::str::FromStr for DialogueMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" | "on" => Ok(DialogueMode::Online),
            "offline" | "off" => Ok(DialogueMode::Offline),
            _ => Err(()),
        }
    }
}

// ============================================================================
// Re-entry Policy
// ============================================================================

/// How `start_dialogue` treats a call while another session is active.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReentryPolicy {
    /// Refuse the new session; the active one continues.
    #[default]
    Reject,
    /// Close the active session first, then open the new one.
    ForceClose,
}

impl std::fmt::Display for ReentryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReentryPolicy::Reject => write!(f, "reject"),
            ReentryPolicy::ForceClose => write!(f, "force_close"),
        }
    }
}

impl std::str::FromStr for ReentryPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(ReentryPolicy::Reject),
            "force_close" | "forceclose" | "force" => Ok(ReentryPolicy::ForceClose),
            _ => Err(()),
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

/// All configurable dialogue settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DialogueSettings {
    pub char_delay_ms: u64,
    pub hold_poll_ms: u64,
    pub response_poll_ms: u64,
    /// Upper bound on one agent exchange, retries included.
    pub gateway_timeout_secs: u64,
    pub context_messages: usize,
    #[serde(default)]
    pub mode: DialogueMode,
    #[serde(default)]
    pub reentry_policy: ReentryPolicy,
}

impl Default for DialogueSettings {
    fn default() -> Self {
        Self {
            char_delay_ms: 80,
            hold_poll_ms: 100,
            response_poll_ms: 100,
            gateway_timeout_secs: 30,
            context_messages: 20,
            mode: DialogueMode::Online,
            reentry_policy: ReentryPolicy::Reject,
        }
    }
}

impl DialogueSettings {
    pub fn char_delay(&self) -> Duration {
        Duration::from_millis(self.char_delay_ms)
    }

    pub fn hold_poll(&self) -> Duration {
        Duration::from_millis(self.hold_poll_ms)
    }

    pub fn response_poll(&self) -> Duration {
        Duration::from_millis(self.response_poll_ms)
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Load settings from `BABEL_*` environment variables, defaulting each
/// missing or unparseable value.
pub fn load_settings_from_env() -> DialogueSettings {
    load_settings_with(|key| std::env::var(key).ok())
}

/// Same as [`load_settings_from_env`] with an injectable variable lookup.
pub fn load_settings_with<F>(lookup: F) -> DialogueSettings
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = DialogueSettings::default();
    let env_or = |key: &str| lookup(key).and_then(|v| v.trim().parse().ok());

    DialogueSettings {
        char_delay_ms: env_or("BABEL_TYPEWRITER_CHAR_DELAY").unwrap_or(defaults.char_delay_ms),
        hold_poll_ms: env_or("BABEL_TYPEWRITER_HOLD_POLL").unwrap_or(defaults.hold_poll_ms),
        response_poll_ms: env_or("BABEL_RESPONSE_POLL").unwrap_or(defaults.response_poll_ms),
        gateway_timeout_secs: env_or("BABEL_GATEWAY_TIMEOUT_SECS")
            .unwrap_or(defaults.gateway_timeout_secs),
        context_messages: lookup("BABEL_CONTEXT_MESSAGES")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.context_messages),
        mode: lookup("BABEL_DIALOGUE_MODE")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.mode),
        reentry_policy: lookup("BABEL_REENTRY_POLICY")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.reentry_policy),
    }
}
