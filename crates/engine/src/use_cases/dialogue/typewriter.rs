//! Typewriter reveal effect.
//!
//! Writes a sentence into a [`TextSink`] one character at a time, then holds
//! until the player advances. Every suspension is a timer raced against the
//! session's cancellation token, so a stopped or superseded reveal never
//! writes again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::infrastructure::ports::TextSink;
use crate::infrastructure::settings::DialogueSettings;

/// The reveal was cancelled before it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("reveal cancelled")]
pub struct Cancelled;

/// Player "skip / advance" flag shared between the input side and the reveal.
///
/// Raised by input, consumed by the typewriter. A single raise either
/// collapses an in-progress reveal or releases a held sentence, never both.
#[derive(Debug, Clone, Default)]
pub struct SkipSignal(Arc<AtomicBool>);

impl SkipSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Consume the flag, returning whether it was raised.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Successive prefixes of `sentence`, one per character, ending with the
/// full sentence. Splits on char boundaries.
pub fn frames(sentence: &str) -> impl Iterator<Item = &str> + Clone + '_ {
    sentence
        .char_indices()
        .map(move |(idx, ch)| &sentence[..idx + ch.len_utf8()])
}

/// Reveal cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Typewriter {
    char_delay: Duration,
    hold_poll: Duration,
}

impl Typewriter {
    pub fn new(char_delay: Duration, hold_poll: Duration) -> Self {
        Self {
            char_delay,
            hold_poll,
        }
    }

    pub fn from_settings(settings: &DialogueSettings) -> Self {
        Self::new(settings.char_delay(), settings.hold_poll())
    }

    /// Reveal `sentence` then wait for the player to advance.
    pub async fn run(
        &self,
        sentence: &str,
        sink: &dyn TextSink,
        skip: &SkipSignal,
        cancel: &CancellationToken,
    ) -> Result<(), Cancelled> {
        self.type_out(sentence, sink, skip, cancel).await?;
        self.hold(skip, cancel).await
    }

    /// Write one prefix per `char_delay`. A skip seen after any step writes
    /// the full sentence and returns immediately.
    pub async fn type_out(
        &self,
        sentence: &str,
        sink: &dyn TextSink,
        skip: &SkipSignal,
        cancel: &CancellationToken,
    ) -> Result<(), Cancelled> {
        // A skip raised before this sentence began belongs to the previous one
        skip.reset();

        if sentence.is_empty() {
            sink.clear();
            return Ok(());
        }

        for frame in frames(sentence) {
            sink.set_text(frame);
            pause(self.char_delay, cancel).await?;

            if skip.take() {
                sink.set_text(sentence);
                break;
            }
        }
        Ok(())
    }

    /// Poll every `hold_poll` until a skip arrives.
    pub async fn hold(&self, skip: &SkipSignal, cancel: &CancellationToken) -> Result<(), Cancelled> {
        loop {
            if skip.take() {
                return Ok(());
            }
            pause(self.hold_poll, cancel).await?;
        }
    }
}

/// Sleep for `duration` unless `cancel` fires first.
pub(crate) async fn pause(duration: Duration, cancel: &CancellationToken) -> Result<(), Cancelled> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
