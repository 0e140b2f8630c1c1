//! In-memory text surface.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use crate::infrastructure::ports::TextSink;

/// How many recent writes a [`TextBuffer`] retains.
pub const WRITE_HISTORY: usize = 256;

/// A `TextSink` that keeps the current text and the most recent writes.
///
/// Hosts without a widget toolkit read `current()`; tests inspect `writes()`
/// to check reveal cadence. Only the last [`WRITE_HISTORY`] writes are kept,
/// while `write_count()` counts every write since creation.
#[derive(Debug, Default)]
pub struct TextBuffer {
    inner: Mutex<TextBufferState>,
}

#[derive(Debug, Default)]
struct TextBufferState {
    current: String,
    writes: VecDeque<String>,
    total: usize,
}

impl TextBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> String {
        self.lock().current.clone()
    }

    /// Retained writes, oldest first.
    pub fn writes(&self) -> Vec<String> {
        self.lock().writes.iter().cloned().collect()
    }

    pub fn write_count(&self) -> usize {
        self.lock().total
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TextBufferState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TextSink for TextBuffer {
    fn set_text(&self, text: &str) {
        let mut state = self.lock();
        state.current.clear();
        state.current.push_str(text);
        if state.writes.len() == WRITE_HISTORY {
            state.writes.pop_front();
        }
        state.writes.push_back(text.to_string());
        state.total += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_records_an_empty_write() {
        let buffer = TextBuffer::new();
        buffer.set_text("Hm");
        buffer.clear();

        assert_eq!(buffer.current(), "");
        assert_eq!(buffer.writes(), vec!["Hm".to_string(), String::new()]);
    }

    #[test]
    fn history_is_capped_but_count_keeps_growing() {
        let buffer = TextBuffer::new();
        for i in 0..WRITE_HISTORY + 10 {
            buffer.set_text(&i.to_string());
        }

        let writes = buffer.writes();
        assert_eq!(writes.len(), WRITE_HISTORY);
        assert_eq!(writes.first().map(String::as_str), Some("10"));
        assert_eq!(writes.last(), Some(&(WRITE_HISTORY + 9).to_string()));
        assert_eq!(buffer.write_count(), WRITE_HISTORY + 10);
        assert_eq!(buffer.current(), (WRITE_HISTORY + 9).to_string());
    }
}
